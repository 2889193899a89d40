//! Server network layer: TCP accept loop, per-connection line I/O and the
//! fixed-rate tasks that drive movement and broadcast snapshots.

use crate::client_manager::{ClientManager, OUTBOUND_QUEUE_LINES};
use crate::game::{GameState, Terrain};
use crate::npc::{NpcFrame, NpcScheduler};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{encode_handshake, encode_snapshot, InputToken, MapData, NpcSeed, SimConfig, SnapshotEntry};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};

/// Everything guarded by the server's single lock.
struct World {
    game: GameState,
    clients: ClientManager,
    /// Last NPC entries received from the scheduler
    npc_entries: Vec<SnapshotEntry>,
    rng: StdRng,
}

impl World {
    fn snapshot_line(&self) -> String {
        let mut entries = self.game.player_entries();
        entries.extend(self.npc_entries.iter().cloned());
        encode_snapshot(&entries)
    }

    /// Sends the current snapshot to every client. Clients whose writer has
    /// gone away are removed and the remaining ones get a fresh snapshot.
    fn broadcast_snapshot(&mut self) {
        loop {
            let line = self.snapshot_line();
            let failed = self.clients.broadcast(&line);
            if failed.is_empty() {
                break;
            }
            for client_id in failed {
                self.clients.remove_client(client_id);
                self.game.remove_player(client_id);
            }
        }
    }

    fn disconnect(&mut self, client_id: u32) {
        let had_client = self.clients.remove_client(client_id);
        let had_player = self.game.remove_player(client_id);
        if had_client || had_player {
            self.broadcast_snapshot();
        }
    }
}

/// Authoritative movement server
pub struct Server {
    listener: TcpListener,
    world: Arc<Mutex<World>>,
    npcs: NpcScheduler,
    config: SimConfig,
}

impl Server {
    pub async fn bind(
        addr: &str,
        config: SimConfig,
        map: &MapData,
        seeds: &[NpcSeed],
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let terrain = Terrain::from_map(map, &config);
        info!(
            "Map {}x{} px with {} colliders",
            terrain.bounds().width,
            terrain.bounds().height,
            terrain.collider_count()
        );

        let npcs = NpcScheduler::from_seeds(seeds, terrain.clone(), config.clone());
        let world = World {
            game: GameState::new(terrain, config.clone()),
            clients: ClientManager::new(config.max_clients, config.npc_id_base),
            npc_entries: npcs.snapshot(false).entries,
            rng: StdRng::from_entropy(),
        };

        Ok(Server {
            listener,
            world: Arc::new(Mutex::new(world)),
            npcs,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// NPCs can be added programmatically until the server starts running.
    pub fn npcs_mut(&mut self) -> &mut NpcScheduler {
        &mut self.npcs
    }

    /// Starts the NPC and tick tasks, then accepts connections forever.
    pub async fn run(self) -> io::Result<()> {
        let Server {
            listener,
            world,
            npcs,
            config,
        } = self;

        let (npc_tx, npc_rx) = watch::channel(npcs.snapshot(false));
        tokio::spawn(npcs.run(npc_tx));
        tokio::spawn(tick_loop(Arc::clone(&world), npc_rx, config.tick_period()));

        info!("Server started successfully");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => accept_connection(&world, stream, addr).await,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

async fn accept_connection(world: &Arc<Mutex<World>>, stream: TcpStream, addr: SocketAddr) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_LINES);

    let client_id = {
        let mut guard = world.lock().await;
        let world = &mut *guard;

        let Some(client_id) = world.clients.add_client(addr, outbound_tx) else {
            // Dropping the stream closes the connection without a handshake.
            return;
        };
        world.clients.send_to(client_id, &encode_handshake(client_id));
        world.game.add_player(client_id, &mut world.rng);
        world.broadcast_snapshot();
        client_id
    };

    let (read_half, write_half) = stream.into_split();
    tokio::spawn(write_lines(client_id, write_half, outbound_rx));
    tokio::spawn(read_inputs(Arc::clone(world), client_id, read_half));
}

async fn write_lines(
    client_id: u32,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<String>,
) {
    while let Some(mut line) = outbound.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write to client {} failed: {}", client_id, e);
            break;
        }
    }
    debug!("Writer for client {} finished", client_id);
}

async fn read_inputs(world: Arc<Mutex<World>>, client_id: u32, reader: OwnedReadHalf) {
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let token = InputToken::parse(&line);
                if token == InputToken::Unknown {
                    debug!("Ignoring input {:?} from client {}", line, client_id);
                    continue;
                }
                world
                    .lock()
                    .await
                    .game
                    .apply_token(client_id, token, Instant::now());
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Read from client {} failed: {}", client_id, e);
                break;
            }
        }
    }

    world.lock().await.disconnect(client_id);
}

async fn tick_loop(
    world: Arc<Mutex<World>>,
    mut npc_frames: watch::Receiver<NpcFrame>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let mut world = world.lock().await;

        let players_moved = world.game.tick(Instant::now());

        let mut npcs_moved = false;
        if npc_frames.has_changed().unwrap_or(false) {
            let frame = npc_frames.borrow_and_update().clone();
            npcs_moved = frame.moved || frame.entries != world.npc_entries;
            world.npc_entries = frame.entries;
        }

        if (players_moved || npcs_moved) && !world.clients.is_empty() {
            world.broadcast_snapshot();
        }

        if world.game.tick % 600 == 0 && !world.clients.is_empty() {
            debug!(
                "Tick {}: {} clients, {} NPCs",
                world.game.tick,
                world.clients.len(),
                world.npc_entries.len()
            );
        }
    }
}
