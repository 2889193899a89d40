//! Integration tests for the movement server and client
//!
//! Every test runs a real server on an ephemeral port and talks to it over TCP.

use client::camera::Camera;
use client::network::Client;
use client::rendering::LogRenderer;
use server::network::Server;
use shared::{
    decode_snapshot, parse_handshake, DecodedSnapshot, MapData, NpcSeed, SimConfig, SnapshotEntry,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(config: SimConfig, seeds: &[NpcSeed]) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0", config, &MapData::default(), seeds)
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Bare protocol client speaking raw lines.
struct LineClient {
    id: u32,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl LineClient {
    async fn connect(addr: SocketAddr) -> LineClient {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let handshake = timeout(WAIT, lines.next_line())
            .await
            .expect("Timed out waiting for handshake")
            .unwrap()
            .expect("Connection closed before handshake");

        LineClient {
            id: parse_handshake(&handshake).unwrap(),
            lines,
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    /// Reads snapshots until one satisfies `accept`.
    async fn wait_for<F>(&mut self, accept: F) -> DecodedSnapshot
    where
        F: Fn(&DecodedSnapshot) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let line = self
                    .lines
                    .next_line()
                    .await
                    .unwrap()
                    .expect("Server closed the connection");
                let snapshot = decode_snapshot(&line);
                assert!(snapshot.error.is_none(), "Malformed snapshot {:?}", line);
                if accept(&snapshot) {
                    return snapshot;
                }
            }
        })
        .await
        .expect("Timed out waiting for snapshot")
    }
}

fn player_ids(snapshot: &DecodedSnapshot) -> Vec<u32> {
    snapshot
        .entries
        .iter()
        .filter(|entry| matches!(entry, SnapshotEntry::Player(_)))
        .map(|entry| entry.view().id)
        .collect()
}

fn find_player(snapshot: &DecodedSnapshot, id: u32) -> Option<&SnapshotEntry> {
    snapshot
        .entries
        .iter()
        .find(|entry| matches!(entry, SnapshotEntry::Player(view) if view.id == id))
}

/// CONNECTION LIFECYCLE TESTS
mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn handshake_assigns_sequential_ids() {
        let addr = start_server(SimConfig::default(), &[]).await;

        let mut first = LineClient::connect(addr).await;
        let second = LineClient::connect(addr).await;
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let snapshot = first.wait_for(|s| player_ids(s) == vec![1, 2]).await;
        assert_eq!(snapshot.entries.len(), 2);
    }

    #[tokio::test]
    async fn disconnect_removes_player_from_snapshots() {
        let addr = start_server(SimConfig::default(), &[]).await;

        let mut first = LineClient::connect(addr).await;
        let second = LineClient::connect(addr).await;
        first.wait_for(|s| player_ids(s) == vec![1, 2]).await;

        drop(second);
        first.wait_for(|s| player_ids(s) == vec![1]).await;
    }

    #[tokio::test]
    async fn full_server_closes_without_handshake() {
        let config = SimConfig {
            max_clients: 1,
            ..SimConfig::default()
        };
        let addr = start_server(config, &[]).await;
        let _first = LineClient::connect(addr).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let line = timeout(WAIT, lines.next_line())
            .await
            .expect("Timed out waiting for close")
            .unwrap_or(None);
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_disconnect() {
        let addr = start_server(SimConfig::default(), &[]).await;

        let first = LineClient::connect(addr).await;
        drop(first);
        sleep(Duration::from_millis(50)).await;

        let second = LineClient::connect(addr).await;
        assert_eq!(second.id, 2);
    }
}

/// MOVEMENT TESTS
mod movement_tests {
    use super::*;

    #[tokio::test]
    async fn tapped_key_moves_whole_tiles() {
        let addr = start_server(SimConfig::default(), &[]).await;
        let mut client = LineClient::connect(addr).await;
        let id = client.id;

        let initial = client.wait_for(|s| find_player(s, id).is_some()).await;
        let start = find_player(&initial, id).unwrap().view().clone();

        // Move away from the nearer horizontal edge so the tiles are always free.
        let (key, sign) = if start.x < 600 { ("D", 1) } else { ("A", -1) };
        client.send(key).await;
        client.send("").await;

        // A released key keeps chaining tiles while it is inside the input buffer,
        // so the player stops after one or two tiles depending on tick timing.
        let stopped = client
            .wait_for(|s| {
                find_player(s, id)
                    .map(|e| e.view().x != start.x && !e.view().moving)
                    .unwrap_or(false)
            })
            .await;
        let view = find_player(&stopped, id).unwrap().view();
        let travelled = (view.x - start.x) * sign;
        assert!(travelled == 32 || travelled == 64, "travelled {}px", travelled);
        assert_eq!(view.y, start.y);
    }

    #[tokio::test]
    async fn unknown_input_is_ignored() {
        let addr = start_server(SimConfig::default(), &[]).await;
        let mut first = LineClient::connect(addr).await;
        first.wait_for(|s| player_ids(s) == vec![1]).await;

        first.send("jump").await;
        first.send("WD").await;

        // The connection stays usable and a later client still sees us.
        let _second = LineClient::connect(addr).await;
        first.wait_for(|s| player_ids(s) == vec![1, 2]).await;
    }
}

/// NPC TESTS
mod npc_tests {
    use super::*;

    #[tokio::test]
    async fn seeded_npcs_appear_after_players() {
        let seeds: Vec<NpcSeed> = serde_json::from_str(
            r#"[{"id": 1000, "x": 320, "y": 320, "type": "guard", "behavior": "stationary"}]"#,
        )
        .unwrap();
        let addr = start_server(SimConfig::default(), &seeds).await;
        let mut client = LineClient::connect(addr).await;

        let snapshot = client.wait_for(|s| s.entries.len() == 2).await;
        assert!(matches!(snapshot.entries[0], SnapshotEntry::Player(_)));
        match &snapshot.entries[1] {
            SnapshotEntry::Npc { view, npc_type } => {
                assert_eq!(view.id, 1000);
                assert_eq!((view.x, view.y), (320, 320));
                assert_eq!(npc_type, "guard");
            }
            other => panic!("Expected NPC entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wandering_npcs_move_on_the_grid() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        let seeds = vec![NpcSeed {
            id: 1000,
            x: 640,
            y: 480,
            npc_type: "villager".to_string(),
            behavior: "wander".to_string(),
        }];
        let addr = start_server(config, &seeds).await;
        let mut client = LineClient::connect(addr).await;

        let snapshot = client
            .wait_for(|s| {
                s.entries.iter().any(|entry| {
                    matches!(entry, SnapshotEntry::Npc { view, .. } if (view.x, view.y) != (640, 480))
                })
            })
            .await;
        let npc = snapshot
            .entries
            .iter()
            .find(|entry| matches!(entry, SnapshotEntry::Npc { .. }))
            .unwrap()
            .view();
        assert_eq!((npc.x - 640) % 32, 0);
        assert_eq!((npc.y - 480) % 32, 0);
    }
}

/// CLIENT RECONCILER TESTS
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn client_mirrors_server_snapshots() {
        let config = SimConfig::default();
        let addr = start_server(config.clone(), &[]).await;

        let camera = Camera::new((800, 600), (1280, 960), &config);
        let client = Client::connect(&addr.to_string(), camera, config)
            .await
            .expect("Failed to connect");
        assert_eq!(client.player_id(), 1);

        let reconciler = client.reconciler();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(client.run(input_rx, LogRenderer::new(1000)));

        let _other = LineClient::connect(addr).await;

        timeout(WAIT, async {
            loop {
                {
                    let reconciler = reconciler.lock().await;
                    if reconciler.player_count() == 2 {
                        let frame = reconciler.frame();
                        assert_eq!(frame.local_player().map(|p| p.id), Some(1));
                        break;
                    }
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Client never saw both players");

        // Closing the input source ends the client loop.
        drop(input_tx);
        let result = timeout(WAIT, handle).await.expect("Client did not stop");
        assert!(result.unwrap().is_ok());
    }
}
