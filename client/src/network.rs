use crate::camera::Camera;
use crate::game::Reconciler;
use crate::rendering::RenderSink;
use log::{debug, info, warn};
use shared::{parse_handshake, InputToken, ProtocolError, SimConfig};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("bad handshake: {0}")]
    Handshake(#[from] ProtocolError),
    #[error("server closed the connection before the handshake")]
    Closed,
}

/// A connected client: one task reads snapshots, the caller's loop interpolates
/// and renders on its own cadence.
pub struct Client {
    player_id: u32,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    reconciler: Arc<Mutex<Reconciler>>,
    config: SimConfig,
}

impl Client {
    /// Connects and waits for the handshake line carrying our player id.
    pub async fn connect(addr: &str, camera: Camera, config: SimConfig) -> Result<Self, ClientError> {
        info!("Connecting to {}...", addr);
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let line = lines.next_line().await?.ok_or(ClientError::Closed)?;
        let player_id = parse_handshake(&line)?;
        info!("Connected! Player ID: {}", player_id);

        Ok(Client {
            player_id,
            lines,
            writer,
            reconciler: Arc::new(Mutex::new(Reconciler::new(
                Some(player_id),
                camera,
                config.clone(),
            ))),
            config,
        })
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    pub fn reconciler(&self) -> Arc<Mutex<Reconciler>> {
        Arc::clone(&self.reconciler)
    }

    pub async fn send_token(&mut self, token: InputToken) -> Result<(), ClientError> {
        write_token(&mut self.writer, token).await
    }

    /// Runs until the server disconnects or the input source closes.
    pub async fn run<S: RenderSink>(
        self,
        mut input: mpsc::UnboundedReceiver<InputToken>,
        mut sink: S,
    ) -> Result<(), ClientError> {
        let Client {
            lines,
            mut writer,
            reconciler,
            config,
            ..
        } = self;
        let mut reader = tokio::spawn(read_snapshots(lines, Arc::clone(&reconciler)));

        let mut frame_interval = interval(config.tick_period());
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = frame_interval.tick() => {
                    let frame = {
                        let mut reconciler = reconciler.lock().await;
                        reconciler.interpolate();
                        reconciler.frame()
                    };
                    sink.render(&frame);
                },

                token = input.recv() => match token {
                    Some(token) => {
                        debug!("Sending input {:?}", token);
                        write_token(&mut writer, token).await?;
                    }
                    None => {
                        info!("Input closed, disconnecting");
                        break;
                    }
                },

                _ = &mut reader => {
                    info!("Server closed the connection");
                    return Ok(());
                },
            }
        }

        reader.abort();
        Ok(())
    }
}

async fn write_token(writer: &mut OwnedWriteHalf, token: InputToken) -> Result<(), ClientError> {
    let mut line = token.as_line();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn read_snapshots(mut lines: Lines<BufReader<OwnedReadHalf>>, reconciler: Arc<Mutex<Reconciler>>) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                reconciler
                    .lock()
                    .await
                    .apply_snapshot_line(&line, Instant::now());
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading snapshot: {}", e);
                break;
            }
        }
    }
}
