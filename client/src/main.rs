use clap::Parser;
use client::camera::Camera;
use client::input::{InputManager, KeyState};
use client::network::Client;
use client::rendering::LogRenderer;
use log::{info, warn};
use shared::{MapData, SimConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:12345")]
    server: String,

    /// Map JSON, used for camera bounds
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Simulation tuning JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long, default_value = "800")]
    width: u32,

    /// Viewport height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: u32,

    /// Log a frame summary every N frames
    #[arg(long, default_value = "60")]
    summary_every: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimConfig::load(path).unwrap_or_else(|e| {
            warn!("{}; using default configuration", e);
            SimConfig::default()
        }),
        None => SimConfig::default(),
    };
    let map = MapData::load_or_default(args.map.as_deref());
    let bounds = map.bounds();
    let camera = Camera::new(
        (args.width, args.height),
        (bounds.width.max(0) as u32, bounds.height.max(0) as u32),
        &config,
    );

    info!("Controls: type the held keys (e.g. \"w\", \"wd\") and press Enter; empty line releases");

    let client = Client::connect(&args.server, camera, config).await?;

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut input = InputManager::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(token) = input.update(KeyState::parse(&line)) {
                if input_tx.send(token).is_err() {
                    break;
                }
            }
        }
    });

    client.run(input_rx, LogRenderer::new(args.summary_every)).await?;

    Ok(())
}
