use clap::Parser;
use log::{error, info, warn};
use server::network::Server;
use shared::map::load_npc_seeds_or_default;
use shared::{MapData, SimConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Map JSON with dimensions and collider rectangles
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// NPC seed JSON
    #[arg(short, long)]
    npcs: Option<PathBuf>,

    /// Simulation tuning JSON; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent clients
    #[arg(long)]
    max_clients: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default configuration", e);
                SimConfig::default()
            }
        },
        None => SimConfig::default(),
    };
    if let Some(max_clients) = args.max_clients {
        config.max_clients = max_clients;
    }

    let map = MapData::load_or_default(args.map.as_deref());
    let seeds = load_npc_seeds_or_default(args.npcs.as_deref());

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, config, &map, &seeds).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
