//! # Movement Server Library
//!
//! Authoritative server for a tile-grid multiplayer world. Players send one
//! direction key per line; the server moves them in fixed pixel steps along a
//! 32px grid, validates each tile against static colliders and broadcasts the
//! resulting positions to every connected client.
//!
//! ## Module Organization
//!
//! ### Movement Module (`movement`)
//! Per-player state machine: idle, moving, completing the current tile and the
//! short pause that follows a change of direction. Input arriving mid-tile is
//! buffered and only applied on a tile boundary.
//!
//! ### Game Module (`game`)
//! The player table plus the [`game::Terrain`] every movement check runs against
//! (map bounds and the collision index).
//!
//! ### NPC Module (`npc`)
//! Autonomous entities stepped on their own period by a task that owns them
//! outright and publishes copies for broadcasting.
//!
//! ### Client Manager Module (`client_manager`)
//! Registry of live connections, player id assignment and capacity limits.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection reader and writer tasks and the fixed-rate
//! tick that drives movement and snapshot broadcasts. All mutation of players
//! and connections happens under one lock.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::{MapData, SimConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let map = MapData::default();
//!     let server = Server::bind("127.0.0.1:12345", SimConfig::default(), &map, &[]).await?;
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod movement;
pub mod network;
pub mod npc;
