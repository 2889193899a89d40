//! # Movement Client Library
//!
//! Client side of the tile-grid movement protocol. The server is authoritative
//! and only sends whole-world snapshots at its own tick rate; the client turns
//! those coarse updates into smooth motion.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The [`game::Reconciler`]: keeps the player and NPC tables, replaces them on
//! every new snapshot while carrying over drawn positions, suppresses direction
//! jitter, snaps on teleports and interpolates once per display frame.
//!
//! ### Camera Module (`camera`)
//! Viewport that trails the local player and never shows past the map edges.
//!
//! ### Input Module (`input`)
//! Converts held movement keys into the one-token-per-line input protocol and
//! only emits a token when it changes.
//!
//! ### Network Module (`network`)
//! TCP connection, handshake, the snapshot reader task and the frame loop.
//!
//! ### Rendering Module (`rendering`)
//! The [`rendering::RenderSink`] seam plus a headless sink that logs frames.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::camera::Camera;
//! use client::network::Client;
//! use client::rendering::LogRenderer;
//! use shared::SimConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimConfig::default();
//!     let camera = Camera::new((800, 600), (1280, 960), &config);
//!     let client = Client::connect("127.0.0.1:12345", camera, config).await?;
//!
//!     let (_input_tx, input_rx) = tokio::sync::mpsc::unbounded_channel();
//!     client.run(input_rx, LogRenderer::new(60)).await?;
//!     Ok(())
//! }
//! ```

pub mod camera;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
