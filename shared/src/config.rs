//! Tunable simulation constants shared by server and client.
//!
//! Every timing, distance and smoothing constant lives in [`SimConfig`] so the
//! server tick loop, the NPC scheduler and the client reconciler are built from
//! one value instead of scattered constants. The struct deserializes from JSON
//! with every field optional, so a config file only needs the values it changes.

use crate::map::MapError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Player movement + broadcast tick
    pub tick_period_ms: u64,
    /// NPC scheduler tick
    pub npc_period_ms: u64,
    /// Side of one grid square (SQM)
    pub tile_size_px: i32,
    /// Pixels advanced per movement tick
    pub move_step_px: i32,
    /// Forced pause after finishing a tile in the old heading
    pub direction_change_pause_ms: u64,
    /// How long a released or pending direction stays actionable
    pub input_buffer_ms: u64,
    /// Position jumps beyond this are treated as teleports on the client
    pub teleport_threshold_px: f32,
    /// Entity interpolation snaps once both axes are closer than this
    pub snap_threshold_px: f32,
    /// Camera snaps once both axes are closer than this
    pub camera_snap_px: f32,
    /// Per-frame smoothing fraction for player entities
    pub player_smoothing: f32,
    /// Per-update smoothing fraction for NPCs
    pub npc_smoothing: f32,
    /// Per-frame smoothing fraction for the camera
    pub camera_smoothing: f32,
    /// Sprite frame toggle period while moving
    pub animation_period_ms: u64,
    /// Client ignores direction flips closer together than this
    pub direction_debounce_ms: u64,
    /// Playable bounds are `0 ..= map_dimension - entity_span_px`
    pub entity_span_px: i32,
    /// Collision probe offset from the sprite origin
    pub probe_offset: (i32, i32),
    /// Collision probe size
    pub probe_size: (i32, i32),
    /// Margin added around every collider before testing
    pub collider_margin_px: i32,
    /// Chance per NPC update that an idle wanderer picks a new tile
    pub wander_chance: f64,
    /// First id handed to programmatically created NPCs; player ids stay below it
    pub npc_id_base: u32,
    pub max_clients: usize,
    /// Retry random spawn points until one is not blocked
    pub validate_spawn: bool,
    /// Reject wander targets that would land inside a collider
    pub npc_wander_collides: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 16,
            npc_period_ms: 50,
            tile_size_px: 32,
            move_step_px: 2,
            direction_change_pause_ms: 200,
            input_buffer_ms: 300,
            teleport_threshold_px: 100.0,
            snap_threshold_px: 1.5,
            camera_snap_px: 2.0,
            player_smoothing: 0.15,
            npc_smoothing: 1.0,
            camera_smoothing: 0.1,
            animation_period_ms: 150,
            direction_debounce_ms: 200,
            entity_span_px: 50,
            probe_offset: (10, 32),
            probe_size: (12, 14),
            collider_margin_px: 2,
            wander_chance: 0.02,
            npc_id_base: 1000,
            max_clients: 64,
            validate_spawn: false,
            npc_wander_collides: false,
        }
    }
}

impl SimConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| MapError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn npc_period(&self) -> Duration {
        Duration::from_millis(self.npc_period_ms)
    }

    pub fn direction_change_pause(&self) -> Duration {
        Duration::from_millis(self.direction_change_pause_ms)
    }

    pub fn input_buffer(&self) -> Duration {
        Duration::from_millis(self.input_buffer_ms)
    }

    pub fn animation_period(&self) -> Duration {
        Duration::from_millis(self.animation_period_ms)
    }

    pub fn direction_debounce(&self) -> Duration {
        Duration::from_millis(self.direction_debounce_ms)
    }
}
