//! Static map input: bounds, colliders and NPC seed records.
//!
//! Both files are read once at startup. A missing or broken file is not fatal;
//! callers use the `*_or_default` helpers, which log and fall back to an open map.

use crate::collision::Rect;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAP_TILES: (i32, i32) = (40, 30);
pub const DEFAULT_TILE_PX: i32 = 32;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid map dimensions {width}x{height} tiles of {tile_width}x{tile_height} px")]
    InvalidDimensions {
        width: i32,
        height: i32,
        tile_width: i32,
        tile_height: i32,
    },
}

/// Playable area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapBounds {
    pub width: i32,
    pub height: i32,
}

impl MapBounds {
    /// True when an entity of `span` pixels at `(x, y)` stays inside the map,
    /// i.e. `0 <= c <= dimension - span` on both axes.
    pub fn contains_span(&self, x: i32, y: i32, span: i32) -> bool {
        x >= 0 && y >= 0 && x <= self.width - span && y <= self.height - span
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    /// Width in tiles
    pub width: i32,
    /// Height in tiles
    pub height: i32,
    #[serde(default = "default_tile_px")]
    pub tile_width: i32,
    #[serde(default = "default_tile_px")]
    pub tile_height: i32,
    #[serde(default)]
    pub colliders: Vec<Rect>,
}

fn default_tile_px() -> i32 {
    DEFAULT_TILE_PX
}

impl Default for MapData {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_TILES.0,
            height: DEFAULT_MAP_TILES.1,
            tile_width: DEFAULT_TILE_PX,
            tile_height: DEFAULT_TILE_PX,
            colliders: Vec::new(),
        }
    }
}

impl MapData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = read(path)?;
        let map: MapData = serde_json::from_str(&text).map_err(|source| MapError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        map.validate()?;
        Ok(map)
    }

    /// Rejects non-positive sizes and pixel extents that overflow `i32`.
    pub fn validate(&self) -> Result<(), MapError> {
        let positive =
            self.width > 0 && self.height > 0 && self.tile_width > 0 && self.tile_height > 0;
        let fits = self.width.checked_mul(self.tile_width).is_some()
            && self.height.checked_mul(self.tile_height).is_some();
        if positive && fits {
            return Ok(());
        }
        Err(MapError::InvalidDimensions {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
        })
    }

    /// Loads the map, or logs and returns an empty default map.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No map file given, using empty {}x{} map", DEFAULT_MAP_TILES.0, DEFAULT_MAP_TILES.1);
            return Self::default();
        };

        match Self::load(path) {
            Ok(map) => {
                info!(
                    "Loaded map {} ({}x{} px, {} colliders)",
                    path.display(),
                    map.bounds().width,
                    map.bounds().height,
                    map.colliders.len()
                );
                map
            }
            Err(e) => {
                warn!("{}; continuing with no obstacles", e);
                Self::default()
            }
        }
    }

    pub fn bounds(&self) -> MapBounds {
        MapBounds {
            width: self.width.saturating_mul(self.tile_width),
            height: self.height.saturating_mul(self.tile_height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcBehavior {
    Stationary,
    Wander,
    FollowPath,
}

impl NpcBehavior {
    pub fn parse(name: &str) -> Option<NpcBehavior> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stationary" => Some(NpcBehavior::Stationary),
            "wander" => Some(NpcBehavior::Wander),
            "follow_path" | "follow-path" | "followpath" => Some(NpcBehavior::FollowPath),
            _ => None,
        }
    }
}

/// One NPC record as it appears in the seed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSeed {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub npc_type: String,
    pub behavior: String,
}

#[derive(Debug, Deserialize)]
struct NpcFile {
    #[serde(default)]
    npcs: Vec<NpcSeed>,
}

pub fn load_npc_seeds(path: impl AsRef<Path>) -> Result<Vec<NpcSeed>, MapError> {
    let path = path.as_ref();
    let text = read(path)?;
    let file: NpcFile = serde_json::from_str(&text).map_err(|source| MapError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(file.npcs)
}

pub fn load_npc_seeds_or_default(path: Option<&Path>) -> Vec<NpcSeed> {
    let Some(path) = path else {
        return Vec::new();
    };

    match load_npc_seeds(path) {
        Ok(seeds) => {
            info!("Loaded {} NPC seeds from {}", seeds.len(), path.display());
            seeds
        }
        Err(e) => {
            warn!("{}; starting without NPCs", e);
            Vec::new()
        }
    }
}

fn read(path: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.display().to_string(),
        source,
    })
}
