//! Static collision geometry.
//!
//! Movement validation only ever asks one question: does this probe footprint
//! overlap any collider? [`CollisionIndex`] is that question; [`LinearScan`] answers
//! it with a plain scan, which is plenty for a single hand-made map.

use crate::config::SimConfig;
use crate::entity::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.width <= 0 || self.height <= 0 || other.width <= 0 || other.height <= 0 {
            return false;
        }
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn expanded(&self, margin: i32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2,
            self.height + margin * 2,
        )
    }
}

/// Reduced box near the sprite's feet used for collision instead of the full sprite.
pub fn probe_footprint(position: Point, config: &SimConfig) -> Rect {
    Rect::new(
        position.x + config.probe_offset.0,
        position.y + config.probe_offset.1,
        config.probe_size.0,
        config.probe_size.1,
    )
}

pub trait CollisionIndex: Send + Sync {
    fn blocks(&self, probe: &Rect) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// O(n) scan over colliders, each padded by a fixed margin at construction.
#[derive(Debug, Clone, Default)]
pub struct LinearScan {
    padded: Vec<Rect>,
}

impl LinearScan {
    pub fn new(colliders: &[Rect], margin: i32) -> Self {
        Self {
            padded: colliders.iter().map(|rect| rect.expanded(margin)).collect(),
        }
    }
}

impl CollisionIndex for LinearScan {
    fn blocks(&self, probe: &Rect) -> bool {
        self.padded.iter().any(|collider| collider.intersects(probe))
    }

    fn len(&self) -> usize {
        self.padded.len()
    }
}
