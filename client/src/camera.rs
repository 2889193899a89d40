//! Viewport that trails the local player.

use shared::SimConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: (f32, f32),
    target: (f32, f32),
    viewport: (f32, f32),
    map: (f32, f32),
    smoothing: f32,
    snap_px: f32,
}

impl Camera {
    /// All sizes are in world pixels.
    pub fn new(viewport: (u32, u32), map: (u32, u32), config: &SimConfig) -> Self {
        Self {
            position: (0.0, 0.0),
            target: (0.0, 0.0),
            viewport: (viewport.0 as f32, viewport.1 as f32),
            map: (map.0 as f32, map.1 as f32),
            smoothing: config.camera_smoothing,
            snap_px: config.camera_snap_px,
        }
    }

    /// Top-left corner of the visible area.
    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn target(&self) -> (f32, f32) {
        self.target
    }

    /// Aims the camera so `(x, y)` sits in the middle of the viewport, without
    /// showing anything past the map edges.
    pub fn center_on(&mut self, x: f32, y: f32) {
        self.target = (
            clamp_axis(x - self.viewport.0 / 2.0, self.map.0 - self.viewport.0),
            clamp_axis(y - self.viewport.1 / 2.0, self.map.1 - self.viewport.1),
        );
    }

    /// One smoothing step toward the target.
    pub fn update(&mut self) {
        if self.position == self.target {
            return;
        }

        self.position.0 += (self.target.0 - self.position.0) * self.smoothing;
        self.position.1 += (self.target.1 - self.position.1) * self.smoothing;

        if (self.position.0 - self.target.0).abs() < self.snap_px
            && (self.position.1 - self.target.1).abs() < self.snap_px
        {
            self.position = self.target;
        }
    }

    /// Jumps straight to the target.
    pub fn snap(&mut self) {
        self.position = self.target;
    }

    pub fn world_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.position.0, y - self.position.1)
    }

    pub fn screen_to_world(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.position.0, y + self.position.1)
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    // Maps smaller than the viewport pin to the origin.
    value.min(max).max(0.0)
}
