use log::{debug, info};
use shared::Direction;

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player { local: bool },
    Npc { npc_type: String },
}

/// One entity as it should appear this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity {
    pub id: u32,
    pub kind: EntityKind,
    pub world: (f32, f32),
    pub screen: (f32, f32),
    pub direction: Direction,
    pub frame: u8,
    pub moving: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    /// Top-left corner of the viewport in world pixels
    pub camera: (f32, f32),
    pub entities: Vec<RenderEntity>,
}

impl RenderFrame {
    pub fn local_player(&self) -> Option<&RenderEntity> {
        self.entities
            .iter()
            .find(|entity| entity.kind == EntityKind::Player { local: true })
    }
}

/// Anything that can present interpolated frames: a window, a test probe, a log.
pub trait RenderSink: Send {
    fn render(&mut self, frame: &RenderFrame);
}

/// Headless sink that writes frames to the log.
pub struct LogRenderer {
    frames: u64,
    summary_every: u64,
}

impl LogRenderer {
    pub fn new(summary_every: u64) -> Self {
        Self {
            frames: 0,
            summary_every: summary_every.max(1),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSink for LogRenderer {
    fn render(&mut self, frame: &RenderFrame) {
        self.frames += 1;

        for entity in &frame.entities {
            debug!(
                "{:?} {} at ({:.1}, {:.1}) screen ({:.1}, {:.1}) {} frame {}",
                entity.kind,
                entity.id,
                entity.world.0,
                entity.world.1,
                entity.screen.0,
                entity.screen.1,
                entity.direction.wire_name(),
                entity.frame
            );
        }

        if self.frames % self.summary_every == 0 {
            match frame.local_player() {
                Some(player) => info!(
                    "Frame {}: {} entities, player {} at ({:.0}, {:.0}) facing {}",
                    self.frames,
                    frame.entities.len(),
                    player.id,
                    player.world.0,
                    player.world.1,
                    player.direction.wire_name()
                ),
                None => info!(
                    "Frame {}: {} entities, waiting for local player",
                    self.frames,
                    frame.entities.len()
                ),
            }
        }
    }
}
