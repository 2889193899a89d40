use crate::camera::Camera;
use crate::rendering::{EntityKind, RenderEntity, RenderFrame};
use log::{debug, warn};
use shared::{decode_snapshot, Animator, Direction, EntityView, SimConfig, SnapshotEntry};
use std::collections::BTreeMap;
use std::time::Instant;

/// Client-side rendering state for one entity.
#[derive(Debug, Clone)]
pub struct VisualEntity {
    pub id: u32,
    /// Where the entity is drawn
    pub position: (f32, f32),
    /// Last authoritative position
    pub target: (f32, f32),
    pub direction: Direction,
    pub moving: bool,
    last_direction_change: Instant,
    animator: Animator,
    pub npc_type: Option<String>,
}

impl VisualEntity {
    fn spawn(view: &EntityView, npc_type: Option<String>, now: Instant) -> Self {
        let at = (view.x as f32, view.y as f32);
        Self {
            id: view.id,
            position: at,
            target: at,
            direction: view.direction,
            moving: view.moving,
            last_direction_change: now,
            animator: Animator::default(),
            npc_type,
        }
    }

    pub fn frame(&self) -> u8 {
        self.animator.frame()
    }

    /// Folds one authoritative update into the visual state.
    fn reconcile(&mut self, view: &EntityView, now: Instant, config: &SimConfig) {
        let target = (view.x as f32, view.y as f32);
        let jump = distance(self.position, target);

        if jump > config.teleport_threshold_px {
            debug!("Entity {} teleported {:.0}px", self.id, jump);
            self.position = target;
            self.direction = view.direction;
        } else if view.direction != self.direction {
            if now.duration_since(self.last_direction_change) < config.direction_debounce() {
                debug!(
                    "Entity {} direction {} suppressed",
                    self.id,
                    view.direction.wire_name()
                );
            } else {
                self.direction = view.direction;
                self.last_direction_change = now;
            }
        }

        self.target = target;
        self.moving = view.moving;
        self.animator
            .advance(view.moving, now, config.animation_period());
    }

    /// Exponential approach toward the target with a snap at the end.
    fn approach(&mut self, smoothing: f32, snap_px: f32) {
        if self.position == self.target {
            return;
        }

        self.position.0 += (self.target.0 - self.position.0) * smoothing;
        self.position.1 += (self.target.1 - self.position.1) * smoothing;

        if (self.target.0 - self.position.0).abs() < snap_px
            && (self.target.1 - self.position.1).abs() < snap_px
        {
            self.position = self.target;
        }
    }

    fn render(&self, kind: EntityKind, camera: &Camera) -> RenderEntity {
        RenderEntity {
            id: self.id,
            kind,
            world: self.position,
            screen: camera.world_to_screen(self.position.0, self.position.1),
            direction: self.direction,
            frame: self.frame(),
            moving: self.moving,
        }
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

/// Merges snapshots into smoothly animated client state.
///
/// Snapshots replace both entity tables wholesale; visual state (drawn position,
/// debounce timer, animation) carries over for ids that survive. Interpolation
/// runs on its own cadence and only ever moves drawn positions toward targets.
pub struct Reconciler {
    local_id: Option<u32>,
    players: BTreeMap<u32, VisualEntity>,
    npcs: BTreeMap<u32, VisualEntity>,
    last_line: Option<String>,
    camera: Camera,
    config: SimConfig,
}

impl Reconciler {
    pub fn new(local_id: Option<u32>, camera: Camera, config: SimConfig) -> Self {
        Self {
            local_id,
            players: BTreeMap::new(),
            npcs: BTreeMap::new(),
            last_line: None,
            camera,
            config,
        }
    }

    pub fn local_id(&self) -> Option<u32> {
        self.local_id
    }

    pub fn set_local_id(&mut self, local_id: u32) {
        self.local_id = Some(local_id);
    }

    /// Decodes and applies one snapshot line. A line identical to the previous
    /// one is skipped. Returns true if the tables were replaced.
    pub fn apply_snapshot_line(&mut self, line: &str, now: Instant) -> bool {
        if self.last_line.as_deref() == Some(line) {
            return false;
        }

        let decoded = decode_snapshot(line);
        if let Some(e) = &decoded.error {
            warn!(
                "Snapshot decoded partially ({} entries): {}",
                decoded.entries.len(),
                e
            );
        }

        self.apply_snapshot(&decoded.entries, now);
        self.last_line = Some(line.to_string());
        true
    }

    pub fn apply_snapshot(&mut self, entries: &[SnapshotEntry], now: Instant) {
        let mut players = BTreeMap::new();
        let mut npcs = BTreeMap::new();

        for entry in entries {
            let (previous, table, npc_type) = match entry {
                SnapshotEntry::Player(view) => (self.players.get(&view.id), &mut players, None),
                SnapshotEntry::Npc { view, npc_type } => {
                    (self.npcs.get(&view.id), &mut npcs, Some(npc_type.clone()))
                }
            };
            let view = entry.view();

            let visual = match previous {
                Some(existing) => {
                    let mut visual = existing.clone();
                    visual.npc_type = npc_type;
                    visual.reconcile(view, now, &self.config);
                    visual
                }
                None => VisualEntity::spawn(view, npc_type, now),
            };
            table.insert(view.id, visual);
        }

        self.players = players;
        self.npcs = npcs;
    }

    /// One display frame of smoothing for entities and the camera.
    pub fn interpolate(&mut self) {
        let snap = self.config.snap_threshold_px;
        for player in self.players.values_mut() {
            player.approach(self.config.player_smoothing, snap);
        }
        for npc in self.npcs.values_mut() {
            npc.approach(self.config.npc_smoothing, snap);
        }

        if let Some(local) = self.local_id.and_then(|id| self.players.get(&id)) {
            self.camera.center_on(local.position.0, local.position.1);
        }
        self.camera.update();
    }

    pub fn frame(&self) -> RenderFrame {
        let players = self.players.values().map(|player| {
            let local = Some(player.id) == self.local_id;
            player.render(EntityKind::Player { local }, &self.camera)
        });
        let npcs = self.npcs.values().map(|npc| {
            let npc_type = npc.npc_type.clone().unwrap_or_default();
            npc.render(EntityKind::Npc { npc_type }, &self.camera)
        });

        RenderFrame {
            camera: self.camera.position(),
            entities: players.chain(npcs).collect(),
        }
    }

    pub fn player(&self, id: u32) -> Option<&VisualEntity> {
        self.players.get(&id)
    }

    pub fn npc(&self, id: u32) -> Option<&VisualEntity> {
        self.npcs.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}
