//! Autonomous non-player entities.
//!
//! The scheduler owns every NPC outright and runs on its own period, separate
//! from the player tick. Other tasks never touch NPC state directly; they read
//! the [`NpcFrame`] copies the scheduler publishes after each update.

use crate::game::Terrain;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Direction, Entity, NpcBehavior, NpcSeed, SimConfig, SnapshotEntry};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct Npc {
    pub entity: Entity,
    pub npc_type: String,
    pub behavior: NpcBehavior,
}

impl Npc {
    pub fn new(id: u32, x: i32, y: i32, npc_type: impl Into<String>, behavior: NpcBehavior) -> Self {
        Self {
            entity: Entity::new(id, x, y),
            npc_type: npc_type.into(),
            behavior,
        }
    }

    /// Runs the behaviour step followed by interpolation toward the target.
    /// Returns true if the NPC's visible state changed.
    ///
    /// `moving` reflects whether the NPC had somewhere to go this update, so it
    /// stays set for the update that lands on the target and clears on the next
    /// idle one.
    pub fn update<R: Rng>(
        &mut self,
        rng: &mut R,
        terrain: &Terrain,
        config: &SimConfig,
        now: Instant,
    ) -> bool {
        let before = (self.entity.position, self.entity.direction, self.entity.moving);

        match self.behavior {
            NpcBehavior::Stationary => {}
            NpcBehavior::Wander => self.wander(rng, terrain, config),
            // No path data exists yet; the tag is accepted and does nothing.
            NpcBehavior::FollowPath => {}
        }

        let travelling = self.entity.position != self.entity.target;
        self.entity
            .approach_target(config.npc_smoothing, config.snap_threshold_px);
        self.entity.moving = travelling;
        self.entity.animate(now, config.animation_period());

        before != (self.entity.position, self.entity.direction, self.entity.moving)
    }

    fn wander<R: Rng>(&mut self, rng: &mut R, terrain: &Terrain, config: &SimConfig) {
        if self.entity.position != self.entity.target {
            return;
        }
        if rng.gen::<f64>() >= config.wander_chance {
            return;
        }

        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        if dx == 0 && dy == 0 {
            return;
        }

        let target = self
            .entity
            .position
            .offset(dx * config.tile_size_px, dy * config.tile_size_px);
        if config.npc_wander_collides && !terrain.can_occupy(target) {
            debug!("NPC {} wander to {:?} rejected", self.entity.id, target);
            return;
        }

        self.entity.target = target;
        // Diagonal steps keep the previous facing.
        if let Some(direction) = Direction::from_offset(dx, dy) {
            self.entity.direction = direction;
        }
    }

    pub fn entry(&self) -> SnapshotEntry {
        SnapshotEntry::Npc {
            view: self.entity.view(),
            npc_type: self.npc_type.clone(),
        }
    }
}

/// Copy of NPC state handed to the broadcaster.
#[derive(Debug, Clone, Default)]
pub struct NpcFrame {
    pub entries: Vec<SnapshotEntry>,
    pub moved: bool,
}

pub struct NpcScheduler {
    npcs: BTreeMap<u32, Npc>,
    next_id: u32,
    terrain: Terrain,
    config: SimConfig,
}

impl NpcScheduler {
    pub fn new(terrain: Terrain, config: SimConfig) -> Self {
        Self {
            npcs: BTreeMap::new(),
            next_id: config.npc_id_base,
            terrain,
            config,
        }
    }

    /// Builds the scheduler from seed records. Records with a type containing a
    /// field or line separator, an unknown behaviour, an id inside the player
    /// range, or a duplicate id are skipped.
    pub fn from_seeds(seeds: &[NpcSeed], terrain: Terrain, config: SimConfig) -> Self {
        let mut scheduler = Self::new(terrain, config);

        for seed in seeds {
            if seed.npc_type.contains(',') || seed.npc_type.contains('\n') {
                warn!("Skipping NPC {}: type {:?} cannot be sent", seed.id, seed.npc_type);
                continue;
            }
            let Some(behavior) = NpcBehavior::parse(&seed.behavior) else {
                warn!(
                    "Skipping NPC {}: unknown behavior {:?}",
                    seed.id, seed.behavior
                );
                continue;
            };
            if seed.id < scheduler.config.npc_id_base {
                warn!(
                    "Skipping NPC {}: ids below {} are reserved for players",
                    seed.id, scheduler.config.npc_id_base
                );
                continue;
            }

            let npc = Npc::new(seed.id, seed.x, seed.y, seed.npc_type.clone(), behavior);
            if !scheduler.add(npc) {
                warn!("Skipping NPC {}: duplicate id", seed.id);
            }
        }
        scheduler
    }

    pub fn add(&mut self, npc: Npc) -> bool {
        let id = npc.entity.id;
        if self.npcs.contains_key(&id) {
            return false;
        }
        info!("NPC added: id {} type {} ({:?})", id, npc.npc_type, npc.behavior);
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.npcs.insert(id, npc);
        true
    }

    /// Creates an NPC with the next free id.
    pub fn spawn(&mut self, x: i32, y: i32, npc_type: &str, behavior: NpcBehavior) -> u32 {
        let id = self.next_id;
        self.add(Npc::new(id, x, y, npc_type, behavior));
        id
    }

    pub fn get(&self, id: u32) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// One scheduler step for every NPC. Returns true if any of them changed.
    pub fn update<R: Rng>(&mut self, rng: &mut R, now: Instant) -> bool {
        let mut any_moved = false;
        for npc in self.npcs.values_mut() {
            if npc.update(rng, &self.terrain, &self.config, now) {
                any_moved = true;
            }
        }
        any_moved
    }

    pub fn snapshot(&self, moved: bool) -> NpcFrame {
        NpcFrame {
            entries: self.npcs.values().map(Npc::entry).collect(),
            moved,
        }
    }

    /// Drives the scheduler at its own period until every frame receiver is gone.
    pub async fn run(mut self, frames: watch::Sender<NpcFrame>) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval(self.config.npc_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let moved = self.update(&mut rng, Instant::now());
            if moved {
                debug!("NPC update: {} NPCs, something moved", self.npcs.len());
            }
            if frames.send(self.snapshot(moved)).is_err() {
                debug!("NPC frame receiver dropped, stopping scheduler");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{decode_snapshot, encode_snapshot, MapBounds, Point, Rect};
    use std::time::Duration;

    fn terrain(colliders: &[Rect], config: &SimConfig) -> Terrain {
        Terrain::new(
            MapBounds {
                width: 1280,
                height: 960,
            },
            colliders,
            config,
        )
    }

    fn seed(id: u32, behavior: &str) -> NpcSeed {
        NpcSeed {
            id,
            x: 320,
            y: 320,
            npc_type: "villager".to_string(),
            behavior: behavior.to_string(),
        }
    }

    #[test]
    fn test_from_seeds_filters_bad_records() {
        let config = SimConfig::default();
        let seeds = vec![
            seed(1000, "wander"),
            seed(1001, "stationary"),
            seed(1002, "follow_path"),
            seed(1003, "teleport"),
            seed(5, "wander"),
            seed(1000, "stationary"),
            NpcSeed {
                npc_type: "guard,captain".to_string(),
                ..seed(1004, "stationary")
            },
        ];
        let scheduler = NpcScheduler::from_seeds(&seeds, terrain(&[], &config), config);

        assert_eq!(scheduler.len(), 3);
        assert_eq!(scheduler.get(1000).unwrap().behavior, NpcBehavior::Wander);
        assert_eq!(scheduler.get(1002).unwrap().behavior, NpcBehavior::FollowPath);
        assert!(scheduler.get(5).is_none());
        assert!(scheduler.get(1004).is_none());
    }

    #[test]
    fn test_spawn_assigns_ids_after_seeds() {
        let config = SimConfig::default();
        let mut scheduler = NpcScheduler::from_seeds(&[seed(1004, "wander")], terrain(&[], &config), config);

        let id = scheduler.spawn(64, 64, "guard", NpcBehavior::Stationary);
        assert_eq!(id, 1005);
        assert_eq!(scheduler.spawn(96, 64, "guard", NpcBehavior::Stationary), 1006);
        assert_eq!(scheduler.len(), 3);
    }

    #[test]
    fn test_stationary_and_follow_path_never_move() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        let mut scheduler = NpcScheduler::new(terrain(&[], &config), config);
        let still = scheduler.spawn(320, 320, "guard", NpcBehavior::Stationary);
        let path = scheduler.spawn(640, 320, "guard", NpcBehavior::FollowPath);

        let mut rng = StdRng::seed_from_u64(1);
        let t0 = Instant::now();
        for i in 0..100 {
            assert!(!scheduler.update(&mut rng, t0 + Duration::from_millis(50 * i)));
        }
        assert_eq!(scheduler.get(still).unwrap().entity.position, Point::new(320, 320));
        assert_eq!(scheduler.get(path).unwrap().entity.position, Point::new(640, 320));
    }

    #[test]
    fn test_wander_moves_one_tile_at_a_time() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        let terrain = terrain(&[], &config);
        let mut npc = Npc::new(1000, 320, 320, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(42);
        let t0 = Instant::now();

        let mut moves = 0;
        for i in 0..50 {
            let before = npc.entity.position;
            if npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50 * i)) {
                let after = npc.entity.position;
                assert!((after.x - before.x).abs() <= 32);
                assert!((after.y - before.y).abs() <= 32);
                assert_eq!((after.x - 320) % 32, 0);
                assert_eq!((after.y - 320) % 32, 0);
                moves += 1;
            }
            // Full smoothing lands on the target within the same update.
            assert_eq!(npc.entity.position, npc.entity.target);
        }
        assert!(moves > 10, "wanderer only moved {} times", moves);
    }

    #[test]
    fn test_wandering_is_published_as_moving() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        let mut scheduler = NpcScheduler::new(terrain(&[], &config), config);
        let id = scheduler.spawn(640, 480, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(5);
        let t0 = Instant::now();

        let mut moving_frames = 0;
        let mut walk_frames = 0;
        for i in 0..200 {
            let moved = scheduler.update(&mut rng, t0 + Duration::from_millis(50 * i));
            let decoded = decode_snapshot(&encode_snapshot(&scheduler.snapshot(moved).entries));
            let view = decoded.entries[0].view();
            assert_eq!(view.id, id);
            if view.moving {
                moving_frames += 1;
            }
            if view.frame == 1 {
                walk_frames += 1;
            }
        }
        assert!(moving_frames > 100, "only {} frames were moving", moving_frames);
        assert!(walk_frames > 0);
    }

    #[test]
    fn test_moving_clears_on_the_update_after_arrival() {
        let config = SimConfig::default();
        let terrain = terrain(&[], &config);
        let mut npc = Npc::new(1000, 320, 320, "guard", NpcBehavior::Stationary);
        npc.entity.target = Point::new(352, 320);
        let mut rng = StdRng::seed_from_u64(2);
        let t0 = Instant::now();

        assert!(npc.update(&mut rng, &terrain, &config, t0));
        assert_eq!(npc.entity.position, Point::new(352, 320));
        assert!(npc.entity.moving);

        assert!(npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50)));
        assert!(!npc.entity.moving);
        assert!(!npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_wander_direction_follows_cardinal_offsets() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        let terrain = terrain(&[], &config);
        let mut npc = Npc::new(1000, 640, 480, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(3);
        let t0 = Instant::now();

        for i in 0..50 {
            let before = npc.entity.position;
            let facing = npc.entity.direction;
            npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50 * i));
            let after = npc.entity.position;

            match Direction::from_offset(after.x - before.x, after.y - before.y) {
                Some(direction) => assert_eq!(npc.entity.direction, direction),
                None => assert_eq!(npc.entity.direction, facing),
            }
        }
    }

    #[test]
    fn test_wander_ignores_colliders_by_default() {
        let config = SimConfig {
            wander_chance: 1.0,
            ..SimConfig::default()
        };
        // The whole map is solid.
        let walls = [Rect::new(0, 0, 1280, 960)];
        let terrain = terrain(&walls, &config);
        let mut npc = Npc::new(1000, 320, 320, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(8);
        let t0 = Instant::now();

        let mut moved = false;
        for i in 0..20 {
            moved |= npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50 * i));
        }
        assert!(moved);
    }

    #[test]
    fn test_wander_respects_colliders_when_enabled() {
        let config = SimConfig {
            wander_chance: 1.0,
            npc_wander_collides: true,
            ..SimConfig::default()
        };
        let walls = [Rect::new(0, 0, 1280, 960)];
        let terrain = terrain(&walls, &config);
        let mut npc = Npc::new(1000, 320, 320, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(8);
        let t0 = Instant::now();

        for i in 0..20 {
            assert!(!npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50 * i)));
        }
        assert_eq!(npc.entity.position, Point::new(320, 320));
    }

    #[test]
    fn test_zero_chance_never_wanders() {
        let config = SimConfig {
            wander_chance: 0.0,
            ..SimConfig::default()
        };
        let mut scheduler = NpcScheduler::new(terrain(&[], &config), config);
        scheduler.spawn(320, 320, "villager", NpcBehavior::Wander);
        let mut rng = StdRng::seed_from_u64(2);
        let t0 = Instant::now();

        for i in 0..100 {
            assert!(!scheduler.update(&mut rng, t0 + Duration::from_millis(50 * i)));
        }
        let frame = scheduler.snapshot(false);
        assert_eq!(frame.entries.len(), 1);
        assert!(matches!(&frame.entries[0], SnapshotEntry::Npc { npc_type, .. } if npc_type == "villager"));
    }

    #[test]
    fn test_slow_smoothing_glides_to_target() {
        let config = SimConfig {
            wander_chance: 0.0,
            npc_smoothing: 0.25,
            ..SimConfig::default()
        };
        let terrain = terrain(&[], &config);
        let mut npc = Npc::new(1000, 320, 320, "villager", NpcBehavior::Wander);
        npc.entity.target = Point::new(352, 320);
        let mut rng = StdRng::seed_from_u64(2);
        let t0 = Instant::now();

        assert!(npc.update(&mut rng, &terrain, &config, t0));
        assert!(npc.entity.moving);
        assert!(npc.entity.position.x > 320 && npc.entity.position.x < 352);

        for i in 1..30 {
            npc.update(&mut rng, &terrain, &config, t0 + Duration::from_millis(50 * i));
        }
        assert_eq!(npc.entity.position, Point::new(352, 320));
        assert!(!npc.entity.moving);
    }
}
