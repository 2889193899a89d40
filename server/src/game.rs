use crate::movement::MovementController;
use log::{info, warn};
use rand::Rng;
use shared::{
    probe_footprint, CollisionIndex, Entity, InputToken, LinearScan, MapBounds, MapData, Point,
    Rect, SimConfig, SnapshotEntry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

const SPAWN_ATTEMPTS: usize = 32;

/// Static geometry every movement check runs against. Cheap to clone.
#[derive(Clone)]
pub struct Terrain {
    bounds: MapBounds,
    index: Arc<dyn CollisionIndex>,
    config: SimConfig,
}

impl Terrain {
    pub fn new(bounds: MapBounds, colliders: &[Rect], config: &SimConfig) -> Self {
        let index = LinearScan::new(colliders, config.collider_margin_px);
        Self::with_index(bounds, Arc::new(index), config)
    }

    /// Uses a caller-provided index, e.g. a spatial grid for large maps.
    pub fn with_index(bounds: MapBounds, index: Arc<dyn CollisionIndex>, config: &SimConfig) -> Self {
        Self {
            bounds,
            index,
            config: config.clone(),
        }
    }

    pub fn from_map(map: &MapData, config: &SimConfig) -> Self {
        Self::new(map.bounds(), &map.colliders, config)
    }

    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    pub fn collider_count(&self) -> usize {
        self.index.len()
    }

    pub fn blocks(&self, position: Point) -> bool {
        self.index.blocks(&probe_footprint(position, &self.config))
    }

    /// Inside the playable bounds and clear of every collider.
    pub fn can_occupy(&self, position: Point) -> bool {
        self.bounds
            .contains_span(position.x, position.y, self.config.entity_span_px)
            && !self.blocks(position)
    }

    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Point {
        let max_x = (self.bounds.width - self.config.entity_span_px).max(1);
        let max_y = (self.bounds.height - self.config.entity_span_px).max(1);
        Point::new(rng.gen_range(0..max_x), rng.gen_range(0..max_y))
    }
}

/// Server-side state of one connected player.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub entity: Entity,
    pub movement: MovementController,
}

/// Authoritative player state. Lives behind the server's single lock.
pub struct GameState {
    pub tick: u64,
    players: BTreeMap<u32, PlayerSession>,
    terrain: Terrain,
    config: SimConfig,
}

impl GameState {
    pub fn new(terrain: Terrain, config: SimConfig) -> Self {
        Self {
            tick: 0,
            players: BTreeMap::new(),
            terrain,
            config,
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Spawns a player at a random point inside the map. Colliders are only
    /// avoided when `validate_spawn` is set.
    pub fn add_player<R: Rng>(&mut self, player_id: u32, rng: &mut R) -> Point {
        let mut spawn = self.terrain.random_point(rng);

        if self.config.validate_spawn {
            let mut attempts = 1;
            while self.terrain.blocks(spawn) && attempts < SPAWN_ATTEMPTS {
                spawn = self.terrain.random_point(rng);
                attempts += 1;
            }
            if self.terrain.blocks(spawn) {
                warn!(
                    "No free spawn point found for player {} after {} attempts",
                    player_id, SPAWN_ATTEMPTS
                );
            }
        }

        let session = PlayerSession {
            entity: Entity::new(player_id, spawn.x, spawn.y),
            movement: MovementController::new(&self.config),
        };
        info!("Added player {} at ({}, {})", player_id, spawn.x, spawn.y);
        self.players.insert(player_id, session);
        spawn
    }

    pub fn remove_player(&mut self, player_id: u32) -> bool {
        let removed = self.players.remove(&player_id).is_some();
        if removed {
            info!("Removed player {}", player_id);
        }
        removed
    }

    pub fn apply_token(&mut self, player_id: u32, token: InputToken, now: Instant) {
        if let Some(session) = self.players.get_mut(&player_id) {
            session
                .movement
                .on_token(token, &mut session.entity, &self.terrain, now);
        }
    }

    /// Runs one movement tick for every player. Returns true if any of them moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.tick += 1;
        let period = self.config.animation_period();

        let mut any_moved = false;
        for session in self.players.values_mut() {
            if session.movement.tick(&mut session.entity, &self.terrain, now) {
                any_moved = true;
            }
            session.entity.moving = session.movement.is_moving();
            session.entity.animate(now, period);
        }
        any_moved
    }

    pub fn player_entries(&self) -> Vec<SnapshotEntry> {
        self.players
            .values()
            .map(|session| SnapshotEntry::Player(session.entity.view()))
            .collect()
    }

    pub fn player(&self, player_id: u32) -> Option<&PlayerSession> {
        self.players.get(&player_id)
    }

    pub fn player_mut(&mut self, player_id: u32) -> Option<&mut PlayerSession> {
        self.players.get_mut(&player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
