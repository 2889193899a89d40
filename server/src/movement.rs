//! Per-player movement state machine.
//!
//! Movement is quantized to whole tiles. A direction is validated once when it is
//! committed to a tile (bounds + collision at the tile's destination) and then
//! advanced a fixed step per tick until the tile is complete. A different
//! direction arriving mid-tile does not turn the player: the tile is finished in
//! the old heading, followed by a short forced pause, after which the new
//! direction is attempted if it is still held or was pressed recently enough.

use crate::game::Terrain;
use log::debug;
use shared::{Direction, Entity, InputToken, SimConfig};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    Moving,
    /// Finishing the current tile before honouring a new direction
    CompletingSqm,
    /// Forced stop after a direction change
    Paused,
}

#[derive(Debug, Clone)]
pub struct MovementController {
    state: MovementState,
    current: Option<Direction>,
    pending: Option<Direction>,
    active_input: Option<Direction>,
    pixels_in_tile: i32,
    pause_until: Option<Instant>,
    last_input_at: Option<Instant>,

    tile_px: i32,
    step_px: i32,
    pause: Duration,
    input_buffer: Duration,
}

impl MovementController {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: MovementState::Idle,
            current: None,
            pending: None,
            active_input: None,
            pixels_in_tile: 0,
            pause_until: None,
            last_input_at: None,
            tile_px: config.tile_size_px,
            step_px: config.move_step_px,
            pause: config.direction_change_pause(),
            input_buffer: config.input_buffer(),
        }
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    /// Broadcast as the `moving` flag.
    pub fn is_moving(&self) -> bool {
        matches!(
            self.state,
            MovementState::Moving | MovementState::CompletingSqm
        )
    }

    pub fn pending(&self) -> Option<Direction> {
        self.pending
    }

    /// Feeds one input line. Directions arriving while a tile is being completed
    /// or during the pause are only remembered.
    pub fn on_token(
        &mut self,
        token: InputToken,
        entity: &mut Entity,
        terrain: &Terrain,
        now: Instant,
    ) {
        let direction = match token {
            InputToken::Move(direction) => direction,
            InputToken::Release => {
                self.active_input = None;
                return;
            }
            InputToken::Unknown => {
                debug!("Player {} sent an unknown token, ignoring", entity.id);
                return;
            }
        };

        self.last_input_at = Some(now);
        self.active_input = Some(direction);

        match self.state {
            MovementState::CompletingSqm | MovementState::Paused => {
                if self.current != Some(direction) {
                    self.pending = Some(direction);
                }
            }
            MovementState::Moving => {
                if self.current != Some(direction) {
                    self.state = MovementState::CompletingSqm;
                    self.pending = Some(direction);
                }
            }
            MovementState::Idle => {
                self.try_start(direction, entity, terrain);
            }
        }
    }

    /// Advances one movement tick. Returns true when the entity's broadcast state
    /// changed: it stepped, stopped, started, or entered the pause.
    pub fn tick(&mut self, entity: &mut Entity, terrain: &Terrain, now: Instant) -> bool {
        match self.state {
            MovementState::Idle => self.start_buffered(entity, terrain, now),

            MovementState::Moving => {
                if self.pixels_in_tile >= self.tile_px {
                    self.pixels_in_tile = 0;

                    if self.active_input.is_none() && !self.within_buffer(now) {
                        self.stop(entity);
                        return true;
                    }

                    // Chaining into the next tile commits it like a fresh start.
                    let Some(direction) = self.current else {
                        self.stop(entity);
                        return true;
                    };
                    if !self.try_start(direction, entity, terrain) {
                        return true;
                    }
                }
                self.advance(entity);
                true
            }

            MovementState::CompletingSqm => {
                if self.pixels_in_tile >= self.tile_px {
                    self.state = MovementState::Paused;
                    self.pause_until = Some(now + self.pause);
                    self.pixels_in_tile = 0;
                    entity.moving = false;
                    return true;
                }
                self.advance(entity);
                true
            }

            MovementState::Paused => {
                let expired = self.pause_until.map_or(true, |until| now >= until);
                if !expired {
                    return false;
                }

                self.state = MovementState::Idle;
                self.current = None;
                self.pause_until = None;
                self.start_buffered(entity, terrain, now)
            }
        }
    }

    fn within_buffer(&self, now: Instant) -> bool {
        self.last_input_at
            .map_or(false, |at| now.duration_since(at) < self.input_buffer)
    }

    // Held key first, then a recently pressed pending direction.
    fn start_buffered(&mut self, entity: &mut Entity, terrain: &Terrain, now: Instant) -> bool {
        let pending = self.pending.take().filter(|_| self.within_buffer(now));
        match self.active_input.or(pending) {
            Some(direction) => self.try_start(direction, entity, terrain),
            None => false,
        }
    }

    fn try_start(&mut self, direction: Direction, entity: &mut Entity, terrain: &Terrain) -> bool {
        let (dx, dy) = direction.offset();
        let destination = entity
            .position
            .offset(dx * self.tile_px, dy * self.tile_px);

        if !terrain.can_occupy(destination) {
            debug!(
                "Player {} blocked moving {:?} to ({}, {})",
                entity.id, direction, destination.x, destination.y
            );
            self.pending = None;
            self.stop(entity);
            return false;
        }

        self.state = MovementState::Moving;
        self.current = Some(direction);
        self.pixels_in_tile = 0;
        entity.direction = direction;
        entity.target = destination;
        entity.moving = true;
        true
    }

    fn advance(&mut self, entity: &mut Entity) {
        if let Some(direction) = self.current {
            let (dx, dy) = direction.offset();
            entity.position = entity.position.offset(dx * self.step_px, dy * self.step_px);
            self.pixels_in_tile += self.step_px;
        }
    }

    fn stop(&mut self, entity: &mut Entity) {
        self.state = MovementState::Idle;
        self.current = None;
        self.pixels_in_tile = 0;
        entity.moving = false;
    }
}
