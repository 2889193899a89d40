use crate::protocol::EntityView;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Integer pixel coordinate in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Facing of an entity. Drives sprite row selection and movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Maps the movement key characters used on the wire.
    pub fn from_key(key: char) -> Option<Direction> {
        match key {
            'W' => Some(Direction::Up),
            'A' => Some(Direction::Left),
            'S' => Some(Direction::Down),
            'D' => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn key(&self) -> char {
        match self {
            Direction::Up => 'W',
            Direction::Left => 'A',
            Direction::Down => 'S',
            Direction::Right => 'D',
        }
    }

    /// Name used in snapshots. Up is spelled `top`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Direction::Up => "top",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    pub fn from_wire(name: &str) -> Option<Direction> {
        match name {
            "top" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit grid offset, y grows downwards.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Cardinal direction for a grid offset. Diagonals and zero yield None.
    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Two-frame walk cycle. Toggles every period while moving, rests on frame 0.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    frame: u8,
    last_flip: Option<Instant>,
}

impl Animator {
    pub fn frame(&self) -> u8 {
        self.frame
    }

    pub fn advance(&mut self, moving: bool, now: Instant, period: Duration) -> u8 {
        if !moving {
            self.frame = 0;
            self.last_flip = None;
            return self.frame;
        }

        match self.last_flip {
            None => self.last_flip = Some(now),
            Some(last) if now.duration_since(last) >= period => {
                self.frame = (self.frame + 1) % 2;
                self.last_flip = Some(now);
            }
            Some(_) => {}
        }
        self.frame
    }
}

/// State shared by players and NPCs.
///
/// `position` is the only authoritative coordinate on the server; `target` is the
/// last committed destination and is never used for collision.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub position: Point,
    pub target: Point,
    pub direction: Direction,
    pub moving: bool,
    pub animator: Animator,
}

impl Entity {
    pub fn new(id: u32, x: i32, y: i32) -> Self {
        Self {
            id,
            position: Point::new(x, y),
            target: Point::new(x, y),
            direction: Direction::Down,
            moving: false,
            animator: Animator::default(),
        }
    }

    pub fn frame(&self) -> u8 {
        self.animator.frame()
    }

    /// Wire view of the current state.
    pub fn view(&self) -> EntityView {
        EntityView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            direction: self.direction,
            frame: self.frame(),
            moving: self.moving,
        }
    }

    pub fn animate(&mut self, now: Instant, period: Duration) -> u8 {
        self.animator.advance(self.moving, now, period)
    }

    /// Exponential approach of `position` toward `target`, snapping once both axes
    /// are within `snap_px`. Returns true while the entity is still travelling.
    pub fn approach_target(&mut self, smoothing: f32, snap_px: f32) -> bool {
        if self.position == self.target {
            return false;
        }

        let dx = (self.target.x - self.position.x) as f32;
        let dy = (self.target.y - self.position.y) as f32;
        if dx.abs() < snap_px && dy.abs() < snap_px {
            self.position = self.target;
            return false;
        }

        self.position.x += step_toward(dx, smoothing);
        self.position.y += step_toward(dy, smoothing);

        let rx = (self.target.x - self.position.x) as f32;
        let ry = (self.target.y - self.position.y) as f32;
        if rx.abs() < snap_px && ry.abs() < snap_px {
            self.position = self.target;
            return false;
        }
        true
    }
}

// Rounded fractional step that always makes at least one pixel of progress.
fn step_toward(delta: f32, smoothing: f32) -> i32 {
    if delta == 0.0 {
        return 0;
    }
    let step = (delta * smoothing).round() as i32;
    if step == 0 {
        delta.signum() as i32
    } else {
        step
    }
}
