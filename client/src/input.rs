//! Client input management with change detection

use shared::{Direction, InputToken};

/// Which of the four movement keys are held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

impl KeyState {
    /// Reads held keys from a text line such as `"wd"`. Letters are
    /// case-insensitive and anything else is ignored.
    pub fn parse(line: &str) -> Self {
        let mut keys = KeyState::default();
        for c in line.chars() {
            match Direction::from_key(c.to_ascii_uppercase()) {
                Some(Direction::Up) => keys.up = true,
                Some(Direction::Left) => keys.left = true,
                Some(Direction::Down) => keys.down = true,
                Some(Direction::Right) => keys.right = true,
                None => {}
            }
        }
        keys
    }

    pub fn has_opposite_keys(&self) -> bool {
        (self.up && self.down) || (self.left && self.right)
    }

    /// The token this key combination stands for. Opposite keys cancel out;
    /// otherwise the later key in W, A, S, D order wins.
    pub fn token(&self) -> InputToken {
        if self.has_opposite_keys() {
            return InputToken::Release;
        }

        [
            (self.up, Direction::Up),
            (self.left, Direction::Left),
            (self.down, Direction::Down),
            (self.right, Direction::Right),
        ]
        .iter()
        .filter(|(held, _)| *held)
        .last()
        .map(|(_, direction)| InputToken::Move(*direction))
        .unwrap_or(InputToken::Release)
    }
}

/// Turns sampled key states into input tokens, emitting only on change
pub struct InputManager {
    current: InputToken,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current: InputToken::Release,
        }
    }

    /// Returns the token to send, if it differs from the last one sent.
    pub fn update(&mut self, keys: KeyState) -> Option<InputToken> {
        let token = keys.token();
        if token == self.current {
            return None;
        }
        self.current = token;
        Some(token)
    }

    pub fn current(&self) -> InputToken {
        self.current
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
