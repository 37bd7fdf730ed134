//! Input - Per-player key bindings and control intent sampling

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keys the game can bind. Names follow the frontend's key identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    I,
    J,
    K,
    L,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    Space,
    Enter,
}

/// One player's control layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub boost: KeyCode,
}

impl KeyBindings {
    /// WASD + left shift
    pub fn player1() -> Self {
        Self {
            forward: KeyCode::W,
            backward: KeyCode::S,
            left: KeyCode::A,
            right: KeyCode::D,
            boost: KeyCode::LeftShift,
        }
    }

    /// Arrow keys + right shift
    pub fn player2() -> Self {
        Self {
            forward: KeyCode::UpArrow,
            backward: KeyCode::DownArrow,
            left: KeyCode::LeftArrow,
            right: KeyCode::RightArrow,
            boost: KeyCode::RightShift,
        }
    }
}

/// Raw keyboard state for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    held: HashSet<KeyCode>,
    /// Keys that went down this frame
    pressed: HashSet<KeyCode>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a frame where exactly `keys` are held
    pub fn from_held<I: IntoIterator<Item = KeyCode>>(keys: I) -> Self {
        Self {
            held: keys.into_iter().collect(),
            pressed: HashSet::new(),
        }
    }

    /// Next frame's state: `pressed` is whatever is held now but was not before
    pub fn advance<I: IntoIterator<Item = KeyCode>>(&self, keys: I) -> Self {
        let held: HashSet<KeyCode> = keys.into_iter().collect();
        let pressed = held.difference(&self.held).copied().collect();
        Self { held, pressed }
    }

    pub fn press(&mut self, key: KeyCode) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
        self.pressed.remove(&key);
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }
}

/// Normalised control intent derived from the bound keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlIntent {
    /// 1.0 forward, -0.5 backward, 0.0 idle
    pub vertical: f32,
    /// -1.0 (left) ..= 1.0 (right)
    pub horizontal: f32,
    pub boost_requested: bool,
    pub is_moving: bool,
}

impl ControlIntent {
    pub const FORWARD: f32 = 1.0;
    pub const BACKWARD: f32 = -0.5;

    pub fn sample(bindings: &KeyBindings, keys: &KeyState) -> Self {
        let forward = keys.is_held(bindings.forward);
        let backward = keys.is_held(bindings.backward);
        let left = keys.is_held(bindings.left);
        let right = keys.is_held(bindings.right);

        // forward wins when both are held
        let vertical = if forward {
            Self::FORWARD
        } else if backward {
            Self::BACKWARD
        } else {
            0.0
        };

        let mut horizontal = 0.0;
        if left {
            horizontal -= 1.0;
        }
        if right {
            horizontal += 1.0;
        }

        Self {
            vertical,
            horizontal: f32::clamp(horizontal, -1.0, 1.0),
            boost_requested: keys.is_held(bindings.boost),
            is_moving: forward || backward || left || right,
        }
    }
}
