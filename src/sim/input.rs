//! Keyboard state and per-frame movement intent
//!
//! Key transitions come in from a [`KeyEventSource`](crate::platform::KeyEventSource);
//! the frame loop polls [`InputState::sample_movement`] once per frame.

use std::f32::consts::FRAC_1_SQRT_2;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Semantic movement direction on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward -z
    Up,
    /// Toward +z
    Down,
    /// Toward -x
    Left,
    /// Toward +x
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// Keys the scene reacts to. Anything else is dropped at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalKey {
    W,
    A,
    S,
    D,
    ArrowUp,
    ArrowLeft,
    ArrowDown,
    ArrowRight,
    /// Confirm / interact
    Enter,
}

impl PhysicalKey {
    /// All keys bound to a movement direction
    pub const MOVEMENT: [PhysicalKey; 8] = [
        PhysicalKey::W,
        PhysicalKey::A,
        PhysicalKey::S,
        PhysicalKey::D,
        PhysicalKey::ArrowUp,
        PhysicalKey::ArrowLeft,
        PhysicalKey::ArrowDown,
        PhysicalKey::ArrowRight,
    ];

    /// Parse a `KeyboardEvent.key` value (case-insensitive)
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" => Some(PhysicalKey::W),
            "a" => Some(PhysicalKey::A),
            "s" => Some(PhysicalKey::S),
            "d" => Some(PhysicalKey::D),
            "arrowup" => Some(PhysicalKey::ArrowUp),
            "arrowleft" => Some(PhysicalKey::ArrowLeft),
            "arrowdown" => Some(PhysicalKey::ArrowDown),
            "arrowright" => Some(PhysicalKey::ArrowRight),
            "enter" => Some(PhysicalKey::Enter),
            _ => None,
        }
    }

    /// Direction this key is bound to, `None` for the confirm key
    pub fn direction(self) -> Option<Direction> {
        match self {
            PhysicalKey::W | PhysicalKey::ArrowUp => Some(Direction::Up),
            PhysicalKey::A | PhysicalKey::ArrowLeft => Some(Direction::Left),
            PhysicalKey::S | PhysicalKey::ArrowDown => Some(Direction::Down),
            PhysicalKey::D | PhysicalKey::ArrowRight => Some(Direction::Right),
            PhysicalKey::Enter => None,
        }
    }

    fn slot(self) -> Option<usize> {
        Self::MOVEMENT.iter().position(|k| *k == self)
    }
}

/// Held flags for every movement key.
///
/// Each physical key is tracked on its own so that a direction stays held
/// while any of its bound keys is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct KeyState {
    held: [bool; 8],
}

impl KeyState {
    fn set(&mut self, key: PhysicalKey, down: bool) {
        if let Some(i) = key.slot() {
            self.held[i] = down;
        }
    }

    /// Logical OR of all keys bound to `dir`
    fn is_held(&self, dir: Direction) -> bool {
        PhysicalKey::MOVEMENT
            .iter()
            .zip(self.held.iter())
            .any(|(key, held)| *held && key.direction() == Some(dir))
    }

    fn clear(&mut self) {
        self.held = [false; 8];
    }
}

/// Movement for one frame, already scaled by speed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementSample {
    pub dx: f32,
    pub dz: f32,
    pub is_moving: bool,
}

impl MovementSample {
    pub const IDLE: MovementSample = MovementSample {
        dx: 0.0,
        dz: 0.0,
        is_moving: false,
    };

    /// Delta as a ground-plane (x, z) vector
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.dx, self.dz)
    }
}

/// Callback fired on each confirm key-down edge
pub type ActionCallback = Box<dyn FnMut()>;

/// Live keyboard state plus derived movement intent
pub struct InputState {
    keys: KeyState,
    /// Confirm key level, used for edge detection
    confirm_held: bool,
    enabled: bool,
    speed: f32,
    action: Option<ActionCallback>,
}

impl fmt::Debug for InputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputState")
            .field("keys", &self.keys)
            .field("confirm_held", &self.confirm_held)
            .field("enabled", &self.enabled)
            .field("speed", &self.speed)
            .field("action_bound", &self.action.is_some())
            .finish()
    }
}

impl InputState {
    pub fn new(speed: f32) -> Self {
        Self {
            keys: KeyState::default(),
            confirm_held: false,
            enabled: true,
            speed,
            action: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.speed)
    }

    /// Register the action callback, replacing any previous one.
    ///
    /// The callback runs synchronously inside [`Self::record_key_transition`];
    /// it must not reach back into this `InputState` (queue work instead).
    pub fn bind_action_trigger(&mut self, callback: impl FnMut() + 'static) {
        self.action = Some(Box::new(callback));
    }

    /// Apply a raw key transition by `KeyboardEvent.key` name.
    ///
    /// Unrecognized keys are ignored. Returns true if the action callback fired.
    pub fn record_key_transition(&mut self, key_name: &str, is_down: bool) -> bool {
        match PhysicalKey::from_key_name(key_name) {
            Some(key) => self.record_physical(key, is_down),
            None => false,
        }
    }

    /// Apply a transition for an already-parsed key
    pub fn record_physical(&mut self, key: PhysicalKey, is_down: bool) -> bool {
        if !self.enabled {
            return false;
        }

        if key == PhysicalKey::Enter {
            let rising = is_down && !self.confirm_held;
            self.confirm_held = is_down;
            if rising {
                if let Some(action) = self.action.as_mut() {
                    log::debug!("Action triggered");
                    action();
                    return true;
                }
            }
            return false;
        }

        self.keys.set(key, is_down);
        false
    }

    /// Derive this frame's movement from the held keys
    pub fn sample_movement(&self) -> MovementSample {
        if !self.enabled {
            return MovementSample::IDLE;
        }

        let axis = |pos: Direction, neg: Direction| -> f32 {
            (self.keys.is_held(pos) as i8 - self.keys.is_held(neg) as i8) as f32
        };
        let mut dx = axis(Direction::Right, Direction::Left);
        let mut dz = axis(Direction::Down, Direction::Up);

        let is_moving = dx != 0.0 || dz != 0.0;

        // Diagonals must not be faster than a single axis
        if dx != 0.0 && dz != 0.0 {
            dx *= FRAC_1_SQRT_2;
            dz *= FRAC_1_SQRT_2;
        }

        MovementSample {
            dx: dx * self.speed,
            dz: dz * self.speed,
            is_moving,
        }
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            log::debug!("Input enabled");
        }
        self.enabled = true;
    }

    /// Disable input and release every key in the same step
    pub fn disable(&mut self) {
        if self.enabled {
            log::debug!("Input disabled");
        }
        self.keys.clear();
        self.confirm_held = false;
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    fn is_held(&self, dir: Direction) -> bool {
        self.keys.is_held(dir)
    }
}
