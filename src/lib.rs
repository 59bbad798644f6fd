//! SomiVerse - frame-update core of the metropolis scene
//!
//! Core modules:
//! - `sim`: Per-frame state (keyboard movement, rotating billboards)
//! - `platform`: Key event sources and image loading for browser/native
//! - `settings`: Tunable speed, rotation period and proximity range
//! - `error`: Load and settings errors

pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{BeaconError, LoadError, SettingsError};
pub use settings::Settings;

use glam::Vec2;

/// Scene configuration constants
pub mod consts {
    /// Player movement per frame along a single axis
    pub const PLAYER_SPEED: f32 = 0.5;

    /// Minimum time between billboard image changes (ms)
    pub const ROTATION_PERIOD_MS: f64 = 30_000.0;
    /// Default radius for the billboard interaction prompt
    pub const PROXIMITY_RANGE: f32 = 50.0;

    /// Half-extent of the city grid
    pub const MAP_LIMIT: f32 = 200.0;
    /// How far outside the map edge billboards stand
    pub const BILLBOARD_OFFSET: f32 = 15.0;
}

/// Euclidean distance between two ground-plane points
#[inline]
pub fn planar_distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}
