//! Scene settings
//!
//! Read from LocalStorage on the web, defaults on native.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;

/// Tunables consumed by the input and billboard systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Movement per frame along one axis (diagonals are normalized to match)
    pub speed: f32,
    /// Minimum interval between billboard image advances (ms)
    pub rotation_period_ms: f64,
    /// Default distance threshold for the billboard prompt
    pub proximity_range: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            rotation_period_ms: ROTATION_PERIOD_MS,
            proximity_range: PROXIMITY_RANGE,
        }
    }
}

impl Settings {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "somiverse_settings";

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would break the frame invariants
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "speed",
                reason: format!("must be a positive number, got {}", self.speed),
            });
        }
        validate_rotation_period(self.rotation_period_ms)?;
        validate_proximity_range(self.proximity_range)
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

/// A zero or NaN period would rotate on every tick, including repeated instants
pub(crate) fn validate_rotation_period(period_ms: f64) -> Result<(), SettingsError> {
    if !period_ms.is_finite() || period_ms <= 0.0 {
        return Err(SettingsError::Invalid {
            field: "rotation_period_ms",
            reason: format!("must be a positive duration, got {}", period_ms),
        });
    }
    Ok(())
}

pub(crate) fn validate_proximity_range(range: f32) -> Result<(), SettingsError> {
    if !range.is_finite() || range <= 0.0 {
        return Err(SettingsError::Invalid {
            field: "proximity_range",
            reason: format!("must be a positive distance, got {}", range),
        });
    }
    Ok(())
}
