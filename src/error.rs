//! Error types for asset loading and settings

use thiserror::Error;

/// A single image source that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("image `{path}` failed to load: {reason}")]
pub struct LoadError {
    pub path: String,
    pub reason: String,
}

impl LoadError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Why a beacon was not materialized into the world
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeaconError {
    #[error("beacon `{label}` has no image sources")]
    NoSources { label: String },
    #[error("beacon `{label}`: all {} image sources failed", .failures.len())]
    AllSourcesFailed {
        label: String,
        failures: Vec<LoadError>,
    },
}

impl BeaconError {
    pub fn label(&self) -> &str {
        match self {
            BeaconError::NoSources { label } | BeaconError::AllSourcesFailed { label, .. } => label,
        }
    }
}

/// Settings parse/validation failure
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
