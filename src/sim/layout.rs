//! Placement of the billboards around the city

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::BILLBOARD_OFFSET;

/// Link opened from the billboard interaction prompt
pub const BILLBOARD_LINK: &str = "https://somnia.network/";

/// Everything needed to build one beacon, before its images are loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconSpec {
    pub label: String,
    /// Ground-plane anchor as (x, z)
    pub anchor: Vec2,
    /// Rotation about the vertical axis (radians)
    #[serde(default)]
    pub facing: f32,
    /// Height of the panel center above ground
    #[serde(default)]
    pub elevation: f32,
    /// Panel width and height
    #[serde(default)]
    pub size: Vec2,
    #[serde(default)]
    pub link: Option<String>,
    /// Image sources in display order
    pub sources: Vec<String>,
}

impl BeaconSpec {
    pub fn new<S: Into<String>>(
        label: impl Into<String>,
        anchor: Vec2,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            label: label.into(),
            anchor,
            facing: 0.0,
            elevation: 0.0,
            size: Vec2::ZERO,
            link: None,
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_facing(mut self, facing: f32) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_panel(mut self, size: Vec2, elevation: f32) -> Self {
        self.size = size;
        self.elevation = elevation;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// The two giant billboards standing just outside the map edge
pub fn metropolis_billboards(map_limit: f32) -> Vec<BeaconSpec> {
    let distance = map_limit + BILLBOARD_OFFSET;
    let width = map_limit;
    let height = width / 4.0;
    let elevation = height / 2.0 + 10.0;
    let panel = Vec2::new(width, height);

    vec![
        BeaconSpec::new(
            "north",
            Vec2::new(0.0, -distance),
            ["/somiversebillboard1.jpeg", "/somiversebillboard2.jpeg"],
        )
        .with_panel(panel, elevation)
        .with_link(BILLBOARD_LINK),
        BeaconSpec::new(
            "west",
            Vec2::new(-distance, 0.0),
            ["/somiversebillboard3.jpeg", "/somiversebillboard4.jpeg"],
        )
        .with_facing(std::f32::consts::FRAC_PI_2)
        .with_panel(panel, elevation)
        .with_link(BILLBOARD_LINK),
    ]
}
