//! Grass field configuration (population size, placement and blade shape).

use serde::{Deserialize, Serialize};

/// How the initial blade population is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// One fixed blade at (0.5, 0, 0), for debugging the pipeline end to end
    Single,
    /// Uniform scatter over a horizontal square centered at the origin
    #[default]
    Plane,
    /// Scatter over a parametric heart surface, blades along the outward normal
    Heart,
}

impl std::str::FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "plane" => Ok(Self::Plane),
            "heart" => Ok(Self::Heart),
            other => Err(format!("unknown placement '{other}' (expected single, plane or heart)")),
        }
    }
}

/// Inclusive `[min, max]` range sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Map a unit sample in [0, 1] into the range
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-blade shape parameter ranges.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BladeRanges {
    pub height: Range,
    pub width: Range,
    pub stiffness: Range,
}

impl Default for BladeRanges {
    fn default() -> Self {
        Self {
            height: Range::new(2.5, 4.0),
            width: Range::new(0.14, 0.44),
            stiffness: Range::new(5.0, 10.0),
        }
    }
}

impl BladeRanges {
    /// All ranges ordered with positive lower bounds
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in [("height", self.height), ("width", self.width), ("stiffness", self.stiffness)] {
            if !(range.min > 0.0 && range.max >= range.min) {
                return Err(format!("{name} range [{}, {}] must be positive and ordered", range.min, range.max));
            }
        }
        Ok(())
    }
}

/// User-facing grass configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassConfig {
    /// Number of blades generated at startup (ignored by `Placement::Single`)
    pub blade_count: u32,
    /// Side length of the placement square in meters
    pub bounds: f32,
    /// Placement policy
    pub placement: Placement,
    /// Shape parameter ranges
    pub ranges: BladeRanges,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            blade_count: 4000,
            bounds: 30.0,
            placement: Placement::Plane,
            ranges: BladeRanges::default(),
        }
    }
}

impl GrassConfig {
    /// Number of blades the configured placement will produce
    pub fn effective_count(&self) -> u32 {
        match self.placement {
            Placement::Single => 1,
            Placement::Plane | Placement::Heart => self.blade_count,
        }
    }
}
