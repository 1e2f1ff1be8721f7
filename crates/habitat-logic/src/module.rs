//! Habitat data model — modules, the cylindrical envelope and the request
//! payload that carries both.
//!
//! Field names follow the JSON wire format (camelCase, vectors as
//! `[x, y, z]` arrays). Fields the core does not interpret are kept in an
//! `extra` map so they survive the trip back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{ModuleType, NoiseLevel, Zone};

/// Most decimal places [`Vec3::rounded`] will keep.
pub const MAX_DECIMALS: i32 = 15;

/// A point or extent in habitat space. `y` runs along the cylinder axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between centers.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance from the cylinder axis.
    pub fn radial_distance(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Round every component to `decimals` places, clamped to 0..=15.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals.clamp(0, MAX_DECIMALS));
        let round = |v: f64| (v * factor).round() / factor;
        Self::new(round(self.x), round(self.y), round(self.z))
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

fn default_color() -> String {
    "#6b7280".to_string()
}

/// A discrete functional unit of a habitat design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    /// Center position. Only the layout optimizer (or orchestrator repair)
    /// writes this.
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    /// Length × width × height in meters.
    #[serde(default)]
    pub size: Vec3,
    /// Volume in m³.
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub zone: Zone,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub noise_level: NoiseLevel,
    /// Editor fields the core passes through untouched (level, isFixed, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Module {
    /// Build a module of `module_type` from its catalog template.
    ///
    /// Returns `None` for types without a synthesis template.
    pub fn from_template(id: impl Into<String>, module_type: ModuleType) -> Option<Self> {
        let template = module_type.template()?;
        Some(Self {
            id: id.into(),
            module_type,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            size: template.size,
            volume: template.volume,
            zone: template.zone,
            color: template.color.to_string(),
            noise_level: template.noise_level,
            extra: Map::new(),
        })
    }
}

/// Largest crew a design may ask for. Completion adds one sleep quarter per
/// crew member, so this also bounds the completed module count.
pub const MAX_CREW_SIZE: i64 = 1000;

/// Mission parameters attached to a habitat configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionParameters {
    /// Crew members aboard. Signed so malformed input degrades instead of
    /// failing to parse.
    pub crew_size: i64,
    /// Mission duration in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for MissionParameters {
    fn default() -> Self {
        Self {
            crew_size: 4,
            mission_duration: None,
            destination: None,
            extra: Map::new(),
        }
    }
}

/// Cylindrical habitat envelope. Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitatConfig {
    /// Cylinder radius in meters.
    pub radius: f64,
    /// Cylinder height in meters, centered on y = 0.
    pub height: f64,
    /// Total habitable volume in m³.
    pub volume: f64,
    pub mission: MissionParameters,
    /// Shape, levels, payload constraints and anything else the editor sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            height: 10.0,
            volume: 0.0,
            mission: MissionParameters::default(),
            extra: Map::new(),
        }
    }
}

impl HabitatConfig {
    pub fn crew_size(&self) -> i64 {
        self.mission.crew_size
    }

    /// Habitable volume per crew member, 0 when the crew size is not positive.
    pub fn volume_per_crew(&self) -> f64 {
        if self.crew_size() > 0 {
            self.volume / self.crew_size() as f64
        } else {
            0.0
        }
    }
}

/// Request payload: the caller's modules and the envelope they go in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignData {
    pub modules: Vec<Module>,
    pub habitat_config: HabitatConfig,
}
