//! Module catalog — module types, zones, noise levels and the fixed tables
//! keyed on them.
//!
//! Every rule table the optimizer and scorer consult lives here so the two
//! stay in agreement: placement priority, zone templates, synthesis
//! templates for mandatory modules and the forbidden-adjacency table.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::module::Vec3;

/// Functional type of a habitat module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    Sleep,
    Food,
    Hygiene,
    LifeSupport,
    Airlock,
    Medical,
    Exercise,
    Workstation,
    Storage,
    Recreation,
    Laboratory,
    Greenhouse,
    Communication,
    Maintenance,
    /// Any type string outside the catalog.
    #[serde(other)]
    Unknown,
}

/// Types every habitat must contain, in the order they are synthesized.
pub const MANDATORY_TYPES: [ModuleType; 4] = [
    ModuleType::Sleep,
    ModuleType::Food,
    ModuleType::Hygiene,
    ModuleType::LifeSupport,
];

impl ModuleType {
    /// Wire name, as used in ids and issue strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Food => "food",
            Self::Hygiene => "hygiene",
            Self::LifeSupport => "life-support",
            Self::Airlock => "airlock",
            Self::Medical => "medical",
            Self::Exercise => "exercise",
            Self::Workstation => "workstation",
            Self::Storage => "storage",
            Self::Recreation => "recreation",
            Self::Laboratory => "laboratory",
            Self::Greenhouse => "greenhouse",
            Self::Communication => "communication",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_mandatory(&self) -> bool {
        MANDATORY_TYPES.contains(self)
    }

    /// Placement priority; lower is placed first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::LifeSupport => 1,
            Self::Airlock => 2,
            Self::Sleep => 3,
            Self::Food => 4,
            Self::Hygiene => 5,
            Self::Medical => 6,
            Self::Exercise => 7,
            Self::Workstation => 8,
            Self::Storage => 9,
            Self::Recreation => 10,
            Self::Laboratory => 11,
            Self::Greenhouse => 12,
            Self::Communication => 13,
            Self::Maintenance => 14,
            Self::Unknown => 99,
        }
    }

    /// Where modules of this type sit inside the cylinder.
    pub fn zone_template(&self) -> ZoneTemplate {
        let (radius_fraction, level_fraction, angle_offset) = match self {
            Self::LifeSupport => (0.8, -0.4, 0.0),
            Self::Airlock => (0.9, 0.0, 0.0),
            Self::Sleep => (0.6, 0.3, 0.0),
            Self::Food => (0.5, 0.1, PI / 4.0),
            Self::Hygiene => (0.7, -0.2, PI / 2.0),
            Self::Medical => (0.4, 0.2, PI),
            Self::Exercise => (0.8, -0.3, PI / 2.0),
            Self::Workstation => (0.6, 0.2, PI / 6.0),
            Self::Storage => (0.7, -0.1, PI / 3.0),
            Self::Recreation => (0.3, 0.0, 0.0),
            Self::Laboratory => (0.5, 0.3, 3.0 * PI / 4.0),
            Self::Greenhouse => (0.6, 0.4, PI / 8.0),
            Self::Communication => (0.4, 0.1, 5.0 * PI / 4.0),
            Self::Maintenance => (0.8, -0.4, PI),
            Self::Unknown => (0.7, 0.0, 0.0),
        };
        ZoneTemplate {
            radius_fraction,
            level_fraction,
            angle_offset,
        }
    }

    /// Types that must not sit within the adjacency distance of this one.
    ///
    /// The table is not symmetric: sleep forbids life-support but
    /// life-support forbids nothing.
    pub fn forbidden_neighbors(&self) -> &'static [ModuleType] {
        match self {
            Self::Sleep => &[Self::Exercise, Self::Maintenance, Self::LifeSupport],
            Self::Food => &[Self::Hygiene, Self::Medical, Self::Exercise],
            Self::Medical => &[Self::Food, Self::Exercise, Self::Maintenance],
            Self::Exercise => &[Self::Sleep, Self::Medical, Self::Food],
            _ => &[],
        }
    }

    /// Synthesis template, only defined for mandatory types.
    pub fn template(&self) -> Option<ModuleTemplate> {
        let template = match self {
            Self::Sleep => ModuleTemplate {
                size: Vec3::new(3.0, 2.0, 2.0),
                volume: 12.0,
                zone: Zone::Quiet,
                noise_level: NoiseLevel::Silent,
                color: "#3b82f6",
            },
            Self::Food => ModuleTemplate {
                size: Vec3::new(3.0, 2.5, 2.0),
                volume: 15.0,
                zone: Zone::Clean,
                noise_level: NoiseLevel::Moderate,
                color: "#10b981",
            },
            Self::Hygiene => ModuleTemplate {
                size: Vec3::new(2.0, 2.0, 1.5),
                volume: 6.0,
                zone: Zone::Wet,
                noise_level: NoiseLevel::Moderate,
                color: "#8b5cf6",
            },
            Self::LifeSupport => ModuleTemplate {
                size: Vec3::new(3.0, 2.5, 2.7),
                volume: 20.25,
                zone: Zone::Technical,
                noise_level: NoiseLevel::Loud,
                color: "#dc2626",
            },
            _ => return None,
        };
        Some(template)
    }

    pub fn all() -> &'static [ModuleType] {
        &[
            Self::Sleep,
            Self::Food,
            Self::Hygiene,
            Self::LifeSupport,
            Self::Airlock,
            Self::Medical,
            Self::Exercise,
            Self::Workstation,
            Self::Storage,
            Self::Recreation,
            Self::Laboratory,
            Self::Greenhouse,
            Self::Communication,
            Self::Maintenance,
        ]
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional zone used for placement heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zone {
    #[default]
    Quiet,
    Active,
    Wet,
    Clean,
    Technical,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseLevel {
    Silent,
    Quiet,
    #[default]
    Moderate,
    Loud,
}

/// Placement template: ring radius and level as fractions of the envelope,
/// plus the starting angle on the ring (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneTemplate {
    pub radius_fraction: f64,
    pub level_fraction: f64,
    pub angle_offset: f64,
}

/// Fixed physical description used when synthesizing a missing module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleTemplate {
    pub size: Vec3,
    pub volume: f64,
    pub zone: Zone,
    pub noise_level: NoiseLevel,
    pub color: &'static str,
}
