//! Compliance scoring — fixed habitability rubric over a positioned layout.
//!
//! The score starts at 100 and each violated rule subtracts a fixed
//! penalty and records a human-readable issue:
//!
//! | Rule | Penalty |
//! |------|---------|
//! | Volume per crew below 25 m³ | 30 |
//! | Each missing mandatory type | 20 |
//! | Fewer sleep quarters than crew | 15 |
//! | Each ordered forbidden pair closer than 4 m | 5 |
//!
//! Adjacency is judged per ordered pair: a sleep module 2 m from an
//! exercise module is flagged once as sleep→exercise and once as
//! exercise→sleep, since both types list the other as forbidden. A pair
//! forbidden in one direction only (sleep→life-support) is flagged once.
//!
//! ```
//! use habitat_logic::compliance::{score, ComplianceBand};
//! use habitat_logic::module::HabitatConfig;
//!
//! let report = score(&[], &HabitatConfig::default());
//! assert_eq!(report.score, 0);
//! assert_eq!(ComplianceBand::from_score(report.score), ComplianceBand::Critical);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{ModuleType, MANDATORY_TYPES};
use crate::completion::count_of;
use crate::module::{HabitatConfig, Module};

pub const MIN_VOLUME_PER_CREW: f64 = 25.0;
pub const MIN_ADJACENCY_DISTANCE: f64 = 4.0;

const VOLUME_PENALTY: i32 = 30;
const MISSING_MODULE_PENALTY: i32 = 20;
const SLEEP_DEFICIT_PENALTY: i32 = 15;
const ADJACENCY_PENALTY: i32 = 5;

/// Score plus the issues that cost points, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// 0–100.
    pub score: u8,
    pub issues: Vec<String>,
}

/// Qualitative band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceBand {
    Compliant,
    Warning,
    Critical,
}

impl ComplianceBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 85 {
            Self::Compliant
        } else if score >= 70 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Score a layout against the rubric. Pure and deterministic.
pub fn score(modules: &[Module], config: &HabitatConfig) -> ComplianceReport {
    let mut penalty = 0i32;
    let mut issues = Vec::new();

    let crew_size = config.crew_size();
    let volume_per_crew = config.volume_per_crew();
    if volume_per_crew < MIN_VOLUME_PER_CREW {
        penalty += VOLUME_PENALTY;
        issues.push(format!(
            "Insufficient volume per crew: {:.1}m³ < {}m³",
            volume_per_crew, MIN_VOLUME_PER_CREW
        ));
    }

    let present: HashSet<ModuleType> = modules.iter().map(|m| m.module_type).collect();
    for essential in MANDATORY_TYPES {
        if !present.contains(&essential) {
            penalty += MISSING_MODULE_PENALTY;
            issues.push(format!("Missing essential module: {}", essential));
        }
    }

    let sleep_count = count_of(modules, ModuleType::Sleep);
    if (sleep_count as i64) < crew_size {
        penalty += SLEEP_DEFICIT_PENALTY;
        issues.push(format!(
            "Insufficient sleep quarters: {} < {}",
            sleep_count, crew_size
        ));
    }

    for (module_type, other_type) in adjacency_violations(modules) {
        penalty += ADJACENCY_PENALTY;
        issues.push(format!("{} too close to {}", module_type, other_type));
    }

    log::debug!(
        "Scored {} modules: penalty {}, {} issues",
        modules.len(),
        penalty,
        issues.len()
    );
    ComplianceReport {
        score: (100 - penalty).clamp(0, 100) as u8,
        issues,
    }
}

/// Every ordered `(module, other)` type pair where `other` is forbidden for
/// `module` and their centers are closer than [`MIN_ADJACENCY_DISTANCE`].
pub fn adjacency_violations(modules: &[Module]) -> Vec<(ModuleType, ModuleType)> {
    let mut violations = Vec::new();
    for module in modules {
        let forbidden = module.module_type.forbidden_neighbors();
        if forbidden.is_empty() {
            continue;
        }
        for other in modules {
            if !forbidden.contains(&other.module_type) {
                continue;
            }
            if module.position.distance(&other.position) < MIN_ADJACENCY_DISTANCE {
                violations.push((module.module_type, other.module_type));
            }
        }
    }
    violations
}

/// Rule-based remediation hints for a score.
pub fn recommendations(score: u8) -> Vec<String> {
    if ComplianceBand::from_score(score) == ComplianceBand::Compliant {
        vec!["Design meets basic habitability requirements".to_string()]
    } else {
        vec![
            "Consider adding missing essential modules".to_string(),
            "Optimize module positioning for better adjacency".to_string(),
            "Ensure adequate volume per crew member".to_string(),
        ]
    }
}
