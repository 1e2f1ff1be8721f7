//! Layout optimizer — deterministic zone-aware placement inside the
//! cylindrical envelope.
//!
//! # Placement
//!
//! Modules are placed in priority order (life support first, maintenance
//! last). Each type has a zone template giving a ring radius and a level as
//! fractions of the envelope, plus a starting angle. Several modules of the
//! same type are spread evenly around their ring.
//!
//! ```text
//!          y (axis)
//!          ▲   ┌──────────┐  +height/2
//!          │   │  sleep   │  upper levels: quiet zone
//!          │   │  food    │
//!          ┼───┼──────────┤  0
//!          │   │  hygiene │
//!          │   │ life-sup │  lower levels: technical zone
//!              └──────────┘  -height/2
//! ```
//!
//! Every candidate is clamped into the safe envelope (safety margin from the
//! hull wall and end caps), then rotated around the axis in fixed steps
//! while it sits too close to an already placed module. Rotation gives up
//! after a bounded number of attempts; placement is best effort.
//!
//! ```
//! use habitat_logic::layout::optimize;
//! use habitat_logic::module::HabitatConfig;
//!
//! let layout = optimize(&[], &HabitatConfig::default());
//! assert_eq!(layout.len(), 7);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::catalog::ModuleType;
use crate::completion::complete;
use crate::error::{HabitatError, HabitatResult};
use crate::module::{HabitatConfig, Module, Vec3, MAX_DECIMALS};

/// Geometry constants for placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutParams {
    /// Clearance between module centers and the hull wall / end caps.
    pub safety_margin: f64,
    /// Centers closer than this count as a collision.
    pub min_separation: f64,
    /// Rotation attempts before a colliding candidate is accepted anyway.
    pub max_attempts: u32,
    /// Rotation per attempt, in degrees.
    pub rotation_step_degrees: f64,
    /// Decimal places kept on recorded positions.
    pub position_decimals: i32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            safety_margin: 1.5,
            min_separation: 3.0,
            max_attempts: 10,
            rotation_step_degrees: 30.0,
            position_decimals: 2,
        }
    }
}

impl LayoutParams {
    /// Reject parameters that would break placement: non-positive margin or
    /// separation, a non-finite rotation step, or decimals outside 0..=15.
    pub fn validate(&self) -> HabitatResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.safety_margin) {
            return Err(HabitatError::InvalidParams(format!(
                "safetyMargin must be positive, got {}",
                self.safety_margin
            )));
        }
        if !positive(self.min_separation) {
            return Err(HabitatError::InvalidParams(format!(
                "minSeparation must be positive, got {}",
                self.min_separation
            )));
        }
        if !self.rotation_step_degrees.is_finite() {
            return Err(HabitatError::InvalidParams(format!(
                "rotationStepDegrees must be finite, got {}",
                self.rotation_step_degrees
            )));
        }
        if !(0..=MAX_DECIMALS).contains(&self.position_decimals) {
            return Err(HabitatError::InvalidParams(format!(
                "positionDecimals must be within 0..={}, got {}",
                MAX_DECIMALS, self.position_decimals
            )));
        }
        Ok(())
    }

    /// Largest allowed distance of a module center from the axis.
    pub fn max_ring_radius(&self, config: &HabitatConfig) -> f64 {
        (config.radius - self.safety_margin).max(0.0)
    }

    /// Largest allowed |y| of a module center.
    pub fn max_level(&self, config: &HabitatConfig) -> f64 {
        (config.height / 2.0 - self.safety_margin).max(0.0)
    }
}

/// How one module ended up where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    /// Rotations applied before the candidate was accepted.
    pub attempts: u32,
    /// Whether the accepted position still collides with an earlier module.
    pub collided: bool,
}

/// Optimizer output: modules in placement order plus the placement trace.
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    pub modules: Vec<Module>,
    pub placements: Vec<Placement>,
}

/// Complete the module set and place every module with default parameters.
///
/// The result is in placement (priority) order, not input order; match
/// modules by `id`.
pub fn optimize(modules: &[Module], config: &HabitatConfig) -> Vec<Module> {
    optimize_with_trace(modules, config, &LayoutParams::default()).modules
}

/// Complete the module set and place every module, returning the trace.
pub fn optimize_with_trace(
    modules: &[Module],
    config: &HabitatConfig,
    params: &LayoutParams,
) -> LayoutOutcome {
    let mut ordered = complete(modules, config);
    // Vec::sort_by_key is stable: equal priorities keep input order.
    ordered.sort_by_key(|m| m.module_type.priority());

    let mut type_totals: HashMap<ModuleType, usize> = HashMap::new();
    for m in &ordered {
        *type_totals.entry(m.module_type).or_default() += 1;
    }

    let max_ring = params.max_ring_radius(config);
    let max_level = params.max_level(config);
    let step = params.rotation_step_degrees.to_radians();

    let mut type_seen: HashMap<ModuleType, usize> = HashMap::new();
    let mut placed: Vec<Vec3> = Vec::with_capacity(ordered.len());
    let mut placements = Vec::with_capacity(ordered.len());

    for module in ordered.iter_mut() {
        let template = module.module_type.zone_template();
        let type_total = type_totals.get(&module.module_type).copied().unwrap_or(1);
        let type_index = type_seen.entry(module.module_type).or_default();

        let mut angle = template.angle_offset;
        if type_total > 1 {
            angle += *type_index as f64 * (2.0 * PI / type_total as f64);
        }
        *type_index += 1;

        let ring = (template.radius_fraction * config.radius).clamp(0.0, max_ring);
        let mut y = template.level_fraction * config.height / 2.0;
        if y.abs() > max_level {
            y = max_level.copysign(y);
        }

        let on_ring = |angle: f64| {
            Vec3::new(ring * angle.cos(), y, ring * angle.sin()).rounded(params.position_decimals)
        };

        let mut candidate = on_ring(angle);
        let mut attempts = 0u32;
        while collides(&candidate, &placed, params.min_separation) {
            if attempts >= params.max_attempts {
                break;
            }
            angle += step;
            candidate = on_ring(angle);
            attempts += 1;
        }
        let collided = collides(&candidate, &placed, params.min_separation);
        if collided {
            log::warn!(
                "Placed {} after {} attempts with a collision still present",
                module.id,
                attempts
            );
        } else {
            log::debug!(
                "Placed {} at ({:.2}, {:.2}, {:.2}) after {} attempts",
                module.id,
                candidate.x,
                candidate.y,
                candidate.z,
                attempts
            );
        }

        module.position = candidate;
        placed.push(candidate);
        placements.push(Placement {
            id: module.id.clone(),
            attempts,
            collided,
        });
    }

    LayoutOutcome {
        modules: ordered,
        placements,
    }
}

fn collides(candidate: &Vec3, placed: &[Vec3], min_separation: f64) -> bool {
    placed
        .iter()
        .any(|p| candidate.distance(p) < min_separation)
}

/// Pull a position back inside the safe envelope.
///
/// The horizontal offset is scaled toward the axis and the level clamped to
/// the end-cap limit; positions already inside are returned unchanged.
pub fn clamp_to_envelope(position: Vec3, config: &HabitatConfig, params: &LayoutParams) -> Vec3 {
    let max_ring = params.max_ring_radius(config);
    let max_level = params.max_level(config);
    let mut clamped = position;

    let radial = position.radial_distance();
    if radial > max_ring {
        let scale = max_ring / radial;
        clamped.x *= scale;
        clamped.z *= scale;
    }
    if clamped.y.abs() > max_level {
        clamped.y = max_level.copysign(clamped.y);
    }
    clamped
}

/// Whether a position lies inside the safe envelope, within `epsilon`.
pub fn within_envelope(
    position: &Vec3,
    config: &HabitatConfig,
    params: &LayoutParams,
    epsilon: f64,
) -> bool {
    position.radial_distance() <= params.max_ring_radius(config) + epsilon
        && position.y.abs() <= params.max_level(config) + epsilon
}
