//! Composes completion, placement and scoring into one response, with an
//! optional collaborator in front.
//!
//! # Flow
//!
//! ```text
//! DesignData ─► complete ─► (collaborator proposal | optimize) ─► score ─► report
//! ```
//!
//! The collaborator path is taken only when a session is configured and the
//! rate governor grants a call. Any collaborator failure (unavailable, quota,
//! timeout, garbage output, untypeable modules) drops back to the
//! algorithmic path. The one failure surfaced to the caller is a proposal
//! whose module count differs from the completed set, because modules can
//! then no longer be matched by position.
//!
//! Scores are always computed locally from the positions actually returned.

use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;

use crate::collaborator::{
    build_optimization_prompt, build_review_prompt, parse_proposal, parse_review,
    CollaboratorError, CollaboratorSession, Proposal,
};
use crate::compliance::{adjacency_violations, recommendations, score};
use crate::completion::complete;
use crate::error::{HabitatError, HabitatResult};
use crate::governor::{Clock, GovernorConfig, RateGovernor, SystemClock};
use crate::layout::{clamp_to_envelope, optimize_with_trace, LayoutParams};
use crate::module::{DesignData, HabitatConfig, Module, MAX_CREW_SIZE};
use crate::report::{Analysis, LayoutSource, OptimizationReport, OptimizedLayout, Validation};

/// Parse a request body into design data.
///
/// An empty body, `null` or `{}` is [`HabitatError::NoDesignData`]; a crew
/// larger than [`MAX_CREW_SIZE`] is [`HabitatError::CrewSizeOutOfRange`].
pub fn parse_design(body: &str) -> HabitatResult<DesignData> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(HabitatError::NoDesignData);
    }
    let value: Value = serde_json::from_str(trimmed)?;
    let blank = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if blank {
        return Err(HabitatError::NoDesignData);
    }
    let design: DesignData = serde_json::from_value(value)?;
    let crew_size = design.habitat_config.crew_size();
    if crew_size > MAX_CREW_SIZE {
        return Err(HabitatError::CrewSizeOutOfRange {
            crew_size,
            max: MAX_CREW_SIZE,
        });
    }
    Ok(design)
}

/// Score the design as supplied, without completing or moving anything.
pub fn validate_design(design: &DesignData) -> OptimizationReport {
    let modules = &design.modules;
    let config = &design.habitat_config;
    let report = score(modules, config);
    let overall = report.score;
    log::info!(
        "Validated design with {} modules, score {}",
        modules.len(),
        overall
    );

    OptimizationReport {
        validation: Validation::from_report(report, recommendations(overall)),
        optimized_layout: None,
        analysis: Analysis {
            volume_analysis: format!(
                "Analyzed {} modules; {:.1} m³ per crew member",
                modules.len(),
                config.volume_per_crew()
            ),
            zoning_analysis: "Basic zoning analysis completed".to_string(),
            adjacency_analysis: adjacency_summary(modules),
            safety_analysis: format!("Safety score: {}%", overall),
        },
        source: LayoutSource::Algorithmic,
    }
}

/// Algorithmic optimization with default layout parameters.
pub fn optimize_design(design: &DesignData) -> OptimizationReport {
    optimize_design_with(design, &LayoutParams::default())
}

/// Complete, place and score a design.
pub fn optimize_design_with(design: &DesignData, params: &LayoutParams) -> OptimizationReport {
    let config = &design.habitat_config;
    let outcome = optimize_with_trace(&design.modules, config, params);
    let modules = outcome.modules;

    let report = score(&modules, config);
    let overall = report.score;
    log::info!(
        "Optimized {} modules algorithmically, score {}",
        modules.len(),
        overall
    );

    let mut changes = Vec::new();
    let added = modules.len().saturating_sub(design.modules.len());
    if added > 0 {
        changes.push(format!(
            "Added {} essential modules for habitability compliance",
            added
        ));
    }
    changes.push("Repositioned modules using zoning algorithms".to_string());
    let unresolved = outcome.placements.iter().filter(|p| p.collided).count();
    if unresolved > 0 {
        changes.push(format!(
            "{} modules could not be fully separated from their neighbours",
            unresolved
        ));
    }

    OptimizationReport {
        validation: Validation::from_report(report, recommendations(overall)),
        analysis: Analysis {
            volume_analysis: format!(
                "Optimized {} modules algorithmically; {:.1} m³ per crew member",
                modules.len(),
                config.volume_per_crew()
            ),
            zoning_analysis: "Modules positioned by functional zones".to_string(),
            adjacency_analysis: adjacency_summary(&modules),
            safety_analysis: format!("Algorithmic layout achieves {}% compliance", overall),
        },
        optimized_layout: Some(OptimizedLayout {
            habitat_config: config.clone(),
            modules,
            changes,
            reasoning: format!(
                "Applied zoning and separation rules to achieve {}% compliance",
                overall
            ),
        }),
        source: LayoutSource::Algorithmic,
    }
}

fn adjacency_summary(modules: &[Module]) -> String {
    match adjacency_violations(modules).len() {
        0 => "No forbidden adjacencies".to_string(),
        n => format!("{} forbidden adjacencies within 4 m", n),
    }
}

/// Why a collaborator proposal could not be used as-is.
#[derive(Error, Debug)]
pub enum ProposalError {
    /// Surfaced to the caller.
    #[error(transparent)]
    Mismatch(#[from] HabitatError),
    /// Recovered by falling back to the algorithmic layout.
    #[error(transparent)]
    Unusable(#[from] CollaboratorError),
}

/// Turn a collaborator proposal into a trusted report.
///
/// `completed` is the completed module set the collaborator was shown. Each
/// proposed module is merged over the completed module at the same index
/// (missing or `null` fields are taken from the original) and must keep that
/// module's id. It is then pulled inside the safe envelope, and the whole
/// layout is re-scored. Whatever score or compliance the collaborator
/// claimed is discarded.
pub fn reconcile_proposal(
    completed: &[Module],
    config: &HabitatConfig,
    proposal: Proposal,
    params: &LayoutParams,
) -> Result<OptimizationReport, ProposalError> {
    if proposal.modules.len() != completed.len() {
        return Err(HabitatError::ModuleCountMismatch {
            returned: proposal.modules.len(),
            expected: completed.len(),
        }
        .into());
    }

    let mut modules = Vec::with_capacity(completed.len());
    let mut repaired = 0usize;
    for (original, candidate) in completed.iter().zip(proposal.modules) {
        let mut module = backfill(original, candidate)?;
        if module.id != original.id {
            return Err(CollaboratorError::Malformed(format!(
                "module {} came back as {}",
                original.id, module.id
            ))
            .into());
        }
        let clamped = clamp_to_envelope(module.position, config, params);
        if clamped != module.position {
            repaired += 1;
            module.position = clamped.rounded(params.position_decimals);
        }
        modules.push(module);
    }

    let report = score(&modules, config);
    let overall = report.score;
    log::info!("Collaborator layout re-scored at {}", overall);

    let mut changes = proposal.changes;
    if changes.is_empty() {
        changes.push("Repositioned modules from collaborator proposal".to_string());
    }
    if repaired > 0 {
        changes.push(format!(
            "Moved {} modules back inside the safe envelope",
            repaired
        ));
    }
    let recs = if proposal.recommendations.is_empty() {
        recommendations(overall)
    } else {
        proposal.recommendations
    };
    let analysis = proposal.analysis.unwrap_or_else(|| Analysis {
        volume_analysis: format!(
            "{} modules; {:.1} m³ per crew member",
            modules.len(),
            config.volume_per_crew()
        ),
        zoning_analysis: "Zoning proposed by collaborator".to_string(),
        adjacency_analysis: adjacency_summary(&modules),
        safety_analysis: format!("Verified layout achieves {}% compliance", overall),
    });

    Ok(OptimizationReport {
        validation: Validation::from_report(report, recs),
        optimized_layout: Some(OptimizedLayout {
            habitat_config: config.clone(),
            modules,
            changes,
            reasoning: proposal
                .reasoning
                .unwrap_or_else(|| format!("Collaborator layout verified at {}% compliance", overall)),
        }),
        analysis,
        source: LayoutSource::Collaborator,
    })
}

fn backfill(original: &Module, candidate: Value) -> Result<Module, CollaboratorError> {
    let Value::Object(mut fields) = candidate else {
        return Err(CollaboratorError::Malformed(format!(
            "module entry for {} is not an object",
            original.id
        )));
    };
    let Value::Object(defaults) =
        serde_json::to_value(original).map_err(|e| CollaboratorError::Malformed(e.to_string()))?
    else {
        return Err(CollaboratorError::Malformed("module did not serialize to an object".into()));
    };
    for (key, value) in defaults {
        let missing = fields.get(&key).map_or(true, Value::is_null);
        if missing {
            fields.insert(key, value);
        }
    }
    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        CollaboratorError::Malformed(format!("module {}: {}", original.id, e))
    })
}

/// Request handler core: owns the layout parameters, the rate governor and
/// the optional collaborator session. Shareable across threads.
pub struct Orchestrator<C: Clock = SystemClock> {
    params: LayoutParams,
    governor: RateGovernor<C>,
    session: Option<Mutex<CollaboratorSession>>,
}

impl Orchestrator<SystemClock> {
    /// Purely algorithmic orchestrator, no collaborator.
    pub fn algorithmic(params: LayoutParams) -> Self {
        Self {
            params,
            governor: RateGovernor::new(GovernorConfig::default()),
            session: None,
        }
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(
        params: LayoutParams,
        governor: RateGovernor<C>,
        session: Option<CollaboratorSession>,
    ) -> Self {
        Self {
            params,
            governor,
            session: session.map(Mutex::new),
        }
    }

    pub fn governor(&self) -> &RateGovernor<C> {
        &self.governor
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Optimize a design, preferring a collaborator proposal when one is
    /// permitted and usable.
    pub fn optimize(&self, design: &DesignData) -> HabitatResult<OptimizationReport> {
        let config = &design.habitat_config;
        let completed = complete(&design.modules, config);

        let Some(text) = self.ask(|| build_optimization_prompt(&completed, config)) else {
            return Ok(optimize_design_with(design, &self.params));
        };
        let proposal = match parse_proposal(&text) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("{}, using algorithmic optimization", e);
                return Ok(optimize_design_with(design, &self.params));
            }
        };

        match reconcile_proposal(&completed, config, proposal, &self.params) {
            Ok(report) => Ok(report),
            Err(ProposalError::Mismatch(e)) => {
                log::warn!("{}", e);
                Err(e)
            }
            Err(ProposalError::Unusable(e)) => {
                log::warn!("{}, using algorithmic optimization", e);
                Ok(optimize_design_with(design, &self.params))
            }
        }
    }

    /// Validate a design as supplied. A collaborator may contribute
    /// recommendations and analysis text; the score is always local.
    pub fn validate(&self, design: &DesignData) -> OptimizationReport {
        let mut report = validate_design(design);
        let Some(text) =
            self.ask(|| build_review_prompt(&design.modules, &design.habitat_config))
        else {
            return report;
        };
        match parse_review(&text) {
            Ok((recs, analysis)) => {
                if !recs.is_empty() {
                    report.validation.recommendations = recs;
                }
                if let Some(analysis) = analysis {
                    report.analysis = analysis;
                }
            }
            Err(e) => log::warn!("{}, using local validation only", e),
        }
        report
    }

    /// Run the collaborator if configured and permitted. `None` means take
    /// the local path.
    fn ask(&self, prompt: impl FnOnce() -> String) -> Option<String> {
        let session = self.session.as_ref()?;
        if !self.governor.try_acquire().is_granted() {
            log::info!("Collaborator call denied by rate governor, using fallback");
            return None;
        }
        let mut session = session.lock().unwrap_or_else(|p| p.into_inner());
        match session.request(&prompt()) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("{}, using fallback", e);
                None
            }
        }
    }
}
