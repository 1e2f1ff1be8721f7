//! Layout collaborator interface — an optional external producer of
//! alternative layouts (typically a generative text model).
//!
//! Nothing a collaborator returns is trusted. Its text is parsed into loose
//! JSON here and only the structure is checked; the orchestrator then
//! backfills, repairs and re-scores the proposed modules locally.

use serde_json::{json, Value};
use thiserror::Error;

use crate::module::{HabitatConfig, Module};
use crate::report::Analysis;

/// Calls after the first made by [`CollaboratorSession::request`] when the
/// collaborator reports a generic failure.
const RETRIES: u32 = 1;

const COMPLIANCE_RULES: &str = "\
1. Sleep quarters: upper levels, away from noise (exercise, life-support, maintenance)
2. Exercise: lower levels, adjacent to hygiene, away from sleep/medical/food
3. Food prep: clean zone, away from hygiene/medical, near storage
4. Medical: clean zone, isolated from contamination sources
5. Life support: accessible but separated from living areas
6. Hygiene: near exercise, away from food/medical
7. At least 25 m3 of habitable volume per crew member";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator not available")]
    Unavailable,
    #[error("collaborator quota or rate limit exceeded")]
    QuotaExceeded,
    #[error("collaborator timed out")]
    Timeout,
    #[error("collaborator call failed: {0}")]
    Failed(String),
    #[error("collaborator response was empty or blocked")]
    EmptyResponse,
    #[error("collaborator response malformed: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    /// Whether another attempt in the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A client able to answer a layout prompt with free text.
pub trait LayoutCollaborator: Send {
    fn propose(&mut self, prompt: &str) -> Result<String, CollaboratorError>;
}

type Connector = Box<dyn Fn() -> Option<Box<dyn LayoutCollaborator>> + Send + Sync>;

/// Long-lived handle to a collaborator client.
///
/// Built once at startup and handed to the orchestrator. When the client
/// could not be created (or was dropped), [`reinitialize`](Self::reinitialize)
/// runs the connector again.
pub struct CollaboratorSession {
    client: Option<Box<dyn LayoutCollaborator>>,
    connector: Connector,
}

impl CollaboratorSession {
    /// Create a session and try to connect immediately.
    pub fn connect<F>(connector: F) -> Self
    where
        F: Fn() -> Option<Box<dyn LayoutCollaborator>> + Send + Sync + 'static,
    {
        let mut session = Self {
            client: None,
            connector: Box::new(connector),
        };
        session.reinitialize();
        session
    }

    /// A session with no collaborator behind it; every request fails over.
    pub fn offline() -> Self {
        Self::connect(|| None)
    }

    pub fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    /// Rebuild the client from the connector. Returns whether it is ready.
    pub fn reinitialize(&mut self) -> bool {
        self.client = (self.connector)();
        if self.client.is_none() {
            log::warn!("Layout collaborator unavailable");
        }
        self.is_ready()
    }

    /// Send a prompt, reconnecting once if needed and retrying generic
    /// failures. Quota, timeout and availability errors are returned at once.
    pub fn request(&mut self, prompt: &str) -> Result<String, CollaboratorError> {
        if !self.is_ready() && !self.reinitialize() {
            return Err(CollaboratorError::Unavailable);
        }
        let client = self.client.as_mut().ok_or(CollaboratorError::Unavailable)?;

        let mut attempt = 0;
        loop {
            match client.propose(prompt) {
                Ok(text) if text.trim().is_empty() => return Err(CollaboratorError::EmptyResponse),
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < RETRIES => {
                    attempt += 1;
                    log::warn!("Collaborator error on attempt {}: {}, retrying", attempt, err);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Structurally checked collaborator proposal. Module entries are still
/// loose JSON; they are merged and typed by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub modules: Vec<Value>,
    pub changes: Vec<String>,
    pub reasoning: Option<String>,
    pub recommendations: Vec<String>,
    pub analysis: Option<Analysis>,
}

/// Parse collaborator text into a [`Proposal`].
///
/// Accepts bare JSON or JSON wrapped in a markdown code fence. The only
/// required structure is `optimizedLayout.modules` as an array; every other
/// field is optional and dropped when it has the wrong shape.
pub fn parse_proposal(text: &str) -> Result<Proposal, CollaboratorError> {
    let value = parse_json_body(text)?;
    let layout = value
        .get("optimizedLayout")
        .and_then(Value::as_object)
        .ok_or_else(|| CollaboratorError::Malformed("missing optimizedLayout object".into()))?;
    let modules = layout
        .get("modules")
        .and_then(Value::as_array)
        .ok_or_else(|| CollaboratorError::Malformed("optimizedLayout.modules is not an array".into()))?
        .clone();

    Ok(Proposal {
        modules,
        changes: string_list(layout.get("changes")),
        reasoning: layout
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string),
        recommendations: string_list(value.pointer("/validation/recommendations")),
        analysis: parse_analysis(&value),
    })
}

/// Parse a validation-only answer: recommendations and analysis, if present.
pub fn parse_review(text: &str) -> Result<(Vec<String>, Option<Analysis>), CollaboratorError> {
    let value = parse_json_body(text)?;
    if !value.get("validation").is_some_and(Value::is_object) {
        return Err(CollaboratorError::Malformed("missing validation object".into()));
    }
    Ok((
        string_list(value.pointer("/validation/recommendations")),
        parse_analysis(&value),
    ))
}

fn parse_json_body(text: &str) -> Result<Value, CollaboratorError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(CollaboratorError::Malformed("top level is not an object".into()));
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_analysis(value: &Value) -> Option<Analysis> {
    value
        .get("analysis")
        .filter(|a| a.is_object())
        .and_then(|a| serde_json::from_value(a.clone()).ok())
}

/// Prompt asking the collaborator to reposition a completed module set.
pub fn build_optimization_prompt(modules: &[Module], config: &HabitatConfig) -> String {
    let compact: Vec<Value> = modules
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "type": m.module_type,
                "position": m.position,
                "zone": m.zone,
                "size": m.size,
                "volume": m.volume,
                "color": m.color,
            })
        })
        .collect();
    let module_list = serde_json::to_string_pretty(&compact).unwrap_or_else(|_| "[]".into());
    let config_json = serde_json::to_string(config).unwrap_or_else(|_| "{}".into());

    format!(
        "SPACE HABITAT OPTIMIZATION TASK\n\n\
         REQUIREMENTS:\n\
         - Container: Cylinder R={radius}m H={height}m\n\
         - Crew: {crew} members\n\
         - Modules: {count} total (including added essential modules)\n\n\
         COMPLIANCE RULES:\n{rules}\n\n\
         COMPLETE MODULE LIST:\n{module_list}\n\n\
         OUTPUT REQUIRED (JSON only):\n\
         {{\n  \"validation\": {{\"overallScore\": 0-100, \"compliance\": \"compliant|warning|critical\", \"issues\": [], \"recommendations\": []}},\n  \
         \"optimizedLayout\": {{\"habitatConfig\": {config_json}, \"modules\": [{{\"id\": \"module_id\", \"type\": \"module_type\", \"position\": [x,y,z], \"size\": [w,h,d], \"zone\": \"zone\", \"volume\": 0, \"color\": \"color\"}}], \"changes\": [], \"reasoning\": \"\"}},\n  \
         \"analysis\": {{\"volumeAnalysis\": \"\", \"zoningAnalysis\": \"\", \"adjacencyAnalysis\": \"\", \"safetyAnalysis\": \"\"}}\n}}\n\n\
         Return ALL {count} modules in the same order, each repositioned.",
        radius = config.radius,
        height = config.height,
        crew = config.crew_size(),
        count = modules.len(),
        rules = COMPLIANCE_RULES,
    )
}

/// Prompt asking the collaborator to review a design without moving it.
pub fn build_review_prompt(modules: &[Module], config: &HabitatConfig) -> String {
    let design = json!({"modules": modules, "habitatConfig": config});
    let design_json = serde_json::to_string_pretty(&design).unwrap_or_else(|_| "{}".into());
    format!(
        "Analyze this space habitat design for habitability compliance.\n\n\
         COMPLIANCE RULES:\n{COMPLIANCE_RULES}\n\n\
         HABITAT DESIGN DATA:\n{design_json}\n\n\
         Respond with JSON: {{\"validation\": {{\"overallScore\": 0-100, \"compliance\": \"\", \"issues\": [], \"recommendations\": []}}, \
         \"analysis\": {{\"volumeAnalysis\": \"\", \"zoningAnalysis\": \"\", \"adjacencyAnalysis\": \"\", \"safetyAnalysis\": \"\"}}}}"
    )
}
