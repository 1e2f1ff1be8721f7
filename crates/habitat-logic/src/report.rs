//! Response shapes returned across the request boundary.

use serde::{Deserialize, Serialize};

use crate::compliance::{ComplianceBand, ComplianceReport};
use crate::module::{HabitatConfig, Module};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub overall_score: u8,
    pub compliance: ComplianceBand,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Validation {
    /// Build from a locally computed report; the band always follows the score.
    pub fn from_report(report: ComplianceReport, recommendations: Vec<String>) -> Self {
        Self {
            overall_score: report.score,
            compliance: ComplianceBand::from_score(report.score),
            issues: report.issues,
            recommendations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedLayout {
    pub habitat_config: HabitatConfig,
    pub modules: Vec<Module>,
    pub changes: Vec<String>,
    pub reasoning: String,
}

/// Free-text summaries per concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    pub volume_analysis: String,
    pub zoning_analysis: String,
    pub adjacency_analysis: String,
    pub safety_analysis: String,
}

/// Which producer supplied the returned positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSource {
    Algorithmic,
    Collaborator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub validation: Validation,
    /// Absent for validation-only requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_layout: Option<OptimizedLayout>,
    pub analysis: Analysis,
    pub source: LayoutSource,
}

/// Structured error object for the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&crate::error::HabitatError> for ErrorResponse {
    fn from(err: &crate::error::HabitatError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_band_follows_score() {
        let report = ComplianceReport {
            score: 72,
            issues: vec!["x".into()],
        };
        let v = Validation::from_report(report, vec![]);
        assert_eq!(v.compliance, ComplianceBand::Warning);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["overallScore"], json!(72));
        assert_eq!(json["compliance"], json!("warning"));
    }

    #[test]
    fn validation_only_report_omits_layout() {
        let report = OptimizationReport {
            validation: Validation::from_report(
                ComplianceReport {
                    score: 100,
                    issues: vec![],
                },
                vec![],
            ),
            optimized_layout: None,
            analysis: Analysis::default(),
            source: LayoutSource::Algorithmic,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("optimizedLayout").is_none());
        assert_eq!(json["source"], json!("algorithmic"));
        assert!(json["analysis"].get("volumeAnalysis").is_some());
    }

    #[test]
    fn error_response_from_error() {
        let err = crate::error::HabitatError::NoDesignData;
        let body = ErrorResponse::from(&err);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"error": "No design data provided"})
        );
    }
}
