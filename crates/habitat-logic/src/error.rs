//! Error types surfaced at the request boundary.
//!
//! Collaborator failures are not here: the orchestrator always recovers from
//! them by falling back to the algorithmic layout.

use thiserror::Error;

pub type HabitatResult<T> = Result<T, HabitatError>;

#[derive(Error, Debug)]
pub enum HabitatError {
    /// Request body was empty or `null`.
    #[error("No design data provided")]
    NoDesignData,

    /// Request body was not a valid design.
    #[error("Invalid design data: {0}")]
    InvalidDesign(#[from] serde_json::Error),

    /// Crew size too large to complete a layout for.
    #[error("Crew size {crew_size} exceeds the supported maximum of {max}")]
    CrewSizeOutOfRange { crew_size: i64, max: i64 },

    /// Layout parameters that would break placement.
    #[error("Invalid layout parameters: {0}")]
    InvalidParams(String),

    /// A design or parameter file could not be read.
    #[error("Could not read input: {0}")]
    Io(#[from] std::io::Error),

    /// A proposed layout does not line up with the completed module set, so
    /// modules cannot be matched by position.
    #[error("Collaborator returned {returned} modules, expected {expected}")]
    ModuleCountMismatch { returned: usize, expected: usize },
}

impl HabitatError {
    /// HTTP-style status a boundary layer would attach to this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoDesignData
            | Self::InvalidDesign(_)
            | Self::CrewSizeOutOfRange { .. }
            | Self::InvalidParams(_) => 400,
            Self::ModuleCountMismatch { .. } => 422,
            Self::Io(_) => 500,
        }
    }
}
