//! Error taxonomy for the harness
//!
//! Session-level errors (launch, navigation) are fatal to a run.
//! Bridge and readiness errors fail the current step and halt the
//! remaining steps. Capture errors fail only that capture. The engine
//! converts step-local errors into FAILED results inside the report;
//! they never escape as raised errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Debug hook not exposed by application: {0}")]
    HookNotFound(String),

    #[error("Debug hook '{hook}' threw: {message}")]
    HookExecution { hook: String, message: String },

    #[error("No element matching '{0}' to interact with")]
    ElementMissing(String),

    #[error("Debug state read failed: segment '{segment}' absent in path '{path}'")]
    Read { path: String, segment: String },

    #[error("Readiness timeout after {timeout_ms} ms waiting for {waiting_for}; last observed: {last_observed}")]
    ReadinessTimeout {
        waiting_for: String,
        timeout_ms: u64,
        last_observed: String,
    },

    #[error("Capture '{destination}' failed: {reason}")]
    Capture { destination: String, reason: String },

    #[error("Scenario run exceeded its {timeout_ms} ms budget")]
    ScenarioTimeout { timeout_ms: u64 },

    #[error("Duplicate artifact destination '{0}' in scenario")]
    DuplicateDestination(String),

    #[error("Page operation failed: {0}")]
    Page(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
