//! Run reports
//!
//! The sole output of a harness run. A completed report enumerates
//! every step's outcome, including steps that failed before their
//! capture phase; nothing is left unreported.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assertion::AssertionOutcome;
use crate::capture::Artifact;
use crate::error::HarnessResult;
use crate::session::ConsoleEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// A capture that failed; the step records it and carries on with the
/// remaining captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub destination: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub artifacts: Vec<Artifact>,
    pub capture_failures: Vec<CaptureFailure>,
    pub assertions: Vec<AssertionOutcome>,
    /// Step-fatal error (hook, readiness, or run cancellation), if any.
    pub error: Option<String>,
}

/// Immutable once the scenario finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub url: String,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    pub console: Vec<ConsoleEntry>,
    pub page_errors: Vec<String>,
}

impl ScenarioReport {
    /// True when every executed step passed.
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Passed)
    }

    /// Human-readable failure lines for the diagnostic stream.
    pub fn failures(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for step in &self.steps {
            if step.status == StepStatus::Passed {
                continue;
            }
            if let Some(error) = &step.error {
                lines.push(format!("step '{}': {error}", step.name));
            }
            for failure in &step.capture_failures {
                lines.push(format!(
                    "step '{}': capture '{}' failed: {}",
                    step.name, failure.destination, failure.reason
                ));
            }
            for assertion in &step.assertions {
                if !assertion.passed {
                    lines.push(format!("step '{}': {}", step.name, assertion.explanation));
                }
            }
        }
        lines
    }

    /// Persist the report as pretty JSON under `dir`.
    pub fn write_json(&self, dir: &Path) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}-report.json", self.scenario));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!("report written to {}", path.display());
        Ok(path)
    }
}
