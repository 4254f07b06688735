//! Declarative scenario model, parsed from YAML
//!
//! A scenario is an ordered list of steps; each step is an optional
//! state mutation, an optional readiness wait, ordered capture
//! requests, and assertions over what was captured. Steps execute
//! strictly in declared order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::Assertion;
use crate::error::{HarnessError, HarnessResult};
use crate::readiness::ReadinessStrategy;

fn default_run_timeout_ms() -> u64 {
    120_000
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

/// A complete scenario parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Target URL; the runner's base URL applies when absent.
    #[serde(default)]
    pub url: Option<String>,

    /// Viewport size for the browser.
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Budget for the whole run; on expiry the in-flight step fails
    /// with a scenario timeout and teardown proceeds immediately.
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,

    /// Steps to execute in order.
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One ordered unit of work within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(default)]
    pub name: Option<String>,

    /// State mutation; `None` means observe only.
    #[serde(default)]
    pub action: Option<StepAction>,

    /// Wait applied after the mutation; `None` proceeds immediately.
    #[serde(default)]
    pub ready: Option<ReadinessStrategy>,

    /// Captures executed in declared order once the step has settled.
    #[serde(default)]
    pub captures: Vec<CaptureRequest>,

    /// Assertions judged against the artifacts captured so far.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl ScenarioStep {
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("step-{index}"))
    }
}

/// A step's mutation: a debug hook call, or a click on one of the
/// app's own controls (e.g. the time-warp toggle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepAction {
    Hook(HookCall),
    Click { click: String },
}

impl StepAction {
    pub fn describe(&self) -> String {
        match self {
            Self::Hook(call) => format!("hook '{}'", call.hook),
            Self::Click { click } => format!("click '{click}'"),
        }
    }
}

/// A named debug hook invocation with JSON arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookCall {
    pub hook: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// What to record during a step. Every request carries a destination
/// identifier that doubles as the artifact id; destinations must be
/// unique within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureRequest {
    /// Viewport screenshot persisted as `<destination>.png`.
    Screenshot { destination: String },

    /// Computed CSS property of the first matching element.
    ComputedStyle {
        destination: String,
        selector: String,
        property: String,
    },

    /// Inner text of the first matching element.
    InnerText {
        destination: String,
        selector: String,
    },

    /// Structured read from the application's debug state root.
    BridgeRead { destination: String, path: String },
}

impl CaptureRequest {
    pub fn destination(&self) -> &str {
        match self {
            Self::Screenshot { destination }
            | Self::ComputedStyle { destination, .. }
            | Self::InnerText { destination, .. }
            | Self::BridgeRead { destination, .. } => destination,
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string.
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a scenario from a YAML file.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load every `.yaml`/`.yml` scenario under a directory.
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Artifact destinations must be unique within a run; a collision
    /// is a configuration error surfaced before the run starts.
    pub fn validate(&self) -> HarnessResult<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            for capture in &step.captures {
                if !seen.insert(capture.destination().to_string()) {
                    return Err(HarnessError::DuplicateDestination(
                        capture.destination().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn effective_url(&self, fallback: &str) -> String {
        self.url.clone().unwrap_or_else(|| fallback.to_string())
    }
}
