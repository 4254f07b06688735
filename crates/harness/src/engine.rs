//! Scenario execution
//!
//! One run per scenario: `Idle -> SessionOpen -> {StepRunning}* ->
//! Finished -> TornDown`. Steps execute strictly in declared order;
//! later steps' readiness conditions may depend on earlier steps' side
//! effects, so there is no intra-run reordering. Teardown happens on
//! every exit path, including run-level cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::bridge::DebugBridge;
use crate::capture::{Artifact, ArtifactStore};
use crate::driver::SessionFactory;
use crate::error::{HarnessError, HarnessResult};
use crate::report::{CaptureFailure, ScenarioReport, StepReport, StepStatus};
use crate::scenario::{Scenario, ScenarioStep, StepAction};
use crate::session::{Session, SessionOptions};

/// Engine-level configuration shared by runs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Applied when a scenario does not declare its own URL.
    pub base_url: String,
    pub session: SessionOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            session: SessionOptions::default(),
        }
    }
}

/// Whether the run continues to the next step after this one.
enum StepFlow {
    Continue,
    Halt,
}

pub struct ScenarioEngine {
    factory: Arc<dyn SessionFactory>,
    store: ArtifactStore,
    options: EngineOptions,
}

impl ScenarioEngine {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        store: ArtifactStore,
        options: EngineOptions,
    ) -> Self {
        Self {
            factory,
            store,
            options,
        }
    }

    /// Run one scenario to completion.
    ///
    /// Launch and navigation errors are fatal and propagate; everything
    /// after a successful open is converted into FAILED results inside
    /// the report. The session is closed exactly once on every path.
    pub async fn run(&self, scenario: &Scenario) -> HarnessResult<ScenarioReport> {
        scenario.validate()?;

        let url = scenario.effective_url(&self.options.base_url);
        let mut session_options = self.options.session.clone();
        session_options.viewport_width = scenario.viewport.width;
        session_options.viewport_height = scenario.viewport.height;

        let started = Instant::now();
        // The run budget covers launch and navigation too, not just steps.
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(scenario.run_timeout_ms);

        info!(scenario = %scenario.name, %url, "opening session");
        let session = match tokio::time::timeout_at(
            deadline,
            self.factory.open(&url, &session_options),
        )
        .await
        {
            Ok(opened) => opened?,
            Err(_) => {
                return Err(HarnessError::ScenarioTimeout {
                    timeout_ms: scenario.run_timeout_ms,
                })
            }
        };

        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut all_artifacts: Vec<Artifact> = Vec::new();

        for (index, step) in scenario.steps.iter().enumerate() {
            let step_started = Instant::now();
            let step_future = self.run_step(&session, index, step, &all_artifacts);

            match tokio::time::timeout_at(deadline, step_future).await {
                Ok((report, flow)) => {
                    all_artifacts.extend(report.artifacts.iter().cloned());
                    let halt = matches!(flow, StepFlow::Halt);
                    steps.push(report);
                    if halt {
                        warn!(scenario = %scenario.name, step = index, "halting after step failure");
                        break;
                    }
                }
                Err(_) => {
                    let err = HarnessError::ScenarioTimeout {
                        timeout_ms: scenario.run_timeout_ms,
                    };
                    error!(scenario = %scenario.name, step = index, "{err}");
                    steps.push(StepReport {
                        index,
                        name: step.label(index),
                        status: StepStatus::Failed,
                        duration_ms: step_started.elapsed().as_millis() as u64,
                        artifacts: Vec::new(),
                        capture_failures: Vec::new(),
                        assertions: Vec::new(),
                        error: Some(err.to_string()),
                    });
                    break;
                }
            }
        }

        session.close().await;

        let report = ScenarioReport {
            scenario: scenario.name.clone(),
            url,
            duration_ms: started.elapsed().as_millis() as u64,
            steps,
            console: session.console_transcript(),
            page_errors: session.error_transcript(),
        };
        info!(
            scenario = %scenario.name,
            passed = report.passed(),
            duration_ms = report.duration_ms,
            "run finished"
        );
        Ok(report)
    }

    /// Execute one step: mutate, wait, capture, judge.
    ///
    /// Mutation and readiness failures fail the step and halt the run;
    /// capture and assertion failures fail the step but the run (and
    /// the step's remaining captures) carry on.
    async fn run_step(
        &self,
        session: &Session,
        index: usize,
        step: &ScenarioStep,
        prior_artifacts: &[Artifact],
    ) -> (StepReport, StepFlow) {
        let started = Instant::now();
        let driver = session.driver();
        let mut report = StepReport {
            index,
            name: step.label(index),
            status: StepStatus::Passed,
            duration_ms: 0,
            artifacts: Vec::new(),
            capture_failures: Vec::new(),
            assertions: Vec::new(),
            error: None,
        };

        if let Some(action) = &step.action {
            let applied = match action {
                StepAction::Hook(call) => DebugBridge::new(driver)
                    .invoke(&call.hook, &call.args)
                    .await
                    .map(|_| ()),
                StepAction::Click { click } => match driver.click(click).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(HarnessError::ElementMissing(click.clone())),
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = applied {
                error!(step = index, action = %action.describe(), "mutation failed: {e}");
                report.status = StepStatus::Failed;
                report.error = Some(e.to_string());
                report.duration_ms = started.elapsed().as_millis() as u64;
                return (report, StepFlow::Halt);
            }
        }

        if let Some(ready) = &step.ready {
            if let Err(e) = ready.wait(driver).await {
                error!(step = index, "readiness failed: {e}");
                report.status = StepStatus::Failed;
                report.error = Some(e.to_string());
                report.duration_ms = started.elapsed().as_millis() as u64;
                return (report, StepFlow::Halt);
            }
        }

        for request in &step.captures {
            match self.store.capture(driver, index, request).await {
                Ok(artifact) => report.artifacts.push(artifact),
                Err(e) => {
                    warn!(
                        step = index,
                        destination = request.destination(),
                        "capture failed: {e}"
                    );
                    report.status = StepStatus::Failed;
                    report.capture_failures.push(CaptureFailure {
                        destination: request.destination().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Assertions see everything captured so far, this step included.
        let visible: Vec<Artifact> = prior_artifacts
            .iter()
            .chain(report.artifacts.iter())
            .cloned()
            .collect();
        for assertion in &step.assertions {
            let outcome = assertion.evaluate(&visible);
            if !outcome.passed {
                report.status = StepStatus::Failed;
            }
            report.assertions.push(outcome);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        (report, StepFlow::Continue)
    }
}
