//! Engine behavior against a scripted in-memory driver: ordering,
//! halt-vs-continue semantics, teardown, and run-level cancellation.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use common::{png_bytes, FakeDriver, FakeFactory};
use veriviz_harness::bridge::{MARKER_HOOK_MISSING, MARKER_VALUE};
use veriviz_harness::capture::ArtifactStore;
use veriviz_harness::report::StepStatus;
use veriviz_harness::{EngineOptions, HarnessError, Scenario, ScenarioEngine};

fn engine(factory: Arc<FakeFactory>, dir: &std::path::Path) -> ScenarioEngine {
    ScenarioEngine::new(
        factory,
        ArtifactStore::new(dir).unwrap(),
        EngineOptions::default(),
    )
}

#[tokio::test]
async fn empty_scenario_passes_and_closes_session() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new();
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml("name: noop\nsteps: []\n").unwrap();
    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(report.passed());
    assert!(report.steps.is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn heavy_rain_scenario_passes_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new()
        .with_rule("setDebugWeather", json!({ MARKER_VALUE: null }))
        .with_rule("currRain !== undefined", json!(true))
        .with_rule(
            r#""aetherDebug","weatherEffects""#,
            json!({ MARKER_VALUE: { "currRain": true } }),
        )
        .with_text("#date-display", "Sat Aug 23")
        .with_screenshot(png_bytes(8, 8));
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: heavy-rain
steps:
  - name: force-rain
    action:
      hook: setDebugWeather
      args: [65]
    ready:
      wait: predicate_poll
      expression: "window.aetherDebug.weatherEffects.currRain !== undefined"
      timeout_ms: 1000
      poll_interval_ms: 10
    captures:
      - kind: screenshot
        destination: rain
      - kind: bridge_read
        destination: rain-state
        path: aetherDebug.weatherEffects
      - kind: inner_text
        destination: date
        selector: "#date-display"
    assertions:
      - check: captured
        artifact: rain
      - check: value_truthy
        artifact: rain-state
      - check: text_not_in
        artifact: date
        rejected: ["--"]
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(report.passed(), "failures: {:?}", report.failures());
    let step = &report.steps[0];
    assert_eq!(step.artifacts.len(), 3);
    assert!(step.assertions.iter().all(|a| a.passed));
    assert!(tmp.path().join("rain.png").is_file());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn time_warp_click_restyles_the_time_display() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new()
        .with_clickable("#time-warp-btn")
        .with_style("#time-display", "color", "rgb(255, 165, 0)")
        .with_screenshot(png_bytes(8, 8));
    let clicks = driver.clicks_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: time-warp
steps:
  - name: engage-warp
    action:
      click: "#time-warp-btn"
    ready:
      wait: fixed_delay
      ms: 10
    captures:
      - kind: computed_style
        destination: warp-color
        selector: "#time-display"
        property: color
      - kind: screenshot
        destination: timewarp
    assertions:
      - check: text_equals
        artifact: warp-color
        expected: "rgb(255, 165, 0)"
      - check: captured
        artifact: timewarp
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(report.passed(), "failures: {:?}", report.failures());
    assert_eq!(*clicks.lock().unwrap(), vec!["#time-warp-btn".to_string()]);
}

#[tokio::test]
async fn click_on_missing_control_halts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_screenshot(png_bytes(4, 4));
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: no-toggle
steps:
  - action:
      click: "#time-warp-btn"
  - captures:
      - kind: screenshot
        destination: after
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].status, StepStatus::Failed);
    assert!(report.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("#time-warp-btn"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn computed_style_capture_requires_an_element() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_style("#time-display", "color", "rgb(255, 255, 255)");
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: style-probe
steps:
  - captures:
      - kind: computed_style
        destination: ghost-color
        selector: "#ghost"
        property: color
      - kind: computed_style
        destination: clock-color
        selector: "#time-display"
        property: color
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    let step = &report.steps[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.capture_failures.len(), 1);
    assert_eq!(step.capture_failures[0].destination, "ghost-color");
    assert!(step.capture_failures[0].reason.contains("#ghost"));
    // The probe on the real element still lands.
    assert_eq!(step.artifacts.len(), 1);
    assert_eq!(step.artifacts[0].id, "clock-color");
}

#[tokio::test]
async fn readiness_timeout_halts_remaining_steps() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_screenshot(png_bytes(4, 4));
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: never-ready
steps:
  - ready:
      wait: predicate_poll
      expression: "window.neverTrue"
      timeout_ms: 60
      poll_interval_ms: 10
  - captures:
      - kind: screenshot
        destination: after
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 1, "halted run must skip later steps");
    let step = &report.steps[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().contains("Readiness timeout"));
    assert!(!tmp.path().join("after.png").exists());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_hook_halts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let driver =
        FakeDriver::new().with_rule("setDebugGravity", json!({ MARKER_HOOK_MISSING: true }));
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: unknown-hook
steps:
  - action:
      hook: setDebugGravity
      args: [9.81]
  - captures:
      - kind: bridge_read
        destination: state
        path: aetherDebug
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert_eq!(report.steps.len(), 1);
    assert!(report.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("setDebugGravity"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn capture_failure_fails_step_but_run_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new()
        .with_rule(
            r#""aetherDebug""#,
            json!({ MARKER_VALUE: { "ready": true } }),
        )
        .with_screenshot(png_bytes(4, 4));
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: partial-capture
steps:
  - captures:
      - kind: inner_text
        destination: missing
        selector: "#does-not-exist"
      - kind: bridge_read
        destination: state
        path: aetherDebug
  - captures:
      - kind: screenshot
        destination: shot
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 2, "capture failures must not halt");

    let first = &report.steps[0];
    assert_eq!(first.status, StepStatus::Failed);
    assert_eq!(first.capture_failures.len(), 1);
    assert_eq!(first.capture_failures[0].destination, "missing");
    // The failed capture does not abort the rest of the step's captures.
    assert_eq!(first.artifacts.len(), 1);
    assert_eq!(first.artifacts[0].id, "state");

    assert_eq!(report.steps[1].status, StepStatus::Passed);
}

#[tokio::test]
async fn duplicate_destinations_rejected_before_any_session_opens() {
    let tmp = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(FakeDriver::new()));
    let opens = factory.opens_handle();

    let scenario = Scenario::from_yaml(
        r##"
name: collision
steps:
  - captures:
      - kind: screenshot
        destination: shot
  - captures:
      - kind: screenshot
        destination: shot
"##,
    )
    .unwrap();

    let err = engine(factory, tmp.path()).run(&scenario).await.unwrap_err();
    assert!(matches!(err, HarnessError::DuplicateDestination(ref d) if d == "shot"));
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_timeout_cancels_step_and_still_tears_down() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new();
    let closes = driver.closes_handle();
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: over-budget
run_timeout_ms: 80
steps:
  - name: stall
    ready:
      wait: fixed_delay
      ms: 10000
  - captures:
      - kind: screenshot
        destination: late
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 1);
    let step = &report.steps[0];
    assert_eq!(step.name, "stall");
    assert!(step.error.as_deref().unwrap().contains("80 ms"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_launch_counts_against_the_run_budget() {
    let tmp = tempfile::tempdir().unwrap();
    let factory = Arc::new(
        FakeFactory::new(FakeDriver::new())
            .with_open_delay(std::time::Duration::from_secs(10)),
    );

    let scenario = Scenario::from_yaml(
        "name: slow-launch\nrun_timeout_ms: 60\nsteps:\n  - captures:\n      - kind: screenshot\n        destination: s\n",
    )
    .unwrap();

    let err = engine(factory, tmp.path()).run(&scenario).await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::ScenarioTimeout { timeout_ms: 60 }
    ));
}

#[tokio::test]
async fn assertions_see_artifacts_from_earlier_steps() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_text("#date-display", "Sat Aug 23");
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: cross-step
steps:
  - captures:
      - kind: inner_text
        destination: date
        selector: "#date-display"
  - assertions:
      - check: text_equals
        artifact: date
        expected: "Sat Aug 23"
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();
    assert!(report.passed(), "failures: {:?}", report.failures());
}

#[tokio::test]
async fn persistent_placeholder_text_times_out() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_text("#date-display", "--");
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        r##"
name: stuck-placeholder
steps:
  - ready:
      wait: selector_text_non_empty
      selector: "#date-display"
      timeout_ms: 60
      excluded: ["--"]
    captures:
      - kind: inner_text
        destination: date
        selector: "#date-display"
"##,
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();

    assert!(!report.passed());
    let error = report.steps[0].error.as_deref().unwrap();
    assert!(error.contains("Readiness timeout"));
    // The last observation names the stuck placeholder.
    assert!(error.contains("--"), "diagnostic was: {error}");
}

#[tokio::test]
async fn session_close_is_idempotent() {
    let driver = FakeDriver::new();
    let closes = driver.closes_handle();
    let session = veriviz_harness::session::Session::new(
        Box::new(driver),
        veriviz_harness::session::Transcripts::default(),
        "http://127.0.0.1:5173",
    );

    session.close().await;
    session.close().await;

    assert!(session.is_closed());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn launch_failure_propagates_as_error() {
    let tmp = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::failing());

    let scenario = Scenario::from_yaml(
        "name: unlaunchable\nsteps:\n  - captures:\n      - kind: screenshot\n        destination: s\n",
    )
    .unwrap();

    let err = engine(factory, tmp.path()).run(&scenario).await.unwrap_err();
    assert!(matches!(err, HarnessError::Launch(_)));
}

#[tokio::test]
async fn undecodable_screenshot_is_a_capture_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let driver = FakeDriver::new().with_screenshot(b"not a png".to_vec());
    let factory = Arc::new(FakeFactory::new(driver));

    let scenario = Scenario::from_yaml(
        "name: bad-shot\nsteps:\n  - captures:\n      - kind: screenshot\n        destination: broken\n",
    )
    .unwrap();

    let report = engine(factory, tmp.path()).run(&scenario).await.unwrap();
    assert!(!report.passed());
    let failure = &report.steps[0].capture_failures[0];
    assert_eq!(failure.destination, "broken");
    assert!(failure.reason.contains("decodable"));
    assert!(!tmp.path().join("broken.png").exists());
}
