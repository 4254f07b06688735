//! Veriviz verification harness
//!
//! Drives a headless browser against a running visualization
//! application, forces it through a declared sequence of simulated
//! states via the application's debug hooks, waits for rendering to
//! settle, and captures screenshots and page state against which
//! assertions are evaluated.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ScenarioEngine (one run)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionFactory::open(url) -> Session                      │
//! │  for each ScenarioStep, in declared order:                  │
//! │    ├── mutate   DebugBridge::invoke(hook, args)             │
//! │    ├── wait     ReadinessStrategy::wait(..)                 │
//! │    ├── record   ArtifactStore::capture(..) -> Artifact      │
//! │    └── judge    Assertion::evaluate(artifacts)              │
//! │  Session::close()  -- always, on every exit path            │
//! │  -> ScenarioReport                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser is an opaque capability behind the [`driver::PageDriver`]
//! trait; [`chromium::ChromiumFactory`] is the live CDP implementation.

pub mod assertion;
pub mod bridge;
pub mod capture;
pub mod chromium;
pub mod driver;
pub mod engine;
pub mod error;
pub mod readiness;
pub mod report;
pub mod scenario;
pub mod session;
pub mod surface;

pub use engine::{EngineOptions, ScenarioEngine};
pub use error::{HarnessError, HarnessResult};
pub use readiness::ReadinessStrategy;
pub use report::ScenarioReport;
pub use scenario::{Scenario, ScenarioStep};
