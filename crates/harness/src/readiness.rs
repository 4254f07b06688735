//! Wait predicates deciding when a state transition has settled
//!
//! Strategies are evaluated repeatedly until true or until the timeout
//! elapses. A timeout always surfaces as
//! [`HarnessError::ReadinessTimeout`] carrying the last observed
//! value for diagnostics, never as a raw framework timeout.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bridge::DebugBridge;
use crate::driver::PageDriver;
use crate::error::{HarnessError, HarnessResult};

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "wait", rename_all = "snake_case")]
pub enum ReadinessStrategy {
    /// An element matching the selector exists in the page.
    SelectorPresent {
        selector: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },

    /// The element's text content is non-empty and not one of the
    /// placeholder sentinels. Models "real data has replaced the
    /// loading marker".
    SelectorTextNonEmpty {
        selector: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        excluded: Vec<String>,
    },

    /// An arbitrary bridge expression evaluates truthy. For readiness
    /// conditions with no DOM marker, only internal application state.
    PredicatePoll {
        expression: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
    },

    /// Unconditional wait. A fallback when no observable signal exists,
    /// not a primary strategy; prefer the polling variants.
    FixedDelay { ms: u64 },
}

impl ReadinessStrategy {
    /// Human-readable description for diagnostics and reports.
    pub fn describe(&self) -> String {
        match self {
            Self::SelectorPresent { selector, .. } => {
                format!("element matching '{selector}'")
            }
            Self::SelectorTextNonEmpty { selector, excluded, .. } => {
                format!("non-placeholder text in '{selector}' (excluding {excluded:?})")
            }
            Self::PredicatePoll { expression, .. } => {
                format!("predicate `{expression}`")
            }
            Self::FixedDelay { ms } => format!("fixed delay of {ms} ms"),
        }
    }

    /// Block (cooperatively) until the strategy is satisfied or its
    /// timeout elapses.
    pub async fn wait(&self, driver: &dyn PageDriver) -> HarnessResult<()> {
        match self {
            Self::FixedDelay { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }

            Self::SelectorPresent { selector, timeout_ms } => {
                poll_until(*timeout_ms, default_poll_interval_ms(), self.describe(), || {
                    let selector = selector.clone();
                    async move {
                        let present = driver.selector_exists(&selector).await?;
                        let observed = if present {
                            "element present".to_string()
                        } else {
                            format!("no element matching '{selector}'")
                        };
                        Ok((present, observed))
                    }
                })
                .await
            }

            Self::SelectorTextNonEmpty { selector, timeout_ms, excluded } => {
                poll_until(*timeout_ms, default_poll_interval_ms(), self.describe(), || {
                    let selector = selector.clone();
                    let excluded = excluded.clone();
                    async move {
                        match driver.inner_text(&selector).await? {
                            None => Ok((false, format!("no element matching '{selector}'"))),
                            Some(text) => {
                                let trimmed = text.trim();
                                let ready = !trimmed.is_empty()
                                    && !excluded.iter().any(|p| p == trimmed);
                                Ok((ready, format!("text {trimmed:?}")))
                            }
                        }
                    }
                })
                .await
            }

            Self::PredicatePoll { expression, timeout_ms, poll_interval_ms } => {
                poll_until(*timeout_ms, *poll_interval_ms, self.describe(), || {
                    let expression = expression.clone();
                    async move {
                        let ready = DebugBridge::new(driver).predicate(&expression).await?;
                        Ok((ready, format!("`{expression}` => {ready}")))
                    }
                })
                .await
            }
        }
    }
}

/// Drive a check to completion or to a [`HarnessError::ReadinessTimeout`]
/// that carries the last observation.
async fn poll_until<F, Fut>(
    timeout_ms: u64,
    interval_ms: u64,
    waiting_for: String,
    mut check: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<(bool, String)>>,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut last_observed = String::from("<nothing observed>");

    loop {
        let (ready, observed) = check().await?;
        if ready {
            trace!(%waiting_for, "readiness satisfied");
            return Ok(());
        }
        last_observed = observed;
        if Instant::now() >= deadline {
            return Err(HarnessError::ReadinessTimeout {
                waiting_for,
                timeout_ms,
                last_observed,
            });
        }
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}
