//! Session lifecycle and transcripts
//!
//! A [`Session`] is one live browser+page pair, owned for exactly one
//! scenario run. Teardown is idempotent and never raises to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::PageDriver;

/// One console log entry observed during the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: String,
    pub text: String,
}

/// Shared transcript sinks. The driver's event listeners append for the
/// session's entire lifetime; the session snapshots them for the report.
/// Listener callbacks must never throw back into page code, so pushes
/// swallow lock poisoning instead of panicking.
#[derive(Debug, Clone, Default)]
pub struct Transcripts {
    console: Arc<Mutex<Vec<ConsoleEntry>>>,
    page_errors: Arc<Mutex<Vec<String>>>,
}

impl Transcripts {
    pub fn push_console(&self, level: impl Into<String>, text: impl Into<String>) {
        if let Ok(mut log) = self.console.lock() {
            log.push(ConsoleEntry {
                level: level.into(),
                text: text.into(),
            });
        }
    }

    pub fn push_page_error(&self, text: impl Into<String>) {
        if let Ok(mut log) = self.page_errors.lock() {
            log.push(text.into());
        }
    }

    pub fn console_snapshot(&self) -> Vec<ConsoleEntry> {
        self.console.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn page_error_snapshot(&self) -> Vec<String> {
        self.page_errors.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

/// A live browser+page pair bounded to one harness run.
///
/// The browser handle itself is never exposed; callers observe the page
/// only through captured artifacts and bridge reads.
pub struct Session {
    driver: Box<dyn PageDriver>,
    transcripts: Transcripts,
    url: String,
    closed: AtomicBool,
}

impl Session {
    pub fn new(
        driver: Box<dyn PageDriver>,
        transcripts: Transcripts,
        url: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            transcripts,
            url: url.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn console_transcript(&self) -> Vec<ConsoleEntry> {
        self.transcripts.console_snapshot()
    }

    pub fn error_transcript(&self) -> Vec<String> {
        self.transcripts.page_error_snapshot()
    }

    /// Idempotent teardown. Internal close errors are logged, never
    /// propagated; a second close is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!(url = %self.url, "session already closed");
            return;
        }
        if let Err(e) = self.driver.close().await {
            warn!(url = %self.url, "session close reported an error (ignored): {e}");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Options for opening a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    pub navigation_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}
