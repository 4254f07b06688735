//! Scripted in-memory driver for exercising the engine without a
//! browser. Evaluate calls are answered by substring-matched rules,
//! DOM queries by fixed tables.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use veriviz_harness::driver::{PageDriver, SessionFactory};
use veriviz_harness::error::{HarnessError, HarnessResult};
use veriviz_harness::session::{Session, SessionOptions, Transcripts};

pub struct FakeDriver {
    rules: Vec<(String, Value)>,
    texts: HashMap<String, String>,
    styles: HashMap<(String, String), String>,
    clickables: HashSet<String>,
    clicks: Arc<Mutex<Vec<String>>>,
    screenshot: Option<Vec<u8>>,
    closes: Arc<AtomicUsize>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            texts: HashMap::new(),
            styles: HashMap::new(),
            clickables: HashSet::new(),
            clicks: Arc::new(Mutex::new(Vec::new())),
            screenshot: None,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer any evaluate whose expression contains `needle` with
    /// `value`. First matching rule wins.
    pub fn with_rule(mut self, needle: &str, value: Value) -> Self {
        self.rules.push((needle.to_string(), value));
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_style(mut self, selector: &str, property: &str, value: &str) -> Self {
        self.styles
            .insert((selector.to_string(), property.to_string()), value.to_string());
        self
    }

    pub fn with_clickable(mut self, selector: &str) -> Self {
        self.clickables.insert(selector.to_string());
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = Some(bytes);
        self
    }

    pub fn closes_handle(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

    pub fn clicks_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.clicks.clone()
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn evaluate(&self, expression: &str) -> HarnessResult<Value> {
        for (needle, value) in &self.rules {
            if expression.contains(needle.as_str()) {
                return Ok(value.clone());
            }
        }
        Ok(Value::Null)
    }

    async fn selector_exists(&self, selector: &str) -> HarnessResult<bool> {
        Ok(self.texts.contains_key(selector))
    }

    async fn inner_text(&self, selector: &str) -> HarnessResult<Option<String>> {
        Ok(self.texts.get(selector).cloned())
    }

    async fn computed_style(
        &self,
        selector: &str,
        property: &str,
    ) -> HarnessResult<Option<String>> {
        Ok(self
            .styles
            .get(&(selector.to_string(), property.to_string()))
            .cloned())
    }

    async fn click(&self, selector: &str) -> HarnessResult<bool> {
        if !self.clickables.contains(selector) {
            return Ok(false);
        }
        if let Ok(mut clicks) = self.clicks.lock() {
            clicks.push(selector.to_string());
        }
        Ok(true)
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        self.screenshot
            .clone()
            .ok_or_else(|| HarnessError::Page("screenshot unavailable".to_string()))
    }

    async fn close(&self) -> HarnessResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a single scripted driver; a second open fails.
pub struct FakeFactory {
    driver: Mutex<Option<FakeDriver>>,
    opens: Arc<AtomicUsize>,
    open_delay: Option<Duration>,
}

impl FakeFactory {
    pub fn new(driver: FakeDriver) -> Self {
        Self {
            driver: Mutex::new(Some(driver)),
            opens: Arc::new(AtomicUsize::new(0)),
            open_delay: None,
        }
    }

    /// A factory that fails every open, as a crashed launch would.
    pub fn failing() -> Self {
        Self {
            driver: Mutex::new(None),
            opens: Arc::new(AtomicUsize::new(0)),
            open_delay: None,
        }
    }

    /// Simulate a slow launch/navigation.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn opens_handle(&self) -> Arc<AtomicUsize> {
        self.opens.clone()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self, url: &str, _options: &SessionOptions) -> HarnessResult<Session> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        let driver = self
            .driver
            .lock()
            .map_err(|_| HarnessError::Launch("driver lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| HarnessError::Launch("browser process exited".to_string()))?;
        Ok(Session::new(Box::new(driver), Transcripts::default(), url))
    }
}

/// A small but genuine PNG for screenshot captures.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageOutputFormat::Png)
        .expect("png encode");
    buf.into_inner()
}
