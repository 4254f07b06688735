//! Live Chromium sessions over the DevTools protocol
//!
//! [`ChromiumFactory`] launches a dedicated browser process per
//! session, wires console and exception transcripts, navigates, and
//! hands back a [`Session`]. A navigation failure after a successful
//! launch tears the browser down before the error is returned, so a
//! failed open never leaks a process.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{js_string, PageDriver, SessionFactory};
use crate::error::{HarnessError, HarnessResult};
use crate::session::{Session, SessionOptions, Transcripts};

/// Opens one Chromium process per session.
#[derive(Debug, Default)]
pub struct ChromiumFactory;

impl ChromiumFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SessionFactory for ChromiumFactory {
    async fn open(&self, url: &str, options: &SessionOptions) -> HarnessResult<Session> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(options.viewport_width, options.viewport_height);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(HarnessError::Launch)?;

        info!(headless = options.headless, "launching browser");
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarnessError::Launch(e.to_string()))?;

        // CDP message pump; everything page-side stalls without it.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler loop ended");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                teardown(&mut browser, handler_task, Vec::new()).await;
                return Err(HarnessError::Launch(format!(
                    "failed to open page: {e}"
                )));
            }
        };

        let transcripts = Transcripts::default();
        let listener_tasks = match attach_listeners(&page, &transcripts).await {
            Ok(tasks) => tasks,
            Err(e) => {
                teardown(&mut browser, handler_task, Vec::new()).await;
                return Err(e);
            }
        };

        debug!(%url, "navigating");
        let navigated = tokio::time::timeout(options.navigation_timeout, page.goto(url)).await;
        match navigated {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                teardown(&mut browser, handler_task, listener_tasks).await;
                return Err(HarnessError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                teardown(&mut browser, handler_task, listener_tasks).await;
                return Err(HarnessError::Navigation {
                    url: url.to_string(),
                    reason: format!(
                        "no load within {} ms",
                        options.navigation_timeout.as_millis()
                    ),
                });
            }
        }

        let driver = ChromiumDriver {
            page,
            parts: tokio::sync::Mutex::new(Some(BrowserParts {
                browser,
                handler_task,
                listener_tasks,
            })),
        };
        Ok(Session::new(Box::new(driver), transcripts, url))
    }
}

struct BrowserParts {
    browser: Browser,
    handler_task: JoinHandle<()>,
    listener_tasks: Vec<JoinHandle<()>>,
}

/// [`PageDriver`] over a live chromiumoxide page.
pub struct ChromiumDriver {
    page: Page,
    parts: tokio::sync::Mutex<Option<BrowserParts>>,
}

async fn attach_listeners(
    page: &Page,
    transcripts: &Transcripts,
) -> HarnessResult<Vec<JoinHandle<()>>> {
    let mut console_events = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(|e| HarnessError::Page(format!("console listener: {e}")))?;
    let console_sink = transcripts.clone();
    let console_task = tokio::spawn(async move {
        while let Some(event) = console_events.next().await {
            let level = format!("{:?}", event.r#type).to_ascii_lowercase();
            let text = event
                .args
                .iter()
                .map(|arg| match (&arg.value, &arg.description) {
                    (Some(value), _) => value.to_string(),
                    (None, Some(description)) => description.clone(),
                    (None, None) => "<object>".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            console_sink.push_console(level, text);
        }
    });

    let mut exception_events = page
        .event_listener::<EventExceptionThrown>()
        .await
        .map_err(|e| HarnessError::Page(format!("exception listener: {e}")))?;
    let error_sink = transcripts.clone();
    let exception_task = tokio::spawn(async move {
        while let Some(event) = exception_events.next().await {
            let details = &event.exception_details;
            let text = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_else(|| details.text.clone());
            error_sink.push_page_error(text);
        }
    });

    Ok(vec![console_task, exception_task])
}

async fn teardown(
    browser: &mut Browser,
    handler_task: JoinHandle<()>,
    listener_tasks: Vec<JoinHandle<()>>,
) {
    for task in listener_tasks {
        task.abort();
    }
    if let Err(e) = browser.close().await {
        warn!("browser close reported an error (ignored): {e}");
    }
    handler_task.abort();
}

#[async_trait::async_trait]
impl PageDriver for ChromiumDriver {
    async fn evaluate(&self, expression: &str) -> HarnessResult<Value> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| HarnessError::Page(format!("evaluate failed: {e}")))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn selector_exists(&self, selector: &str) -> HarnessResult<bool> {
        let expr = format!("document.querySelector({}) !== null", js_string(selector));
        Ok(self.evaluate(&expr).await?.as_bool().unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> HarnessResult<Option<String>> {
        let expr = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  return el === null ? null : el.innerText;
}})()"#,
            sel = js_string(selector),
        );
        let value = self.evaluate(&expr).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn computed_style(
        &self,
        selector: &str,
        property: &str,
    ) -> HarnessResult<Option<String>> {
        let expr = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  return el === null ? null : getComputedStyle(el).getPropertyValue({prop});
}})()"#,
            sel = js_string(selector),
            prop = js_string(property),
        );
        let value = self.evaluate(&expr).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn click(&self, selector: &str) -> HarnessResult<bool> {
        let expr = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  if (el === null) return false;
  el.click();
  return true;
}})()"#,
            sel = js_string(selector),
        );
        Ok(self.evaluate(&expr).await?.as_bool().unwrap_or(false))
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| HarnessError::Page(format!("screenshot failed: {e}")))
    }

    async fn close(&self) -> HarnessResult<()> {
        let parts = self.parts.lock().await.take();
        if let Some(mut parts) = parts {
            for task in parts.listener_tasks.drain(..) {
                task.abort();
            }
            let closed = parts.browser.close().await;
            parts.handler_task.abort();
            closed.map_err(|e| HarnessError::Page(format!("browser close failed: {e}")))?;
        }
        Ok(())
    }
}
