//! Artifact capture and persistence
//!
//! Screenshots are validated as decodable PNGs (a page that is not in a
//! renderable state fails the capture), persisted under the store
//! directory, and fingerprinted with SHA-256. Computed values are
//! recorded exactly as observed, with no implicit coercion; assertions
//! interpret the type.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::bridge::DebugBridge;
use crate::driver::PageDriver;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::CaptureRequest;

/// A captured, typed observation, tagged with the step that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// The request's destination identifier.
    pub id: String,
    pub step_index: usize,
    /// Milliseconds since the Unix epoch at capture time.
    pub captured_at_ms: u64,
    pub value: ArtifactValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactValue {
    /// PNG screenshot persisted to disk.
    Image {
        path: PathBuf,
        sha256: String,
        width: u32,
        height: u32,
    },

    /// Raw text observation (inner text, computed style).
    Text { text: String },

    /// Structured value from a bridge read.
    Value { value: Value },
}

impl ArtifactValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
            Self::Value { .. } => "value",
        }
    }
}

/// Executes capture requests and persists image artifacts.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> HarnessResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Execute one capture request against the session's page.
    pub async fn capture(
        &self,
        driver: &dyn PageDriver,
        step_index: usize,
        request: &CaptureRequest,
    ) -> HarnessResult<Artifact> {
        let destination = request.destination().to_string();

        let value = match request {
            CaptureRequest::Screenshot { .. } => {
                let bytes = driver.screenshot().await.map_err(|e| HarnessError::Capture {
                    destination: destination.clone(),
                    reason: e.to_string(),
                })?;
                let img =
                    image::load_from_memory(&bytes).map_err(|e| HarnessError::Capture {
                        destination: destination.clone(),
                        reason: format!("page did not produce a decodable screenshot: {e}"),
                    })?;
                let (width, height) = img.dimensions();

                let path = self.dir.join(format!("{destination}.png"));
                std::fs::write(&path, &bytes)?;

                let mut hasher = Sha256::new();
                hasher.update(&bytes);
                ArtifactValue::Image {
                    path,
                    sha256: hex::encode(hasher.finalize()),
                    width,
                    height,
                }
            }

            CaptureRequest::ComputedStyle {
                selector, property, ..
            } => {
                let style = driver
                    .computed_style(selector, property)
                    .await
                    .map_err(|e| HarnessError::Capture {
                        destination: destination.clone(),
                        reason: e.to_string(),
                    })?;
                match style {
                    Some(text) => ArtifactValue::Text { text },
                    None => {
                        return Err(HarnessError::Capture {
                            destination,
                            reason: format!("no element matching '{selector}'"),
                        })
                    }
                }
            }

            CaptureRequest::InnerText { selector, .. } => {
                let text =
                    driver
                        .inner_text(selector)
                        .await
                        .map_err(|e| HarnessError::Capture {
                            destination: destination.clone(),
                            reason: e.to_string(),
                        })?;
                match text {
                    Some(text) => ArtifactValue::Text { text },
                    None => {
                        return Err(HarnessError::Capture {
                            destination,
                            reason: format!("no element matching '{selector}'"),
                        })
                    }
                }
            }

            CaptureRequest::BridgeRead { path, .. } => {
                let value = DebugBridge::new(driver).read(path).await.map_err(|e| {
                    HarnessError::Capture {
                        destination: destination.clone(),
                        reason: e.to_string(),
                    }
                })?;
                ArtifactValue::Value { value }
            }
        };

        debug!(artifact = %destination, step = step_index, kind = value.kind(), "captured");
        Ok(Artifact {
            id: destination,
            step_index,
            captured_at_ms: now_ms(),
            value,
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
