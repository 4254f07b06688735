//! Browser capability seam
//!
//! The engine never touches a browser API directly; it only sees the
//! primitives below. [`crate::chromium`] provides the live CDP
//! implementation, tests script an in-memory one.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HarnessResult;
use crate::session::{Session, SessionOptions};

/// The opaque page primitives the harness relies on.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluate a JavaScript expression in page context, returning its
    /// JSON value (`null` when the expression yields `undefined`).
    async fn evaluate(&self, expression: &str) -> HarnessResult<Value>;

    /// Whether an element matching the CSS selector currently exists.
    async fn selector_exists(&self, selector: &str) -> HarnessResult<bool>;

    /// Inner text of the first element matching the selector,
    /// `None` when no such element exists.
    async fn inner_text(&self, selector: &str) -> HarnessResult<Option<String>>;

    /// Computed value of a CSS property on the first matching element,
    /// `None` when no such element exists.
    async fn computed_style(&self, selector: &str, property: &str)
        -> HarnessResult<Option<String>>;

    /// Click the first element matching the selector. `false` when no
    /// such element exists.
    async fn click(&self, selector: &str) -> HarnessResult<bool>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Release the underlying page/browser resources.
    async fn close(&self) -> HarnessResult<()>;
}

/// Opens live sessions against a target URL.
///
/// `open` must leave no browser behind on failure: a navigation error
/// after a successful launch tears the browser down before returning.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, url: &str, options: &SessionOptions) -> HarnessResult<Session>;
}

/// Encode a Rust string as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
