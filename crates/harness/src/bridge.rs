//! Typed access to the application's debug surface
//!
//! Every interaction with the page's debug hooks goes through the
//! bridge; no ad hoc expression strings elsewhere in the harness. The
//! bridge wraps the raw evaluate primitive in generated expressions
//! whose results are tagged with the marker keys below, so a missing
//! hook, a throwing hook, and an absent state path each surface as a
//! distinct checked error. No retries at this layer; retry policy
//! belongs to [`crate::readiness`].

use serde_json::Value;
use tracing::debug;

use crate::driver::{js_string, PageDriver};
use crate::error::{HarnessError, HarnessResult};

/// Marker key set on the result object when the named hook is not a
/// function on `window`.
pub const MARKER_HOOK_MISSING: &str = "__veriviz_hook_missing";
/// Marker key carrying the message of a hook that exists but threw.
pub const MARKER_HOOK_THREW: &str = "__veriviz_hook_threw";
/// Marker key carrying the first absent segment of a state path.
pub const MARKER_ABSENT: &str = "__veriviz_absent";
/// Marker key carrying a successful invoke/read value.
pub const MARKER_VALUE: &str = "__veriviz_value";

pub struct DebugBridge<'a> {
    driver: &'a dyn PageDriver,
}

impl<'a> DebugBridge<'a> {
    pub fn new(driver: &'a dyn PageDriver) -> Self {
        Self { driver }
    }

    /// Invoke a named debug hook with JSON arguments.
    ///
    /// A hook the application has not exposed fails with
    /// [`HarnessError::HookNotFound`]; a hook that exists but throws
    /// fails with [`HarnessError::HookExecution`] carrying the
    /// underlying message.
    pub async fn invoke(&self, hook: &str, args: &[Value]) -> HarnessResult<Value> {
        let args_json = serde_json::to_string(args)?;
        let expr = format!(
            r#"(() => {{
  const fn = window[{hook_js}];
  if (typeof fn !== "function") return {{ {missing}: true }};
  try {{
    const out = fn(...{args});
    return {{ {ok}: out === undefined ? null : out }};
  }} catch (err) {{
    return {{ {threw}: String(err && err.message ? err.message : err) }};
  }}
}})()"#,
            hook_js = js_string(hook),
            args = args_json,
            missing = MARKER_HOOK_MISSING,
            ok = MARKER_VALUE,
            threw = MARKER_HOOK_THREW,
        );

        debug!(hook, "invoking debug hook");
        let result = self.driver.evaluate(&expr).await?;
        if result.get(MARKER_HOOK_MISSING).is_some() {
            return Err(HarnessError::HookNotFound(hook.to_string()));
        }
        if let Some(msg) = result.get(MARKER_HOOK_THREW) {
            return Err(HarnessError::HookExecution {
                hook: hook.to_string(),
                message: msg.as_str().unwrap_or_default().to_string(),
            });
        }
        Ok(result.get(MARKER_VALUE).cloned().unwrap_or(Value::Null))
    }

    /// Structured read of nested debug state by dot-separated path,
    /// e.g. `"aetherDebug.weatherEffects.currDust"`.
    ///
    /// An absent segment anywhere along the path is a checked
    /// [`HarnessError::Read`], not a crash; the bridge exists to probe
    /// possibly-not-yet-initialized application state.
    pub async fn read(&self, path: &str) -> HarnessResult<Value> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(HarnessError::Read {
                path: path.to_string(),
                segment: String::new(),
            });
        }
        let segments_json = serde_json::to_string(&segments)?;
        let expr = format!(
            r#"(() => {{
  let cur = window;
  for (const seg of {segments}) {{
    if (cur === null || cur === undefined || !(seg in Object(cur))) return {{ {absent}: seg }};
    cur = cur[seg];
  }}
  if (cur === undefined || cur === null) return {{ {ok}: null }};
  try {{
    return {{ {ok}: JSON.parse(JSON.stringify(cur)) }};
  }} catch (err) {{
    return {{ {ok}: true }};
  }}
}})()"#,
            segments = segments_json,
            absent = MARKER_ABSENT,
            ok = MARKER_VALUE,
        );

        let result = self.driver.evaluate(&expr).await?;
        if let Some(seg) = result.get(MARKER_ABSENT) {
            return Err(HarnessError::Read {
                path: path.to_string(),
                segment: seg.as_str().unwrap_or_default().to_string(),
            });
        }
        // Cyclic or host objects serialize to `true`: for those, the
        // read answers existence, which is what probes ask for.
        Ok(result.get(MARKER_VALUE).cloned().unwrap_or(Value::Null))
    }

    /// Evaluate an arbitrary expression as a boolean readiness predicate.
    pub async fn predicate(&self, expression: &str) -> HarnessResult<bool> {
        let expr = format!("!!({expression})");
        let value = self.driver.evaluate(&expr).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
