//! Vocabulary of the visualization app's debug surface
//!
//! Hook names, the numeric weather code space, and the DOM markers the
//! app exposes. These are conveniences and defaults, not hard-wired
//! behavior: scenarios always pass raw codes, selectors, and paths, so
//! a different code table stays a per-scenario concern.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::scenario::{HookCall, StepAction};

/// Debug hook forcing the simulated time of day (hour, UTC).
pub const SET_DEBUG_TIME: &str = "setDebugTime";
/// Debug hook forcing a simulated weather condition by numeric code.
pub const SET_DEBUG_WEATHER: &str = "setDebugWeather";
/// Read-only debug state root exposed on `window`.
pub const DEBUG_ROOT: &str = "aetherDebug";
/// Registry of active weather effect systems under the debug root.
pub const WEATHER_EFFECTS_PATH: &str = "aetherDebug.weatherEffects";
/// Canvas-hosting container element.
pub const CANVAS_SELECTOR: &str = "#canvas-container canvas";
/// Time/date display element.
pub const DATE_DISPLAY_SELECTOR: &str = "#date-display";
/// Location display element.
pub const LOCATION_DISPLAY_SELECTOR: &str = "#location-display";
/// Sentinel shown in the date/location displays until real data loads.
pub const DATE_PLACEHOLDER: &str = "--";
/// Toggle starting the time-acceleration mode; relabels and restyles
/// itself (and the time display) while active.
pub const TIME_WARP_BUTTON_SELECTOR: &str = "#time-warp-btn";
/// Clock readout restyled while time warp is active.
pub const TIME_DISPLAY_SELECTOR: &str = "#time-display";

pub fn set_debug_time(hour_utc: u32) -> HookCall {
    HookCall {
        hook: SET_DEBUG_TIME.to_string(),
        args: vec![json!(hour_utc)],
    }
}

pub fn set_debug_weather(code: u16) -> HookCall {
    HookCall {
        hook: SET_DEBUG_WEATHER.to_string(),
        args: vec![json!(code)],
    }
}

pub fn toggle_time_warp() -> StepAction {
    StepAction::Click {
        click: TIME_WARP_BUTTON_SELECTOR.to_string(),
    }
}

/// Weather condition classes keyed by the app's numeric code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Overcast,
    RainLight,
    RainModerate,
    RainHeavy,
    Thunderstorm,
}

impl WeatherCondition {
    /// Classify a numeric weather code. Unknown codes return `None`
    /// rather than guessing.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Clear),
            2 => Some(Self::PartlyCloudy),
            3 => Some(Self::Overcast),
            61 => Some(Self::RainLight),
            63 => Some(Self::RainModerate),
            65 => Some(Self::RainHeavy),
            95 => Some(Self::Thunderstorm),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Clear => 0,
            Self::PartlyCloudy => 2,
            Self::Overcast => 3,
            Self::RainLight => 61,
            Self::RainModerate => 63,
            Self::RainHeavy => 65,
            Self::Thunderstorm => 95,
        }
    }

    /// Whether precipitation effect systems should be active.
    pub fn is_precipitation(&self) -> bool {
        matches!(
            self,
            Self::RainLight | Self::RainModerate | Self::RainHeavy | Self::Thunderstorm
        )
    }
}
