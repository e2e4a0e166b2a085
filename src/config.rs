//! Configuration data structures and TOML parsing.
//!
//! Every key is optional; unset keys fall back to the built-in defaults
//! before validation. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [touch]
//! swipe_threshold = 30
//! long_press_timeout_ms = 800
//! poll_interval_ms = 10
//!
//! [autorepeat]
//! initial_delay_ms = 600
//! first_rate_ms = 100
//! first_count = 10
//! second_rate_ms = 20
//!
//! [pool]
//! plain_widgets = 32
//! autorepeat_widgets = 8
//! sliders = 8
//!
//! [display]
//! width = 320
//! height = 240
//!
//! [device]
//! usb_id = "1234:5678"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::autorepeat::AutorepeatTiming;
use crate::geometry::DisplaySize;
use crate::pool::{MAX_AUTOREPEAT_WIDGETS, MAX_PLAIN_WIDGETS, WidgetId, WidgetKind};
use crate::slider::{MAX_SLIDERS, SliderId};

/// Top-level error type used throughout the crate.
#[derive(Debug, Error, PartialEq)]
pub enum TactileError {
    #[error("Failed to read config file {path}: {message}")]
    ConfigReadError { path: PathBuf, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Invalid config value for '{key}': {message}")]
    InvalidConfig { key: &'static str, message: String },

    #[error("Widget pool exhausted: all {capacity} {kind} slots are allocated")]
    PoolExhausted { kind: WidgetKind, capacity: usize },

    #[error("Widget {0} is not allocated")]
    NotAllocated(WidgetId),

    #[error("No widget slot {0}")]
    UnknownWidget(WidgetId),

    #[error("Widget {id} is a {actual} widget, expected {expected}")]
    WrongKind {
        id: WidgetId,
        expected: WidgetKind,
        actual: WidgetKind,
    },

    #[error("Widget {0} has no callback bound")]
    NoCallback(WidgetId),

    #[error("No slider {0}")]
    UnknownSlider(SliderId),

    #[error("Slider list is full ({capacity} sliders)")]
    SliderListFull { capacity: usize },
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    touch: RawTouch,
    autorepeat: RawAutorepeat,
    pool: RawPool,
    display: RawDisplay,
    device: RawDevice,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
}

/// The `[device]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    usb_id: Option<String>,
}

/// Generate a raw section whose fields are all optional, plus the merge
/// that fills unset fields from the built-in defaults.
macro_rules! config_section {
    ($raw:ident => $validated:ident { $($field:ident : $ty:ty = $default:expr),+ $(,)? }) => {
        #[derive(Debug, Deserialize, Default, Clone)]
        #[serde(default)]
        struct $raw {
            $($field: Option<$ty>,)+
        }

        impl $raw {
            fn merge_with_defaults(&self) -> $validated {
                $validated {
                    $($field: self.$field.unwrap_or($default),)+
                }
            }
        }
    };
}

config_section!(RawTouch => TouchSettings {
    swipe_threshold: u16 = 30,
    long_press_timeout_ms: u32 = 800,
    poll_interval_ms: u32 = 10,
});

config_section!(RawAutorepeat => AutorepeatTiming {
    initial_delay_ms: u32 = 600,
    first_rate_ms: u32 = 100,
    first_count: u16 = 10,
    second_rate_ms: u32 = 20,
});

config_section!(RawPool => PoolSettings {
    plain_widgets: usize = 32,
    autorepeat_widgets: usize = 8,
    sliders: usize = 8,
});

config_section!(RawDisplay => DisplaySize {
    width: u16 = 320,
    height: u16 = 240,
});

/// Gesture timing and distance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSettings {
    /// Minimum displacement in pixels, on either axis, for a swipe.
    pub swipe_threshold: u16,
    /// Hold time before the long-press callback fires.
    pub long_press_timeout_ms: u32,
    /// Delay between two `poll_once` calls in the host loop.
    pub poll_interval_ms: u32,
}

impl Default for TouchSettings {
    fn default() -> Self {
        RawTouch::default().merge_with_defaults()
    }
}

/// Number of usable slots per pool, each bounded by the compiled maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub plain_widgets: usize,
    pub autorepeat_widgets: usize,
    pub sliders: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        RawPool::default().merge_with_defaults()
    }
}

/// Top-level parsed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub touch: TouchSettings,
    pub autorepeat: AutorepeatTiming,
    pub pool: PoolSettings,
    pub display: DisplaySize,
    pub device_usb_id: Option<String>,
}

impl Default for AutorepeatTiming {
    fn default() -> Self {
        RawAutorepeat::default().merge_with_defaults()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            touch: TouchSettings::default(),
            autorepeat: AutorepeatTiming::default(),
            pool: PoolSettings::default(),
            display: RawDisplay::default().merge_with_defaults(),
            device_usb_id: None,
        }
    }
}

fn invalid(key: &'static str, message: impl Into<String>) -> TactileError {
    TactileError::InvalidConfig {
        key,
        message: message.into(),
    }
}

fn check_capacity(key: &'static str, value: usize, max: usize) -> Result<(), TactileError> {
    if value > max {
        return Err(invalid(key, format!("{value} exceeds compiled maximum {max}")));
    }
    Ok(())
}

fn resolve(raw: RawConfig) -> Result<AppConfig, TactileError> {
    let touch = raw.touch.merge_with_defaults();
    if touch.swipe_threshold == 0 {
        return Err(invalid("touch.swipe_threshold", "must be at least 1"));
    }
    if touch.long_press_timeout_ms == 0 {
        return Err(invalid("touch.long_press_timeout_ms", "must be at least 1"));
    }

    let mut autorepeat = raw.autorepeat.merge_with_defaults();
    for (key, value) in [
        ("autorepeat.initial_delay_ms", autorepeat.initial_delay_ms),
        ("autorepeat.first_rate_ms", autorepeat.first_rate_ms),
        ("autorepeat.second_rate_ms", autorepeat.second_rate_ms),
    ] {
        if value == 0 {
            return Err(invalid(key, "must be at least 1"));
        }
    }
    if autorepeat.first_count == 0 {
        warn!("autorepeat.first_count = 0, using 1");
        autorepeat.first_count = 1;
    }

    let pool = raw.pool.merge_with_defaults();
    check_capacity("pool.plain_widgets", pool.plain_widgets, MAX_PLAIN_WIDGETS)?;
    check_capacity(
        "pool.autorepeat_widgets",
        pool.autorepeat_widgets,
        MAX_AUTOREPEAT_WIDGETS,
    )?;
    check_capacity("pool.sliders", pool.sliders, MAX_SLIDERS)?;

    let display = raw.display.merge_with_defaults();
    if display.width == 0 || display.height == 0 {
        return Err(invalid("display", "width and height must be non-zero"));
    }

    let device_usb_id = raw.device.usb_id.filter(|s| !s.is_empty());
    if device_usb_id.is_none() {
        debug!("No [device] usb_id configured");
    }

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        touch,
        autorepeat,
        pool,
        display,
        device_usb_id,
    })
}

/// Parse TOML text and return the fully resolved `AppConfig`.
pub fn parse_config_str(text: &str, path: &Path) -> Result<AppConfig, TactileError> {
    let raw: RawConfig = toml::from_str(text).map_err(|e| TactileError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    resolve(raw)
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, TactileError> {
    let text = fs::read_to_string(path).map_err(|e| TactileError::ConfigReadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_config_str(&text, path)
}
