//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::peripheral::PeripheralStatus;

// ---------------------------------------------------------------------------
// StatusFallback
// ---------------------------------------------------------------------------

/// What the poller reports when `GET /status` cannot be answered.
///
/// | Variant   | Reported status          | Use                       |
/// |-----------|--------------------------|---------------------------|
/// | `Offline` | hardware + camera down   | production kiosks         |
/// | `Online`  | hardware + camera up     | demos without a backend   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFallback {
    #[default]
    Offline,
    Online,
}

impl StatusFallback {
    /// The peripheral status written when a poll fails.
    pub fn status(self) -> PeripheralStatus {
        match self {
            StatusFallback::Offline => PeripheralStatus::OFFLINE,
            StatusFallback::Online => PeripheralStatus::ONLINE,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Connection settings for the kiosk backend service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing path
    /// (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Per-request timeout in seconds.  The sorting stage waits on the scale
    /// for up to 25 s server-side, so keep this comfortably above that.
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// PollerConfig
// ---------------------------------------------------------------------------

/// Peripheral liveness polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between two `GET /status` calls.
    pub interval_secs: u64,
    /// Status reported when a poll fails.
    pub fallback: StatusFallback,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            fallback: StatusFallback::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Settings for the recycling run itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Value the pre-capture countdown starts from.
    pub countdown_start: u32,
    /// Length of one countdown step in milliseconds.
    pub countdown_tick_millis: u64,
    /// Abort the run when the classifier cannot tell dry from wet waste,
    /// instead of driving the sorter with an `UNKNOWN` type.
    pub reject_unknown_type: bool,
}

impl PipelineConfig {
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_millis.max(1))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            countdown_start: 10,
            countdown_tick_millis: 1_000,
            reject_unknown_type: true,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Operator panel appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Cover the whole screen (typical for the kiosk display).
    pub fullscreen: bool,
    /// Window inner size `(width, height)` when not fullscreen.
    pub window_size: (f32, f32),
    /// Symbol printed in front of reward amounts.
    pub currency_symbol: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            window_size: (900.0, 640.0),
            currency_symbol: "₹".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use recycle_kiosk::config::AppConfig;
///
/// // Returns (and writes) the defaults when the file is missing
/// let config = AppConfig::load_or_create().unwrap();
/// println!("backend at {}", config.backend.base_url);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Peripheral status polling.
    pub poller: PollerConfig,
    /// Recycling run settings.
    pub pipeline: PipelineConfig,
    /// Operator panel settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// On first run the file does not exist yet; defaults are returned and
    /// written out so the operator has a file to edit.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&AppPaths::new().settings_file)
    }

    /// [`load_or_create`](Self::load_or_create) against an explicit path.
    ///
    /// Failing to write the defaults is logged and does not fail the load.
    pub fn load_or_create_at(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Self::default();
        match config.save_to(path) {
            Ok(()) => log::info!("config: wrote defaults to {}", path.display()),
            Err(e) => log::warn!("config: could not write defaults to {}: {e}", path.display()),
        }
        Ok(config)
    }

    /// Load from an explicit path.  Returns `Ok(AppConfig::default())` when
    /// the file does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories as
    /// needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
