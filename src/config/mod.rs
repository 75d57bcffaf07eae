//! Configuration module for the recycle kiosk client.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load_or_create` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, BackendConfig, PipelineConfig, PollerConfig, StatusFallback, UiConfig,
};
