//! Kiosk backend access.
//!
//! This module provides:
//! * [`KioskBackend`]: async trait with one method per backend endpoint.
//! * [`HttpBackend`]: the `reqwest` implementation talking JSON over HTTP.
//! * [`BackendError`]: error variants for every backend call.
//! * [`Classification`], [`SortOutcome`], [`WasteKind`]: decoded responses.
//!
//! # Endpoints
//!
//! ```text
//! GET  /status         → { arduino_connected, camera_available }
//! POST /measure-base   → { weight }
//! POST /capture        → { image }            (base64 JPEG)
//! POST /classify       → { category, type }
//! POST /process-waste  { type } → { weight, amount, id, qr_code }  (base64 PNG)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use recycle_kiosk::backend::{HttpBackend, KioskBackend};
//! use recycle_kiosk::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backend = HttpBackend::from_config(&config.backend);
//!
//!     match backend.status().await {
//!         Ok(status) => println!("hardware online: {}", status.hardware_online),
//!         Err(e) => eprintln!("backend unreachable: {e}"),
//!     }
//! }
//! ```

pub mod client;
pub mod types;

#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{BackendError, HttpBackend, KioskBackend};
pub use types::{Classification, SortOutcome, WasteKind};

#[cfg(test)]
pub use mock::MockBackend;
