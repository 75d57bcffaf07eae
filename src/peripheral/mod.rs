//! Peripheral liveness: the scale/sorter controller and the camera.
//!
//! [`StatusPoller`] refreshes a [`SharedStatus`] on a fixed interval.  The
//! poller is the only writer; the start guard (controller and operator panel)
//! only reads it.
//!
//! ```text
//! StatusPoller::spawn()  ── every interval ──▶ GET /status
//!        │                                      │
//!        │                        Ok ───────────┤──── Err
//!        ▼                                      ▼       ▼
//!   PollerHandle (abort on drop)        SharedStatus ← fallback policy
//! ```

pub mod poller;

use std::sync::{Arc, Mutex};

pub use poller::{PollerHandle, StatusPoller};

// ---------------------------------------------------------------------------
// PeripheralStatus
// ---------------------------------------------------------------------------

/// Reachability of the kiosk peripherals as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeripheralStatus {
    /// Scale and sorter controller connected.
    pub hardware_online: bool,
    /// Camera can be opened.
    pub camera_online: bool,
}

impl PeripheralStatus {
    pub const OFFLINE: Self = Self {
        hardware_online: false,
        camera_online: false,
    };

    pub const ONLINE: Self = Self {
        hardware_online: true,
        camera_online: true,
    };
}

// ---------------------------------------------------------------------------
// SharedStatus
// ---------------------------------------------------------------------------

/// Thread-safe handle to the latest [`PeripheralStatus`].
///
/// Written by the poller only.  Do not hold the lock across `.await` points.
pub type SharedStatus = Arc<Mutex<PeripheralStatus>>;

/// A fresh status handle.  Everything counts as offline until the first poll
/// answers.
pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(PeripheralStatus::OFFLINE))
}
