//! Scripted [`KioskBackend`] used by the poller and controller tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::client::{BackendError, KioskBackend};
use super::types::{Classification, SortOutcome};
use crate::peripheral::PeripheralStatus;

/// Responses returned by [`MockBackend`], one per endpoint.
#[derive(Debug, Clone)]
pub struct Script {
    pub status: Result<PeripheralStatus, BackendError>,
    pub base_weight: Result<f64, BackendError>,
    pub image: Result<Vec<u8>, BackendError>,
    pub classification: Result<Classification, BackendError>,
    pub outcome: Result<SortOutcome, BackendError>,
    /// Simulated latency for `status`; a very long delay models a backend
    /// that accepts the connection and never answers.
    pub status_delay: Option<Duration>,
    /// Simulated sorter/scale latency for `process_waste`.
    pub sort_delay: Option<Duration>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            status: Ok(PeripheralStatus::ONLINE),
            base_weight: Ok(42.0),
            image: Ok(vec![0xff, 0xd8, 0xff]),
            classification: Ok(Classification::new("plastic", "DRY")),
            outcome: Ok(SortOutcome {
                weight: 18.5,
                amount: 0.37,
                id: "QR_1A2B3C4D".into(),
                qr_code: vec![0x89, b'P', b'N', b'G'],
            }),
            status_delay: None,
            sort_delay: None,
        }
    }
}

/// A backend that answers from a mutable [`Script`] and records every call.
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Every endpoint succeeds.
    pub fn happy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start from the happy script and adjust it.
    pub fn with(edit: impl FnOnce(&mut Script)) -> Arc<Self> {
        let backend = Self::default();
        backend.script(edit);
        Arc::new(backend)
    }

    /// Change the script between calls.
    pub fn script(&self, edit: impl FnOnce(&mut Script)) {
        edit(&mut self.script.lock().unwrap());
    }

    /// Endpoint names in call order (`process-waste` includes its type).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == endpoint || c.starts_with(&format!("{endpoint}:")))
            .count()
    }

    /// The error a FastAPI backend produces for an unhandled failure.
    pub fn http_500(detail: &str) -> BackendError {
        BackendError::Status {
            status: 500,
            detail: detail.into(),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn current(&self) -> Script {
        self.script.lock().unwrap().clone()
    }
}

#[async_trait]
impl KioskBackend for MockBackend {
    async fn status(&self) -> Result<PeripheralStatus, BackendError> {
        self.record("status");
        let script = self.current();
        if let Some(delay) = script.status_delay {
            tokio::time::sleep(delay).await;
        }
        script.status
    }

    async fn measure_base(&self) -> Result<f64, BackendError> {
        self.record("measure-base");
        self.current().base_weight
    }

    async fn capture(&self) -> Result<Vec<u8>, BackendError> {
        self.record("capture");
        self.current().image
    }

    async fn classify(&self) -> Result<Classification, BackendError> {
        self.record("classify");
        self.current().classification
    }

    async fn process_waste(&self, waste_type: &str) -> Result<SortOutcome, BackendError> {
        self.record(format!("process-waste:{waste_type}"));
        let script = self.current();
        if let Some(delay) = script.sort_delay {
            tokio::time::sleep(delay).await;
        }
        script.outcome
    }
}
