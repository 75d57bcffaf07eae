//! Periodic `GET /status` polling.
//!
//! [`StatusPoller::spawn`] moves the poller onto a tokio task that polls once
//! immediately and then on every interval tick.  The returned
//! [`PollerHandle`] aborts the task when stopped or dropped.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{PeripheralStatus, SharedStatus};
use crate::backend::KioskBackend;
use crate::config::{PollerConfig, StatusFallback};

// ---------------------------------------------------------------------------
// StatusPoller
// ---------------------------------------------------------------------------

/// Keeps a [`SharedStatus`] up to date from the backend.
pub struct StatusPoller {
    backend: Arc<dyn KioskBackend>,
    status: SharedStatus,
    interval: Duration,
    fallback: StatusFallback,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn KioskBackend>, status: SharedStatus, config: &PollerConfig) -> Self {
        Self {
            backend,
            status,
            interval: config.interval(),
            fallback: config.fallback,
        }
    }

    /// Poll once and publish the result.
    ///
    /// Any failure publishes the configured fallback instead of leaving the
    /// previous answer in place.  A poll that has not answered within one
    /// interval counts as a failure, so the status is never older than that.
    /// Returns the status that was written.
    pub async fn refresh_status(&self) -> PeripheralStatus {
        let polled = tokio::time::timeout(self.interval, self.backend.status()).await;

        let status = match polled {
            Ok(Ok(status)) => {
                log::debug!(
                    "poller: hardware_online={} camera_online={}",
                    status.hardware_online,
                    status.camera_online
                );
                status
            }
            Ok(Err(e)) => {
                log::warn!("poller: status check failed ({e}); assuming {:?}", self.fallback);
                self.fallback.status()
            }
            Err(_) => {
                log::warn!(
                    "poller: status check unanswered after {:?}; assuming {:?}",
                    self.interval,
                    self.fallback
                );
                self.fallback.status()
            }
        };

        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    /// Run the polling loop on the current tokio runtime.
    ///
    /// Must be called from within a runtime context.
    pub fn spawn(self) -> PollerHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                self.refresh_status().await;
            }
        });

        PollerHandle { task }
    }
}

// ---------------------------------------------------------------------------
// PollerHandle
// ---------------------------------------------------------------------------

/// Owner of the polling task.  Dropping it cancels polling.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Cancel polling.  Equivalent to dropping the handle.
    pub fn stop(self) {}
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::peripheral::new_shared_status;
    use crate::pipeline::{new_shared_state, ProcessState};

    fn config(fallback: StatusFallback) -> PollerConfig {
        PollerConfig {
            interval_secs: 5,
            fallback,
        }
    }

    #[tokio::test]
    async fn successful_poll_replaces_status() {
        let backend = MockBackend::with(|s| {
            s.status = Ok(PeripheralStatus {
                hardware_online: true,
                camera_online: false,
            })
        });
        let status = new_shared_status();
        let poller = StatusPoller::new(backend, Arc::clone(&status), &config(StatusFallback::Offline));

        let written = poller.refresh_status().await;

        assert!(written.hardware_online);
        assert!(!written.camera_online);
        assert_eq!(*status.lock().unwrap(), written);
    }

    #[tokio::test]
    async fn two_failed_polls_report_offline_fallback_both_times() {
        let backend = MockBackend::with(|s| s.status = Err(MockBackend::http_500("boom")));
        let status = new_shared_status();
        *status.lock().unwrap() = PeripheralStatus::ONLINE;
        let poller = StatusPoller::new(backend, Arc::clone(&status), &config(StatusFallback::Offline));

        assert_eq!(poller.refresh_status().await, PeripheralStatus::OFFLINE);
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::OFFLINE);

        assert_eq!(poller.refresh_status().await, PeripheralStatus::OFFLINE);
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::OFFLINE);
    }

    #[tokio::test]
    async fn online_fallback_policy_reports_online() {
        let backend = MockBackend::with(|s| {
            s.status = Err(crate::backend::BackendError::Connection("refused".into()))
        });
        let status = new_shared_status();
        let poller = StatusPoller::new(backend, Arc::clone(&status), &config(StatusFallback::Online));

        assert_eq!(poller.refresh_status().await, PeripheralStatus::ONLINE);
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::ONLINE);
    }

    #[tokio::test]
    async fn failed_polls_leave_pipeline_state_alone() {
        let backend = MockBackend::with(|s| s.status = Err(MockBackend::http_500("boom")));
        let status = new_shared_status();
        let state = new_shared_state(10);
        let poller = StatusPoller::new(backend, Arc::clone(&status), &config(StatusFallback::Offline));

        poller.refresh_status().await;
        poller.refresh_status().await;

        let st = state.lock().unwrap();
        assert_eq!(st.process, ProcessState::Idle);
        assert!(st.error.is_none());
        assert!(st.item.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_poller_polls_immediately_then_every_interval() {
        let backend = MockBackend::happy();
        let status = new_shared_status();
        let poller = StatusPoller::new(
            Arc::clone(&backend) as Arc<dyn KioskBackend>,
            Arc::clone(&status),
            &config(StatusFallback::Offline),
        );

        let handle = poller.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.count("status"), 1);
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::ONLINE);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.count("status"), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.count("status"), 4);
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_poll_falls_back_after_one_interval() {
        let backend = MockBackend::with(|s| s.status_delay = Some(Duration::from_secs(3600)));
        let status = new_shared_status();
        *status.lock().unwrap() = PeripheralStatus::ONLINE;
        let poller = StatusPoller::new(backend, Arc::clone(&status), &config(StatusFallback::Offline));

        let started = tokio::time::Instant::now();
        let written = poller.refresh_status().await;

        assert_eq!(written, PeripheralStatus::OFFLINE);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::OFFLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_does_not_leave_stale_status() {
        let backend = MockBackend::with(|s| s.status_delay = Some(Duration::from_secs(3600)));
        let status = new_shared_status();
        *status.lock().unwrap() = PeripheralStatus::ONLINE;
        let poller = StatusPoller::new(
            Arc::clone(&backend) as Arc<dyn KioskBackend>,
            Arc::clone(&status),
            &config(StatusFallback::Offline),
        );

        let _handle = poller.spawn();

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::OFFLINE);

        // The backend comes back; the next poll picks it up.
        backend.script(|s| s.status_delay = None);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*status.lock().unwrap(), PeripheralStatus::ONLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_the_handle_cancels_polling() {
        let backend = MockBackend::happy();
        let poller = StatusPoller::new(
            Arc::clone(&backend) as Arc<dyn KioskBackend>,
            new_shared_status(),
            &config(StatusFallback::Offline),
        );

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.count("status"), 1);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(backend.count("status"), 1);
    }
}
