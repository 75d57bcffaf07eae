//! Process controller. Drives one item from calibration to reward.
//!
//! [`ProcessController`] owns the [`SharedState`] and responds to
//! [`ControllerCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Run flow
//!
//! ```text
//! Start (hardware online, not busy)
//!   └─▶ POST /measure-base                          [Calibrating]
//!         └─▶ countdown, one step per tick          [CountdownToCapture]
//!               └─▶ POST /capture, POST /classify   [Analyzing]
//!                     └─▶ POST /process-waste       [Sorting]
//!                           └─▶ store outcome       [Result]
//!
//! any stage error ─▶ ErrorSignal + empty record     [Idle]
//! Reset           ─▶ drop the run future            [Idle]
//! ```
//!
//! The run is a single future raced against the command channel.  Reset
//! drops that future, which cancels the countdown interval and any request
//! still in flight, so nothing from an abandoned run can land afterwards.

use std::fmt;
use std::sync::{Arc, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::backend::{BackendError, KioskBackend, WasteKind};
use crate::config::PipelineConfig;
use crate::peripheral::SharedStatus;

use super::countdown::{countdown_ticker, Countdown, CountdownTick};
use super::state::{ItemRecord, ProcessEvent, ProcessSnapshot, ProcessState, SharedState};

// ---------------------------------------------------------------------------
// ControllerCommand
// ---------------------------------------------------------------------------

/// Operator actions sent from the panel to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Begin a new run.  Ignored while a run is in progress or while the
    /// hardware is reported offline.
    Start,
    /// Abandon whatever is happening and return to `Idle` with an empty
    /// record.  Also used for "new item" from `Result`.
    Reset,
}

// ---------------------------------------------------------------------------
// StageError
// ---------------------------------------------------------------------------

/// Network-backed step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Calibration,
    Capture,
    Classification,
    Sorting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Calibration => "Calibration",
            Stage::Capture => "Capture",
            Stage::Classification => "Classification",
            Stage::Sorting => "Sorting",
        };
        f.write_str(name)
    }
}

/// Why a run was aborted.  The `Display` text becomes the ErrorSignal shown
/// to the operator.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("{stage} failed: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    /// The classifier reported `UNKNOWN` and the sorter must not guess.
    #[error("Unable to classify waste (model said {category:?})")]
    UnknownWasteType { category: String },

    /// The scale did not register the item after sorting.
    #[error("Sorting failed: invalid item weight {0} g")]
    InvalidWeight(f64),
}

impl StageError {
    fn backend(stage: Stage) -> impl FnOnce(BackendError) -> StageError {
        move |source| StageError::Backend { stage, source }
    }
}

// ---------------------------------------------------------------------------
// ProcessController
// ---------------------------------------------------------------------------

/// How a run ended from the command loop's point of view.
enum RunExit {
    Finished(Result<(), StageError>),
    Reset,
    Closed,
}

/// The single owner of [`ProcessSnapshot`].
///
/// Create with [`ProcessController::new`], then call [`run`](Self::run)
/// inside a tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use recycle_kiosk::backend::{HttpBackend, KioskBackend};
/// use recycle_kiosk::config::AppConfig;
/// use recycle_kiosk::peripheral::new_shared_status;
/// use recycle_kiosk::pipeline::{new_shared_state, ControllerCommand, ProcessController};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let backend: Arc<dyn KioskBackend> = Arc::new(HttpBackend::from_config(&config.backend));
/// let state = new_shared_state(config.pipeline.countdown_start);
///
/// let controller = ProcessController::new(state, new_shared_status(), backend, &config.pipeline);
/// let (command_tx, command_rx) = tokio::sync::mpsc::channel(16);
/// tokio::spawn(controller.run(command_rx));
///
/// command_tx.send(ControllerCommand::Start).await.unwrap();
/// # }
/// ```
pub struct ProcessController {
    state: SharedState,
    status: SharedStatus,
    backend: Arc<dyn KioskBackend>,
    config: PipelineConfig,
    transitions: broadcast::Sender<ProcessState>,
}

impl ProcessController {
    /// Create a new controller.
    ///
    /// * `state`: snapshot written by this controller, read by the panel.
    /// * `status`: peripheral status written by the poller; read here to
    ///   refuse starts while the hardware is offline.
    /// * `backend`: kiosk backend (e.g. `HttpBackend`).
    pub fn new(
        state: SharedState,
        status: SharedStatus,
        backend: Arc<dyn KioskBackend>,
        config: &PipelineConfig,
    ) -> Self {
        let (transitions, _) = broadcast::channel(32);
        Self {
            state,
            status,
            backend,
            config: config.clone(),
            transitions,
        }
    }

    /// Receive every state the controller enters, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessState> {
        self.transitions.subscribe()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the controller until `commands` is closed.
    ///
    /// Closing the channel mid-run abandons the run.
    pub async fn run(self, mut commands: mpsc::Receiver<ControllerCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                ControllerCommand::Reset => self.reset(),
                ControllerCommand::Start => {
                    if !self.begin_run() {
                        continue;
                    }
                    match self.drive_run(&mut commands).await {
                        RunExit::Finished(Ok(())) => log::info!("controller: run complete"),
                        RunExit::Finished(Err(e)) => self.fail(e),
                        RunExit::Reset => self.reset(),
                        RunExit::Closed => break,
                    }
                }
            }
        }

        log::info!("controller: command channel closed, shutting down");
    }

    /// Race the run against incoming commands.  Returning drops the run
    /// future together with its countdown and any pending request.
    async fn drive_run(&self, commands: &mut mpsc::Receiver<ControllerCommand>) -> RunExit {
        let run = self.execute_run();
        tokio::pin!(run);

        loop {
            tokio::select! {
                outcome = &mut run => return RunExit::Finished(outcome),
                command = commands.recv() => match command {
                    Some(ControllerCommand::Start) => {
                        log::debug!(
                            "controller: start ignored, run in progress ({})",
                            self.current().label()
                        );
                    }
                    Some(ControllerCommand::Reset) => return RunExit::Reset,
                    None => return RunExit::Closed,
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn execute_run(&self) -> Result<(), StageError> {
        // ── 1. Calibration ───────────────────────────────────────────────
        let base_weight = self
            .backend
            .measure_base()
            .await
            .map_err(StageError::backend(Stage::Calibration))?;

        log::info!("controller: base weight {base_weight} g");
        let countdown_start = self.config.countdown_start;
        self.apply(ProcessEvent::Calibrated, |st| {
            st.item.base_weight = Some(base_weight);
            st.countdown = countdown_start;
            st.error = None;
        });

        // ── 2. Countdown ─────────────────────────────────────────────────
        self.count_down().await;
        self.apply(ProcessEvent::CountdownElapsed, |_| {});

        // ── 3. Capture + classify ────────────────────────────────────────
        let image = self
            .backend
            .capture()
            .await
            .map_err(StageError::backend(Stage::Capture))?;

        log::debug!("controller: captured {} bytes", image.len());
        self.apply(ProcessEvent::Captured, |st| {
            st.item.captured_image = Some(image);
            st.error = None;
        });

        let classification = self
            .backend
            .classify()
            .await
            .map_err(StageError::backend(Stage::Classification))?;

        if self.config.reject_unknown_type && classification.kind() == WasteKind::Unknown {
            return Err(StageError::UnknownWasteType {
                category: classification.category,
            });
        }

        log::info!(
            "controller: classified as {:?} / {}",
            classification.category,
            classification.waste_type
        );
        let waste_type = classification.waste_type.clone();
        self.apply(ProcessEvent::Classified, |st| {
            st.item.classification = Some(classification);
            st.error = None;
        });

        // ── 4. Sorting ───────────────────────────────────────────────────
        let outcome = self
            .backend
            .process_waste(&waste_type)
            .await
            .map_err(StageError::backend(Stage::Sorting))?;

        // NaN fails this comparison too.
        if !(outcome.weight > 0.0) {
            return Err(StageError::InvalidWeight(outcome.weight));
        }

        log::info!(
            "controller: sorted {} g, reward {} ({})",
            outcome.weight,
            outcome.amount,
            outcome.id
        );
        self.apply(ProcessEvent::Sorted, |st| {
            st.item.result = Some(outcome);
            st.error = None;
        });

        Ok(())
    }

    /// Count down from the configured start, one step per tick.
    async fn count_down(&self) {
        let mut countdown = Countdown::new(self.config.countdown_start);
        let mut ticker = countdown_ticker(self.config.countdown_tick());

        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match countdown.tick() {
                Some(CountdownTick::Remaining(left)) => self.update(|st| st.countdown = left),
                Some(CountdownTick::Elapsed) | None => {
                    self.update(|st| st.countdown = 0);
                    return;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn begin_run(&self) -> bool {
        let peripherals = *self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current();

        if current.is_busy() {
            log::debug!("controller: start ignored in {current:?}");
            return false;
        }
        if !current.can_start(&peripherals) {
            log::warn!("controller: start ignored, hardware offline");
            return false;
        }

        self.apply(ProcessEvent::Start, |st| st.item = ItemRecord::default())
    }

    fn fail(&self, error: StageError) {
        let message = error.to_string();
        log::error!("controller: run aborted: {message}");

        let countdown_start = self.config.countdown_start;
        let clear = |st: &mut ProcessSnapshot, message: String| {
            st.item = ItemRecord::default();
            st.countdown = countdown_start;
            st.error = Some(message);
        };

        if !self.apply(ProcessEvent::StageFailed, |st| clear(st, message.clone())) {
            self.apply(ProcessEvent::Reset, |st| clear(st, message));
        }
    }

    fn reset(&self) {
        let countdown_start = self.config.countdown_start;
        self.apply(ProcessEvent::Reset, |st| {
            st.item = ItemRecord::default();
            st.countdown = countdown_start;
            st.error = None;
        });
    }

    /// Apply `event` and `mutate` under one lock, so a state is never
    /// observable without the data it depends on.  Returns `false` (and
    /// leaves the snapshot untouched) when the event is invalid in the
    /// current state.
    fn apply(&self, event: ProcessEvent, mutate: impl FnOnce(&mut ProcessSnapshot)) -> bool {
        let (from, to) = {
            let mut st = self.lock();
            let from = st.process;
            let Some(to) = from.on(event) else {
                drop(st);
                log::warn!("controller: {event:?} is not valid in {from:?}");
                return false;
            };
            mutate(&mut *st);
            st.process = to;
            (from, to)
        };

        if from != to {
            log::info!("controller: {from:?} → {to:?}");
            // No subscribers is fine.
            let _ = self.transitions.send(to);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, ProcessSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> ProcessState {
        self.lock().process
    }

    fn update(&self, mutate: impl FnOnce(&mut ProcessSnapshot)) {
        mutate(&mut *self.lock());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
