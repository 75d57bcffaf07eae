//! Process state machine and the snapshot the operator panel renders.
//!
//! [`ProcessState::on`] is the whole transition table: a pure function of the
//! current state and a [`ProcessEvent`].  The controller applies it; nothing
//! else writes [`ProcessSnapshot`].

use std::sync::{Arc, Mutex};

use crate::backend::{Classification, SortOutcome};
use crate::peripheral::PeripheralStatus;

// ---------------------------------------------------------------------------
// ProcessState
// ---------------------------------------------------------------------------

/// Stages of one recycling run.
///
/// ```text
/// Idle ──start──▶ Calibrating ──base weight──▶ CountdownToCapture
///                                                  │ countdown elapsed
///                                                  ▼
/// Result ◀──sorted── Sorting ◀──classified── Analyzing (capture, classify)
///
/// Calibrating / Analyzing / Sorting ──failure──▶ Idle
/// any state ──reset──▶ Idle
/// Result ──start──▶ Calibrating
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// Waiting for the operator to start a run.
    #[default]
    Idle,
    /// Taring the scale with the empty tray.
    Calibrating,
    /// Operator places the item; the camera fires when the counter runs out.
    CountdownToCapture,
    /// Capturing the photo and classifying it.
    Analyzing,
    /// Sorter is moving the item and the scale is weighing it.
    Sorting,
    /// Item sorted, reward issued.
    Result,
}

/// Everything that can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEvent {
    Start,
    Calibrated,
    CountdownElapsed,
    Captured,
    Classified,
    Sorted,
    StageFailed,
    Reset,
}

impl ProcessState {
    /// Apply `event`; `None` when the event is not valid in this state.
    ///
    /// ```
    /// use recycle_kiosk::pipeline::{ProcessEvent, ProcessState};
    ///
    /// assert_eq!(ProcessState::Idle.on(ProcessEvent::Start), Some(ProcessState::Calibrating));
    /// assert_eq!(ProcessState::Sorting.on(ProcessEvent::Start), None);
    /// assert_eq!(ProcessState::Sorting.on(ProcessEvent::Reset), Some(ProcessState::Idle));
    /// ```
    pub fn on(self, event: ProcessEvent) -> Option<ProcessState> {
        use ProcessEvent as E;
        use ProcessState as S;

        match (self, event) {
            (_, E::Reset) => Some(S::Idle),
            (S::Idle | S::Result, E::Start) => Some(S::Calibrating),
            (S::Calibrating, E::Calibrated) => Some(S::CountdownToCapture),
            (S::CountdownToCapture, E::CountdownElapsed) => Some(S::Analyzing),
            (S::Analyzing, E::Captured) => Some(S::Analyzing),
            (S::Analyzing, E::Classified) => Some(S::Sorting),
            (S::Sorting, E::Sorted) => Some(S::Result),
            (S::Calibrating | S::Analyzing | S::Sorting, E::StageFailed) => Some(S::Idle),
            _ => None,
        }
    }

    /// Returns `true` while a run is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self, ProcessState::Idle | ProcessState::Result)
    }

    /// Whether a new run may begin from this state, given the latest
    /// peripheral status.  The operator panel disables its start button
    /// when this is `false`.
    pub fn can_start(&self, peripherals: &PeripheralStatus) -> bool {
        !self.is_busy() && peripherals.hardware_online
    }

    /// A short human-readable label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::Idle => "Ready",
            ProcessState::Calibrating => "Calibrating scale",
            ProcessState::CountdownToCapture => "Place item",
            ProcessState::Analyzing => "Analyzing",
            ProcessState::Sorting => "Sorting",
            ProcessState::Result => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// ItemRecord
// ---------------------------------------------------------------------------

/// Data accumulated for the item currently on the tray.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRecord {
    /// Tare weight in grams, from calibration.
    pub base_weight: Option<f64>,
    /// JPEG bytes of the item.
    pub captured_image: Option<Vec<u8>>,
    pub classification: Option<Classification>,
    pub result: Option<SortOutcome>,
}

impl ItemRecord {
    pub fn is_empty(&self) -> bool {
        self.base_weight.is_none()
            && self.captured_image.is_none()
            && self.classification.is_none()
            && self.result.is_none()
    }
}

// ---------------------------------------------------------------------------
// ProcessSnapshot
// ---------------------------------------------------------------------------

/// Everything the operator panel needs to draw the run.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    pub process: ProcessState,
    pub item: ItemRecord,
    /// Seconds left before capture.  Only meaningful in
    /// [`ProcessState::CountdownToCapture`].
    pub countdown: u32,
    /// Last stage failure, shown until the next successful stage or a reset.
    pub error: Option<String>,
}

impl ProcessSnapshot {
    pub fn new(countdown_start: u32) -> Self {
        Self {
            countdown: countdown_start,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`ProcessSnapshot`].
///
/// Cheap to clone.  Lock for a short critical section; do **not** hold the
/// lock across `.await` points.
pub type SharedState = Arc<Mutex<ProcessSnapshot>>;

/// Construct a new [`SharedState`] in `Idle`.
pub fn new_shared_state(countdown_start: u32) -> SharedState {
    Arc::new(Mutex::new(ProcessSnapshot::new(countdown_start)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
