//! Recycling run orchestration.
//!
//! This module owns the state machine for one item on the tray and exposes
//! the shared snapshot that the operator panel reads every frame.
//!
//! # Architecture
//!
//! ```text
//! ControllerCommand (mpsc)          PeripheralStatus (poller)
//!        │                                 │
//!        ▼                                 ▼
//! ProcessController::run()  ← async tokio task, reads hardware_online
//!        │
//!        ├─ Start → measure-base → countdown → capture → classify → process-waste
//!        └─ Reset → drop the in-flight run, back to Idle
//!
//! SharedState (Arc<Mutex<ProcessSnapshot>>) ←─── read by egui update() each frame
//! broadcast::Receiver<ProcessState>          ←─── every state entered, in order
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use recycle_kiosk::backend::{HttpBackend, KioskBackend};
//! use recycle_kiosk::config::AppConfig;
//! use recycle_kiosk::peripheral::new_shared_status;
//! use recycle_kiosk::pipeline::{new_shared_state, ControllerCommand, ProcessController};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backend: Arc<dyn KioskBackend> = Arc::new(HttpBackend::from_config(&config.backend));
//!     let state = new_shared_state(config.pipeline.countdown_start);
//!
//!     let controller =
//!         ProcessController::new(state.clone(), new_shared_status(), backend, &config.pipeline);
//!     let mut transitions = controller.subscribe();
//!
//!     let (command_tx, command_rx) = mpsc::channel(16);
//!     tokio::spawn(controller.run(command_rx));
//!
//!     command_tx.send(ControllerCommand::Start).await.unwrap();
//!     while let Ok(entered) = transitions.recv().await {
//!         println!("{}", entered.label());
//!     }
//! }
//! ```

pub mod countdown;
pub mod runner;
pub mod state;

pub use countdown::{countdown_ticker, Countdown, CountdownTick};
pub use runner::{ControllerCommand, ProcessController, Stage, StageError};
pub use state::{
    new_shared_state, ItemRecord, ProcessEvent, ProcessSnapshot, ProcessState, SharedState,
};
