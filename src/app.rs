//! Recycle kiosk operator panel, egui/eframe application.
//!
//! # Architecture
//!
//! [`KioskApp`] is the top-level [`eframe::App`].  It never mutates the run
//! itself; every frame it copies the two shared snapshots and renders them:
//!
//! * `state`: [`ProcessSnapshot`] written by the process controller.
//! * `status`: [`PeripheralStatus`] written by the status poller.
//! * `command_tx`: sends [`ControllerCommand`] (Start / Reset) to the
//!   controller task.
//!
//! # Panels
//!
//! | State | Visual |
//! |-------|--------|
//! | `Idle` | "Start" button, disabled while the hardware is offline |
//! | `Calibrating` | Spinner + "Calibrating scale..." |
//! | `CountdownToCapture` | Large countdown + "Place your item on the tray" |
//! | `Analyzing` | Spinner + classification once known |
//! | `Sorting` | Spinner + waste type being sorted |
//! | `Result` | Weight, reward, voucher id + "Start New Process" |

use std::sync::PoisonError;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::backend::SortOutcome;
use crate::config::AppConfig;
use crate::peripheral::{PeripheralStatus, SharedStatus};
use crate::pipeline::{ControllerCommand, ProcessSnapshot, ProcessState, SharedState};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const GOOD: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const BAD: egui::Color32 = egui::Color32::from_rgb(255, 100, 80);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

// ---------------------------------------------------------------------------
// KioskApp
// ---------------------------------------------------------------------------

/// eframe application for the kiosk operator panel.
pub struct KioskApp {
    // ── Shared state ─────────────────────────────────────────────────────
    /// Run snapshot, written only by the process controller.
    state: SharedState,
    /// Peripheral status, written only by the status poller.
    status: SharedStatus,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,

    // ── Channels ─────────────────────────────────────────────────────────
    /// Send commands to the process controller.
    command_tx: mpsc::Sender<ControllerCommand>,

    // ── Configuration ────────────────────────────────────────────────────
    /// Application configuration (read-only after startup).
    config: AppConfig,
}

impl KioskApp {
    /// Create a new [`KioskApp`].
    ///
    /// * `state`: snapshot written by the process controller.
    /// * `status`: peripheral status written by the poller.
    /// * `command_tx`: sender end of the controller command channel.
    /// * `config`: loaded application configuration.
    pub fn new(
        state: SharedState,
        status: SharedStatus,
        command_tx: mpsc::Sender<ControllerCommand>,
        config: AppConfig,
    ) -> Self {
        Self {
            state,
            status,
            spinner_phase: 0.0,
            command_tx,
            config,
        }
    }

    /// Forward an operator action to the controller.
    ///
    /// Uses `try_send` so a full or closed channel never blocks the UI
    /// thread; the action is simply dropped with a warning.
    fn send(&self, command: ControllerCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("panel: {command:?} not delivered: {e}");
        }
    }

    /// Copy the controller snapshot and the peripheral status.
    ///
    /// Each lock is held only for the copy, so a frame never stalls the
    /// controller or the poller.
    fn read_state(&self) -> (ProcessSnapshot, PeripheralStatus) {
        let snapshot = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let status = *self.status.lock().unwrap_or_else(PoisonError::into_inner);
        (snapshot, status)
    }

    // ── Title bar ────────────────────────────────────────────────────────

    /// Title, current stage and the two peripheral badges.
    fn draw_title_bar(
        &self,
        ui: &mut egui::Ui,
        snapshot: &ProcessSnapshot,
        status: &PeripheralStatus,
    ) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Smart Recycling Kiosk").size(20.0).strong());
            ui.label(
                egui::RichText::new(snapshot.process.label())
                    .color(state_color(snapshot.process))
                    .size(14.0),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                draw_badge(ui, "Camera", status.camera_online);
                draw_badge(ui, "Hardware", status.hardware_online);
            });
        });
    }

    // ── State-specific panel renderers ───────────────────────────────────

    /// Render the Idle panel: the Start button.
    ///
    /// The button is disabled whenever [`ProcessState::can_start`] says no,
    /// with a hint while the hardware is offline.  The controller applies
    /// the same guard, so a click that slips through is still ignored.
    fn draw_idle(
        &self,
        ui: &mut egui::Ui,
        snapshot: &ProcessSnapshot,
        status: &PeripheralStatus,
    ) {
        let enabled = snapshot.process.can_start(status);

        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            let start = egui::Button::new(egui::RichText::new("Start").size(22.0))
                .min_size(egui::vec2(220.0, 56.0));
            if ui.add_enabled(enabled, start).clicked() {
                self.send(ControllerCommand::Start);
            }

            if !status.hardware_online {
                ui.add_space(8.0);
                ui.label(
                    egui::RichText::new("Waiting for the scale and sorter to come online")
                        .color(DIM)
                        .size(13.0),
                );
            }
        });
    }

    /// Render a stage that is waiting on the backend: spinner + label.
    fn draw_busy(&self, ui: &mut egui::Ui, text: &str) {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format!("{} {text}", self.spinner_char()))
                    .color(ACCENT)
                    .size(18.0),
            );
        });
    }

    /// Render the CountdownToCapture panel: the remaining count, the
    /// placement prompt and the tare weight from calibration.
    fn draw_countdown(&self, ui: &mut egui::Ui, snapshot: &ProcessSnapshot) {
        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(snapshot.countdown.to_string())
                    .color(ACCENT)
                    .size(72.0)
                    .strong(),
            );
            ui.label(egui::RichText::new("Place your item on the tray").size(16.0));
            if let Some(base) = snapshot.item.base_weight {
                ui.label(
                    egui::RichText::new(format!("Tray calibrated at {base:.1} g"))
                        .color(DIM)
                        .size(12.0),
                );
            }
        });
    }

    /// Show the classification, once the item has one.
    fn draw_classification(&self, ui: &mut egui::Ui, snapshot: &ProcessSnapshot) {
        if let Some(c) = &snapshot.item.classification {
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(format!("{} ({})", c.kind().label(), c.category))
                        .size(16.0),
                );
            });
        }
    }

    /// Render the Result panel: outcome lines + "Start New Process".
    ///
    /// "Start New Process" sends a Reset, which discards the record and
    /// returns to Idle.
    fn draw_result(&self, ui: &mut egui::Ui, snapshot: &ProcessSnapshot) {
        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("Thank you for recycling!").color(GOOD).size(20.0));
            self.draw_classification(ui, snapshot);

            if let Some(outcome) = &snapshot.item.result {
                ui.add_space(8.0);
                for line in result_lines(outcome, &self.config.ui.currency_symbol) {
                    ui.label(egui::RichText::new(line).size(15.0));
                }
            }

            ui.add_space(16.0);
            let again = egui::Button::new(egui::RichText::new("Start New Process").size(18.0))
                .min_size(egui::vec2(220.0, 48.0));
            if ui.add(again).clicked() {
                self.send(ControllerCommand::Reset);
            }
        });
    }

    /// Render the ErrorSignal banner above the stage panel.
    fn draw_error(&self, ui: &mut egui::Ui, message: &str) {
        egui::Frame::new()
            .fill(egui::Color32::from_rgb(70, 30, 30))
            .corner_radius(egui::CornerRadius::same(6))
            .inner_margin(egui::Margin::same(8))
            .show(ui, |ui| {
                ui.label(egui::RichText::new(message).color(BAD).size(14.0));
            });
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }
}

/// Draw one peripheral badge in the title bar.
fn draw_badge(ui: &mut egui::Ui, name: &str, online: bool) {
    let (text, color) = badge(name, online);
    ui.label(egui::RichText::new(text).color(color).size(13.0));
}

/// Text and colour of a peripheral badge.
fn badge(name: &str, online: bool) -> (String, egui::Color32) {
    if online {
        (format!("{name}: online"), GOOD)
    } else {
        (format!("{name}: offline"), BAD)
    }
}

/// Accent colour for the stage label: dim when idle, green when done, blue
/// while a run is in progress.
fn state_color(state: ProcessState) -> egui::Color32 {
    match state {
        ProcessState::Idle => DIM,
        ProcessState::Result => GOOD,
        _ => ACCENT,
    }
}

/// Lines printed under "Thank you for recycling!".
fn result_lines(outcome: &SortOutcome, currency_symbol: &str) -> Vec<String> {
    vec![
        format!("Weight: {:.1} g", outcome.weight),
        format!("Reward: {currency_symbol}{:.2}", outcome.amount),
        format!("Voucher: {}", outcome.id),
        format!("QR code: {} bytes", outcome.qr_code.len()),
    ]
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for KioskApp {
    /// Called every frame by eframe.  Copies the shared state, then renders
    /// the panel for the current stage.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (snapshot, status) = self.read_state();

        // --- Advance spinner animation -------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Schedule repaints ---------------------------------------------
        // The controller and the poller change state from other threads, so
        // keep polling even when nothing is animating.
        let repaint = if snapshot.process.is_busy() { 66 } else { 250 };
        ctx.request_repaint_after(Duration::from_millis(repaint));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_title_bar(ui, &snapshot, &status);
            ui.separator();

            if let Some(message) = &snapshot.error {
                self.draw_error(ui, message);
            }

            match snapshot.process {
                ProcessState::Idle => self.draw_idle(ui, &snapshot, &status),
                ProcessState::Calibrating => self.draw_busy(ui, "Calibrating scale..."),
                ProcessState::CountdownToCapture => self.draw_countdown(ui, &snapshot),
                ProcessState::Analyzing => {
                    self.draw_busy(ui, "Analyzing your item...");
                    self.draw_classification(ui, &snapshot);
                }
                ProcessState::Sorting => {
                    self.draw_busy(ui, "Sorting and weighing...");
                    self.draw_classification(ui, &snapshot);
                }
                ProcessState::Result => self.draw_result(ui, &snapshot),
            }

            if snapshot.process.is_busy() {
                ui.add_space(24.0);
                ui.vertical_centered(|ui| {
                    if ui.button("Reset").clicked() {
                        self.send(ControllerCommand::Reset);
                    }
                });
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
