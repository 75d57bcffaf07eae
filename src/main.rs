//! Application entry point for the recycle kiosk client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (writes the defaults on first run).
//! 3. Create the [`tokio`] runtime (multi-thread).
//! 4. Build the HTTP backend client from config.
//! 5. Spawn the peripheral status poller.
//! 6. Spawn the process controller with its command channel.
//! 7. Run [`eframe::run_native`]: blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::Context as _;
use eframe::egui;
use tokio::sync::mpsc;

use recycle_kiosk::{
    app::KioskApp,
    backend::{HttpBackend, KioskBackend},
    config::AppConfig,
    peripheral::{new_shared_status, StatusPoller},
    pipeline::{new_shared_state, ControllerCommand, ProcessController},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Recycle Kiosk")
        .with_inner_size([width, height])
        .with_min_inner_size([480.0, 360.0]);

    if config.ui.fullscreen {
        vp = vp.with_fullscreen(true);
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Recycle kiosk starting up");

    // 2. Configuration
    let config = AppConfig::load_or_create().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!("Backend at {}", config.backend.base_url);

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Backend + shared state
    let backend: Arc<dyn KioskBackend> = Arc::new(HttpBackend::from_config(&config.backend));
    let state = new_shared_state(config.pipeline.countdown_start);
    let status = new_shared_status();

    // 5. Status poller (stops when the handle is dropped at the end of main)
    let _poller = {
        let _guard = rt.enter();
        StatusPoller::new(Arc::clone(&backend), Arc::clone(&status), &config.poller).spawn()
    };

    // 6. Process controller
    let (command_tx, command_rx) = mpsc::channel::<ControllerCommand>(16);
    let controller = ProcessController::new(
        Arc::clone(&state),
        Arc::clone(&status),
        backend,
        &config.pipeline,
    );
    rt.spawn(controller.run(command_rx));

    // 7. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let app = KioskApp::new(state, status, command_tx, config);

    eframe::run_native(
        "Recycle Kiosk",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("operator panel failed: {e}"))?;

    log::info!("Recycle kiosk shutting down");
    Ok(())
}
