//! Recycle kiosk client: drives one item at a time through calibration,
//! capture, classification and sorting against the kiosk backend, and shows
//! the run on an egui operator panel.

pub mod app;
pub mod backend;
pub mod config;
pub mod peripheral;
pub mod pipeline;
