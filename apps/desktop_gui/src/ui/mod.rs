//! UI layer for the desktop form.

pub mod app;

pub use app::K4FillerApp;
