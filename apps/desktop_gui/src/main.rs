use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::{commands::BackendCommand, runtime::WorkerConfig};
use clap::Parser;
use client_core::{load_settings, Settings};
use controller::events::UiEvent;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;
use ui::K4FillerApp;

#[derive(Parser, Debug)]
struct Args {
    /// Root URL of the processing service; overrides k4filler.toml.
    #[arg(long)]
    server_url: Option<String>,
    /// Directory receiving filled_k4.pdf; defaults to the user's downloads.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_settings(args: Args, loaded: Settings) -> (Settings, PathBuf) {
    let mut settings = loaded;
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(dir) = args.output_dir {
        settings.output_dir = Some(dir);
    }
    let download_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(default_download_dir);
    (settings, download_dir)
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let loaded = load_settings().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring unusable settings; falling back to defaults");
        Settings::default()
    });
    let (settings, download_dir) = resolve_settings(args, loaded);

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(
        cmd_rx,
        ui_tx,
        WorkerConfig {
            settings,
            download_dir: download_dir.clone(),
        },
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("K4 Filler Service")
            .with_inner_size([640.0, 520.0])
            .with_min_inner_size([480.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "K4 Filler Service",
        options,
        Box::new(move |_cc| Ok(Box::new(K4FillerApp::new(cmd_tx, ui_rx, download_dir)))),
    )
}
