//! Backend worker: owns the tokio runtime and serves UI commands.
//!
//! File loads are answered inline. Submissions run as spawned tasks so a
//! pending request never holds up the next command; the UI sends at most one
//! at a time.

use std::{path::PathBuf, sync::Arc, thread};

use anyhow::{Context, Result};
use client_core::{
    read_statement_file, run_submission, FileDownloadSink, HttpStatementService,
    RequestContext, Settings,
};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub struct WorkerConfig {
    pub settings: Settings,
    pub download_dir: PathBuf,
}

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    config: WorkerConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                let _ = ui_tx.send(UiEvent::WorkerFailed(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                return;
            }
        };

        runtime.block_on(serve_commands(cmd_rx, ui_tx, config));
    })
}

fn build_service(settings: &Settings) -> Result<HttpStatementService> {
    let server_url = settings
        .parsed_server_url()
        .context("backend worker startup failure")?;
    HttpStatementService::new(&server_url)
        .with_context(|| format!("backend worker startup failure: bad endpoint for {server_url}"))
}

async fn serve_commands(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    config: WorkerConfig,
) {
    let service = match build_service(&config.settings) {
        Ok(service) => service,
        Err(err) => {
            tracing::error!("{err:#}");
            let _ = ui_tx.send(UiEvent::WorkerFailed(format!("{err:#}")));
            return;
        }
    };
    let service = Arc::new(service);
    let sink = Arc::new(FileDownloadSink::new(config.download_dir));
    let timeout = config.settings.request_timeout();
    tracing::info!(
        endpoint = %service.endpoint(),
        download_dir = %sink.dir().display(),
        "backend worker ready"
    );
    let _ = ui_tx.try_send(UiEvent::Info(format!(
        "Ready; filled forms are saved to {}",
        sink.dir().display()
    )));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::LoadStatement { path } => {
                let event = match read_statement_file(&path).await {
                    Ok(file) => UiEvent::StatementLoaded(file),
                    Err(err) => UiEvent::StatementLoadFailed(format!("{err:#}")),
                };
                let _ = ui_tx.send(event);
            }
            BackendCommand::ProcessStatement { request } => {
                let service = Arc::clone(&service);
                let sink = Arc::clone(&sink);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    let ctx = RequestContext::with_timeout(timeout);
                    let outcome =
                        run_submission(service.as_ref(), sink.as_ref(), &request, &ctx).await;
                    let _ = ui_tx.send(UiEvent::SubmissionSettled(outcome));
                });
            }
        }
    }
    tracing::info!("ui command channel closed; backend worker exiting");
}
