use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use client_core::{
    reduce, StatementRequest, SubmissionError, SubmissionEvent, SubmissionOutcome,
    SubmissionState,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{FieldName, FieldUpdate, FormFields, Notification, Severity};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;

pub struct K4FillerApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    state: SubmissionState,
    download_dir: PathBuf,
    status: String,
}

impl K4FillerApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            state: SubmissionState::new(FormFields::default()),
            download_dir,
            status: "Starting backend worker...".to_string(),
        }
    }

    fn apply(&mut self, event: SubmissionEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.handle_ui_event(event);
        }
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => {
                self.status = message;
            }
            UiEvent::StatementLoaded(file) => {
                self.status = format!(
                    "Selected {} ({})",
                    file.file_name,
                    human_readable_bytes(file.size_bytes())
                );
                self.apply(SubmissionEvent::FileSelected(Some(file)));
            }
            UiEvent::StatementLoadFailed(reason) => {
                self.status = format!("Couldn't open statement: {reason}");
                self.apply(SubmissionEvent::FileSelected(None));
            }
            UiEvent::SubmissionSettled(outcome) => {
                self.status = match &outcome {
                    SubmissionOutcome::Delivered { file_name, .. } => {
                        format!("Saved {}", self.download_dir.join(file_name).display())
                    }
                    SubmissionOutcome::Failed(err) => err.user_message(),
                };
                self.apply(SubmissionEvent::Settled {
                    outcome,
                    at: Instant::now(),
                });
            }
            UiEvent::WorkerFailed(reason) => {
                self.status = reason.clone();
                // Nothing will answer an outstanding request any more.
                if self.state.is_busy() {
                    self.apply(SubmissionEvent::Settled {
                        outcome: SubmissionOutcome::Failed(SubmissionError::Network(reason)),
                        at: Instant::now(),
                    });
                }
            }
        }
    }

    fn pick_statement(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("PDF", &["pdf"]);
        if let Some(dir) = dirs::document_dir().or_else(dirs::home_dir) {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.request_statement(path);
        }
    }

    fn request_statement(&mut self, path: PathBuf) {
        self.status = format!("Opening {}...", display_name(&path));
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::LoadStatement { path },
            &mut self.status,
        );
    }

    fn submit(&mut self) {
        if !self.state.can_submit() {
            return;
        }
        let Some(file) = self.state.file.clone() else {
            return;
        };
        let request = StatementRequest {
            fields: self.state.fields.clone(),
            file,
        };
        if dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::ProcessStatement { request },
            &mut self.status,
        ) {
            self.status = "Processing statement...".to_string();
            self.apply(SubmissionEvent::SubmitStarted);
        }
    }

    fn show_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("K4 Filler Service");
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            if ui.button("Choose statement PDF...").clicked() {
                self.pick_statement();
            }
            let selected = self.state.file.as_ref().map(|file| file.file_name.clone());
            match selected {
                Some(file_name) => {
                    ui.label(file_name);
                    if ui.small_button("Clear").clicked() {
                        self.apply(SubmissionEvent::FileSelected(None));
                    }
                }
                None => {
                    ui.weak("No file selected");
                }
            }
        });
        ui.add_space(8.0);

        let mut updates = Vec::new();
        egui::Grid::new("k4_form_fields")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let fields = &self.state.fields;

                ui.label(FieldName::TaxYear.label());
                let mut tax_year = fields.tax_year;
                if ui.add(egui::DragValue::new(&mut tax_year)).changed() {
                    updates.push(FieldUpdate::TaxYear(tax_year));
                }
                ui.end_row();

                for (name, current) in [
                    (FieldName::BrokerName, &fields.broker_name),
                    (FieldName::AccountNumber, &fields.account_number),
                    (FieldName::TaxpayerName, &fields.taxpayer_name),
                    (FieldName::TaxpayerSin, &fields.taxpayer_sin),
                ] {
                    ui.label(name.label());
                    let mut value = current.clone();
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut value).desired_width(f32::INFINITY),
                    );
                    if response.changed() {
                        if let Ok(update) = FieldUpdate::parse(name, &value) {
                            updates.push(update);
                        }
                    }
                    ui.end_row();
                }
            });
        for update in updates {
            self.apply(SubmissionEvent::FieldChanged(update));
        }

        ui.add_space(12.0);
        let busy = self.state.is_busy();
        let can_submit = self.state.can_submit();
        ui.horizontal(|ui| {
            let label = if busy {
                "Processing..."
            } else {
                "Process Statement"
            };
            if busy {
                ui.spinner();
            }
            if ui.add_enabled(can_submit, egui::Button::new(label)).clicked() {
                self.submit();
            }
        });
    }

    fn show_notification(&mut self, ui: &mut egui::Ui) {
        let Some(notification) = self.state.visible_notification().cloned() else {
            return;
        };
        let (fill, stroke) = severity_colors(&notification);

        egui::Frame::NONE
            .fill(fill)
            .stroke(egui::Stroke::new(1.0, stroke))
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(notification.message.as_str())
                            .color(egui::Color32::WHITE),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Dismiss").clicked() {
                            self.apply(SubmissionEvent::NotificationDismissed);
                        }
                    });
                });
            });
    }
}

impl eframe::App for K4FillerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.apply(SubmissionEvent::Tick(Instant::now()));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.weak(self.status.as_str());
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_form(ui);
            ui.add_space(16.0);
            self.show_notification(ui);
        });

        // Keeps worker events flowing and lets the banner expire on time.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn severity_colors(notification: &Notification) -> (egui::Color32, egui::Color32) {
    match notification.severity {
        Severity::Info => (
            egui::Color32::from_rgb(44, 72, 110),
            egui::Color32::from_rgb(96, 136, 190),
        ),
        Severity::Success => (
            egui::Color32::from_rgb(46, 94, 58),
            egui::Color32::from_rgb(96, 168, 112),
        ),
        Severity::Error => (
            egui::Color32::from_rgb(111, 53, 53),
            egui::Color32::from_rgb(175, 96, 96),
        ),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn human_readable_bytes(size: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else if value.fract() == 0.0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::RequestState;
    use crossbeam_channel::bounded;
    use shared::domain::StatementFile;

    fn app() -> (K4FillerApp, Receiver<BackendCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded(8);
        let (ui_tx, ui_rx) = bounded(8);
        (
            K4FillerApp::new(cmd_tx, ui_rx, PathBuf::from("/home/alex/Downloads")),
            cmd_rx,
            ui_tx,
        )
    }

    fn statement() -> StatementFile {
        StatementFile::new("statement.pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn submit_without_file_queues_nothing() {
        let (mut app, cmd_rx, _ui_tx) = app();
        app.submit();
        assert!(cmd_rx.try_recv().is_err());
        assert!(!app.state.is_busy());
    }

    #[test]
    fn submit_queues_one_request_and_disables_resubmission() {
        let (mut app, cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        app.apply(SubmissionEvent::FieldChanged(FieldUpdate::BrokerName(
            "Avanza".to_string(),
        )));

        app.submit();
        app.submit();

        match cmd_rx.try_recv() {
            Ok(BackendCommand::ProcessStatement { request }) => {
                assert_eq!(request.file, statement());
                assert_eq!(request.fields.broker_name, "Avanza");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cmd_rx.try_recv().is_err());
        assert_eq!(app.state.request, RequestState::InFlight);
        assert!(!app.state.can_submit());
    }

    #[test]
    fn settlement_reenables_submission_and_shows_notification() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        app.submit();

        app.handle_ui_event(UiEvent::SubmissionSettled(SubmissionOutcome::Delivered {
            file_name: "filled_k4.pdf".to_string(),
            size_bytes: 9,
        }));

        assert!(!app.state.is_busy());
        assert!(app.state.can_submit());
        assert_eq!(
            app.state.visible_notification(),
            Some(&Notification::success("K4 form processed successfully!"))
        );
        assert!(app.status.ends_with("filled_k4.pdf"));
    }

    #[test]
    fn timeout_settlement_uses_timeout_message() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        app.submit();

        app.handle_ui_event(UiEvent::SubmissionSettled(SubmissionOutcome::Failed(
            SubmissionError::Timeout,
        )));

        let notification = app.state.visible_notification().expect("notification");
        assert_eq!(notification.message, "Request timed out. Please try again.");
        assert_eq!(notification.severity, Severity::Error);
    }

    #[test]
    fn worker_failure_releases_in_flight_request() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        app.submit();
        assert!(app.state.is_busy());

        app.handle_ui_event(UiEvent::WorkerFailed("worker thread panicked".to_string()));

        assert!(!app.state.is_busy());
        assert_eq!(
            app.state.visible_notification().map(|n| n.message.as_str()),
            Some("Error: worker thread panicked")
        );
    }

    #[test]
    fn disconnected_worker_leaves_form_idle() {
        let (mut app, cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        drop(cmd_rx);

        app.submit();

        assert!(!app.state.is_busy());
        assert!(app.status.contains("disconnected"));
    }

    #[test]
    fn failed_load_clears_selection() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        app.handle_ui_event(UiEvent::StatementLoaded(statement()));
        app.handle_ui_event(UiEvent::StatementLoadFailed("permission denied".to_string()));
        assert!(app.state.file.is_none());
        assert!(!app.state.can_submit());
    }

    #[test]
    fn queued_worker_events_are_drained() {
        let (mut app, _cmd_rx, ui_tx) = app();
        ui_tx
            .send(UiEvent::Info("Ready".to_string()))
            .expect("send");
        ui_tx
            .send(UiEvent::StatementLoaded(statement()))
            .expect("send");

        app.process_ui_events();

        assert!(app.state.file.is_some());
        assert!(app.status.starts_with("Selected statement.pdf"));
    }

    #[test]
    fn formats_statement_sizes_readably() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
    }
}
