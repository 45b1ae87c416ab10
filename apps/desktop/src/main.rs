use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, read_statement_file, FileDownloadSink, HttpStatementService, Settings,
    SubmissionController, SubmissionOutcome,
};
use shared::domain::{default_tax_year, FormFields, Severity};
use tracing_subscriber::EnvFilter;

/// Submit a broker statement and download the filled K4 form.
#[derive(Parser, Debug)]
#[command(name = "k4filler")]
struct Args {
    /// Broker statement (PDF) to submit.
    #[arg(long)]
    file: PathBuf,
    /// Defaults to the previous calendar year.
    #[arg(long)]
    tax_year: Option<i32>,
    #[arg(long, default_value = "")]
    broker_name: String,
    #[arg(long, default_value = "")]
    account_number: String,
    #[arg(long, default_value = "")]
    taxpayer_name: String,
    #[arg(long, default_value = "")]
    taxpayer_sin: String,
    /// Root URL of the processing service.
    #[arg(long)]
    server_url: Option<String>,
    /// Directory receiving filled_k4.pdf.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn form_fields(&self) -> FormFields {
        FormFields {
            tax_year: self.tax_year.unwrap_or_else(default_tax_year),
            broker_name: self.broker_name.clone(),
            account_number: self.account_number.clone(),
            taxpayer_name: self.taxpayer_name.clone(),
            taxpayer_sin: self.taxpayer_sin.clone(),
        }
    }

    fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = &self.output_dir {
            settings.output_dir = Some(v.clone());
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = args.apply_to(load_settings()?);
    settings.validate()?;
    let server_url = settings.parsed_server_url()?;
    let service = HttpStatementService::new(&server_url)
        .with_context(|| format!("failed to derive processing endpoint from {server_url}"))?;
    let output_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let sink = FileDownloadSink::new(&output_dir);
    tracing::info!(
        endpoint = %service.endpoint(),
        output_dir = %output_dir.display(),
        timeout_secs = settings.request_timeout_secs,
        "k4filler starting"
    );

    let statement = read_statement_file(&args.file).await?;
    let mut controller = SubmissionController::new(service, sink, args.form_fields())
        .with_timeout(settings.request_timeout());
    controller.select_file(Some(statement));

    let Some(outcome) = controller.submit().await else {
        bail!("submission was not accepted");
    };
    let notification = outcome.notification();
    match (&outcome, notification.severity) {
        (SubmissionOutcome::Delivered { file_name, .. }, _) => {
            println!("{}", notification.message);
            println!("Saved {}", output_dir.join(file_name).display());
            Ok(ExitCode::SUCCESS)
        }
        (_, Severity::Error) => {
            eprintln!("{}", notification.message);
            Ok(ExitCode::FAILURE)
        }
        (_, _) => {
            println!("{}", notification.message);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_fields_from_flags() {
        let args = Args::try_parse_from([
            "k4filler",
            "--file",
            "statement.pdf",
            "--tax-year",
            "2022",
            "--broker-name",
            "Avanza",
            "--account-number",
            "12-345",
            "--taxpayer-name",
            "Alex Doe",
            "--taxpayer-sin",
            "046 454 286",
        ])
        .expect("args");

        assert_eq!(args.file, PathBuf::from("statement.pdf"));
        assert_eq!(
            args.form_fields(),
            FormFields {
                tax_year: 2022,
                broker_name: "Avanza".to_string(),
                account_number: "12-345".to_string(),
                taxpayer_name: "Alex Doe".to_string(),
                taxpayer_sin: "046 454 286".to_string(),
            }
        );
    }

    #[test]
    fn tax_year_defaults_to_previous_year() {
        let args = Args::try_parse_from(["k4filler", "--file", "statement.pdf"]).expect("args");
        assert_eq!(args.form_fields().tax_year, default_tax_year());
        assert!(args.form_fields().broker_name.is_empty());
    }

    #[test]
    fn file_flag_is_required() {
        assert!(Args::try_parse_from(["k4filler", "--broker-name", "Avanza"]).is_err());
    }

    #[test]
    fn flags_override_loaded_settings() {
        let args = Args::try_parse_from([
            "k4filler",
            "--file",
            "statement.pdf",
            "--server-url",
            "https://k4.example.test",
            "--timeout-secs",
            "30",
            "--output-dir",
            "out",
        ])
        .expect("args");

        let settings = args.apply_to(Settings::default());
        assert_eq!(settings.server_url, "https://k4.example.test");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn oversized_timeout_flag_fails_validation() {
        let args = Args::try_parse_from([
            "k4filler",
            "--file",
            "statement.pdf",
            "--timeout-secs",
            "18446744073709551615",
        ])
        .expect("args");

        let err = args
            .apply_to(Settings::default())
            .validate()
            .expect_err("must fail");
        assert!(matches!(err, client_core::SettingsError::TimeoutTooLarge(u64::MAX)));
    }

    #[test]
    fn settings_are_kept_when_flags_are_absent() {
        let args = Args::try_parse_from(["k4filler", "--file", "statement.pdf"]).expect("args");
        let loaded = Settings {
            server_url: "http://10.0.0.5:8000".to_string(),
            request_timeout_secs: 90,
            output_dir: Some(PathBuf::from("/srv/k4")),
        };
        assert_eq!(args.apply_to(loaded.clone()), loaded);
    }
}
