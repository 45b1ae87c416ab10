use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const SETTINGS_FILE: &str = "k4filler.toml";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
/// Five minutes, enough for the service to analyse a long statement.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    /// Where `filled_k4.pdf` is written. Front ends choose their own fallback.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            output_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid server url '{url}': {source}")]
    InvalidServerUrl { url: String, source: url::ParseError },
    #[error("server url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("invalid request timeout '{0}': expected whole seconds")]
    InvalidTimeout(String),
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
    #[error("request timeout of {0}s exceeds the {max}s limit", max = MAX_REQUEST_TIMEOUT_SECS)]
    TimeoutTooLarge(u64),
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn parsed_server_url(&self) -> Result<Url, SettingsError> {
        let url = Url::parse(self.server_url.trim()).map_err(|source| {
            SettingsError::InvalidServerUrl {
                url: self.server_url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::UnsupportedScheme(self.server_url.clone()));
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.parsed_server_url()?;
        match self.request_timeout_secs {
            0 => return Err(SettingsError::ZeroTimeout),
            secs if secs > MAX_REQUEST_TIMEOUT_SECS => {
                return Err(SettingsError::TimeoutTooLarge(secs))
            }
            _ => {}
        }
        Ok(())
    }
}

/// Loads settings from `k4filler.toml` in the working directory and the
/// process environment.
pub fn load_settings() -> Result<Settings, SettingsError> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Layers defaults, the optional settings file and environment lookups, in
/// that order. A missing file is not an error.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings =
                toml::from_str(&raw).map_err(|source| SettingsError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            if let Some(v) = file_cfg.server_url {
                settings.server_url = v;
            }
            if let Some(v) = file_cfg.request_timeout_secs {
                settings.request_timeout_secs = v;
            }
            if let Some(v) = file_cfg.output_dir {
                settings.output_dir = Some(v);
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    if let Some(v) = env("K4FILLER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    for key in ["K4FILLER_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"] {
        if let Some(v) = env(key) {
            settings.request_timeout_secs = v
                .trim()
                .parse::<u64>()
                .map_err(|_| SettingsError::InvalidTimeout(v.clone()))?;
        }
    }

    if let Some(v) = env("K4FILLER_OUTPUT_DIR") {
        settings.output_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__OUTPUT_DIR") {
        settings.output_dir = Some(PathBuf::from(v));
    }

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
