use std::{fmt, str::FromStr};

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::field;

/// Taxpayer and broker details sent alongside the statement.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub tax_year: i32,
    pub broker_name: String,
    pub account_number: String,
    pub taxpayer_name: String,
    pub taxpayer_sin: String,
}

impl FormFields {
    pub fn new(tax_year: i32) -> Self {
        Self {
            tax_year,
            broker_name: String::new(),
            account_number: String::new(),
            taxpayer_name: String::new(),
            taxpayer_sin: String::new(),
        }
    }

    /// Returns a copy with exactly one member replaced.
    pub fn with_update(mut self, update: FieldUpdate) -> Self {
        match update {
            FieldUpdate::TaxYear(value) => self.tax_year = value,
            FieldUpdate::BrokerName(value) => self.broker_name = value,
            FieldUpdate::AccountNumber(value) => self.account_number = value,
            FieldUpdate::TaxpayerName(value) => self.taxpayer_name = value,
            FieldUpdate::TaxpayerSin(value) => self.taxpayer_sin = value,
        }
        self
    }
}

impl Default for FormFields {
    fn default() -> Self {
        Self::new(default_tax_year())
    }
}

// Account number and SIN stay out of logs.
impl fmt::Debug for FormFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFields")
            .field("tax_year", &self.tax_year)
            .field("broker_name", &self.broker_name)
            .field("account_number", &redacted(&self.account_number))
            .field("taxpayer_name", &self.taxpayer_name)
            .field("taxpayer_sin", &redacted(&self.taxpayer_sin))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// The statements being filed cover the year that just ended.
pub fn default_tax_year() -> i32 {
    Local::now().year() - 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    TaxYear,
    BrokerName,
    AccountNumber,
    TaxpayerName,
    TaxpayerSin,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::TaxYear,
        FieldName::BrokerName,
        FieldName::AccountNumber,
        FieldName::TaxpayerName,
        FieldName::TaxpayerSin,
    ];

    /// Multipart part name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldName::TaxYear => field::TAX_YEAR,
            FieldName::BrokerName => field::BROKER_NAME,
            FieldName::AccountNumber => field::ACCOUNT_NUMBER,
            FieldName::TaxpayerName => field::TAXPAYER_NAME,
            FieldName::TaxpayerSin => field::TAXPAYER_SIN,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldName::TaxYear => "Tax Year",
            FieldName::BrokerName => "Broker Name",
            FieldName::AccountNumber => "Account Number",
            FieldName::TaxpayerName => "Taxpayer Name",
            FieldName::TaxpayerSin => "Taxpayer SIN",
        }
    }
}

impl FromStr for FieldName {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|name| name.wire_name() == raw)
            .ok_or_else(|| FieldError::UnknownField(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    TaxYear(i32),
    BrokerName(String),
    AccountNumber(String),
    TaxpayerName(String),
    TaxpayerSin(String),
}

impl FieldUpdate {
    /// Builds an update from a field identifier and its textual value.
    pub fn parse(name: FieldName, value: &str) -> Result<Self, FieldError> {
        Ok(match name {
            FieldName::TaxYear => {
                let year = value
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| FieldError::InvalidTaxYear(value.to_string()))?;
                FieldUpdate::TaxYear(year)
            }
            FieldName::BrokerName => FieldUpdate::BrokerName(value.to_string()),
            FieldName::AccountNumber => FieldUpdate::AccountNumber(value.to_string()),
            FieldName::TaxpayerName => FieldUpdate::TaxpayerName(value.to_string()),
            FieldName::TaxpayerSin => FieldUpdate::TaxpayerSin(value.to_string()),
        })
    }

    pub fn field(&self) -> FieldName {
        match self {
            FieldUpdate::TaxYear(_) => FieldName::TaxYear,
            FieldUpdate::BrokerName(_) => FieldName::BrokerName,
            FieldUpdate::AccountNumber(_) => FieldName::AccountNumber,
            FieldUpdate::TaxpayerName(_) => FieldName::TaxpayerName,
            FieldUpdate::TaxpayerSin(_) => FieldName::TaxpayerSin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown form field '{0}'")]
    UnknownField(String),
    #[error("tax year must be a whole number, got '{0}'")]
    InvalidTaxYear(String),
}

/// A statement chosen by the user. The content is not inspected locally.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for StatementFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementFile")
            .field("file_name", &self.file_name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> FormFields {
        FormFields {
            tax_year: 2023,
            broker_name: "Avanza".to_string(),
            account_number: "12-345".to_string(),
            taxpayer_name: "Alex Doe".to_string(),
            taxpayer_sin: "046 454 286".to_string(),
        }
    }

    #[test]
    fn update_changes_only_the_targeted_field() {
        let before = filled();

        let after = before
            .clone()
            .with_update(FieldUpdate::BrokerName("Nordnet".to_string()));
        assert_eq!(after.broker_name, "Nordnet");
        assert_eq!(after.tax_year, before.tax_year);
        assert_eq!(after.account_number, before.account_number);
        assert_eq!(after.taxpayer_name, before.taxpayer_name);
        assert_eq!(after.taxpayer_sin, before.taxpayer_sin);

        let after = before.clone().with_update(FieldUpdate::TaxYear(2024));
        assert_eq!(
            after,
            FormFields {
                tax_year: 2024,
                ..before
            }
        );
    }

    #[test]
    fn default_tax_year_is_previous_calendar_year() {
        assert_eq!(FormFields::default().tax_year, Local::now().year() - 1);
        assert!(FormFields::default().broker_name.is_empty());
    }

    #[test]
    fn parses_field_names_from_wire_identifiers() {
        assert_eq!("tax_year".parse::<FieldName>(), Ok(FieldName::TaxYear));
        assert_eq!(
            "taxpayer_sin".parse::<FieldName>(),
            Ok(FieldName::TaxpayerSin)
        );
        assert_eq!(
            "file".parse::<FieldName>(),
            Err(FieldError::UnknownField("file".to_string()))
        );
    }

    #[test]
    fn tax_year_update_requires_an_integer() {
        assert_eq!(
            FieldUpdate::parse(FieldName::TaxYear, " 2022 "),
            Ok(FieldUpdate::TaxYear(2022))
        );
        assert_eq!(
            FieldUpdate::parse(FieldName::TaxYear, "last year"),
            Err(FieldError::InvalidTaxYear("last year".to_string()))
        );
        assert_eq!(
            FieldUpdate::parse(FieldName::TaxpayerName, " kept as typed "),
            Ok(FieldUpdate::TaxpayerName(" kept as typed ".to_string()))
        );
    }

    #[test]
    fn debug_output_redacts_identifiers() {
        let rendered = format!("{:?}", filled());
        assert!(!rendered.contains("046 454 286"));
        assert!(!rendered.contains("12-345"));
        assert!(rendered.contains("Avanza"));

        let file = StatementFile::new("statement.pdf", vec![0; 2048]);
        assert_eq!(
            format!("{file:?}"),
            "StatementFile { file_name: \"statement.pdf\", size_bytes: 2048 }"
        );
    }
}
