//! Miette diagnostics for CLI error presentation.
//!
//! Config parse errors point into the file; fulfillment errors carry their
//! stable code and a hint for the operator.

use std::fmt::Display;
use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, Error, FulfillmentError};

/// Configuration error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(arbfill::config))]
pub struct ConfigDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub help: Option<String>,
}

/// Any other command failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandDiagnostic {
    pub code: &'static str,
    pub message: String,
    pub help: Option<&'static str>,
}

impl Diagnostic for CommandDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(format!("arbfill::{}", self.code.to_ascii_lowercase())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help.map(|h| Box::new(h) as Box<dyn Display + 'a>)
    }
}

/// Render `err` for the terminal, reading `config_path` for parse errors.
#[must_use]
pub fn report(err: Error, config_path: &Path) -> miette::Report {
    match err {
        Error::Config(ConfigError::Parse(parse)) => {
            let src = std::fs::read_to_string(config_path).unwrap_or_default();
            let span = parse
                .span()
                .map(|range| SourceSpan::from((range.start, range.len())));
            miette::Report::new(ConfigDiagnostic {
                message: format!("invalid configuration: {}", parse.message()),
                src: NamedSource::new(config_path.display().to_string(), src),
                span,
                help: Some("see config.example.toml for every section and its defaults".into()),
            })
        }
        Error::Fulfillment(err) => miette::Report::new(CommandDiagnostic {
            code: err.code(),
            help: fulfillment_help(&err),
            message: err.to_string(),
        }),
        other => miette::Report::new(CommandDiagnostic {
            code: "ERROR",
            message: other.to_string(),
            help: None,
        }),
    }
}

fn fulfillment_help(err: &FulfillmentError) -> Option<&'static str> {
    match err.code() {
        "ALREADY_PROCESSING" => Some(
            "another worker holds this transaction; if it is stuck, `arbfill refund` finishes a \
             REFUND_PENDING refund and `arbfill fail` releases a PROCESSING claim",
        ),
        "QUEUE_UNAVAILABLE" | "CATALOG_UNAVAILABLE" => {
            Some("nothing was charged; the transaction is PENDING again and can be retried")
        }
        "TASK_ALREADY_COMPLETED" => Some("the task was already closed; see `arbfill queue view`"),
        "TASK_CANCELLED" => Some("the sale was refunded; do not deliver"),
        "REFUND_FAILED" => Some("the buyer was not refunded; resolve with the payment processor"),
        "WRONG_STATE" | "ALREADY_TERMINAL" => Some("see `arbfill status` for the current state"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransactionId, TransactionState};

    #[test]
    fn fulfillment_errors_keep_their_code() {
        let err = Error::Fulfillment(FulfillmentError::AlreadyProcessing {
            id: TransactionId::new(),
            state: TransactionState::Processing,
        });
        let report = report(err, Path::new("absent.toml"));
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("arbfill::already_processing"));
        assert!(report.help().is_some());
    }

    #[test]
    fn parse_errors_point_into_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sla]\nthreshold_hours = \"soon\"\n").unwrap();
        let err = crate::infrastructure::config::settings::Config::load(&path).unwrap_err();

        let report = report(err, &path);
        assert_eq!(report.code().map(|c| c.to_string()).as_deref(), Some("arbfill::config"));
        assert!(report.labels().is_some());
    }
}
