//! Failure taxonomy for the import wizard

use thiserror::Error;

/// Errors surfaced by the chart-of-accounts import flow.
///
/// Every variant is recovered where it occurs (notification plus the
/// wizard's `error` flag) and then handed back so a host can branch on it.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported file '{0}'. Upload an Excel (.xlsx, .xls) or CSV file")]
    FileValidation(String),

    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to parse file: {0}")]
    FileParse(String),

    #[error("The file contains no data")]
    EmptyFile,

    #[error("Failed to build filtered file: {0}")]
    ReEncode(String),

    #[error("Import failed: {0}")]
    Submission(String),

    #[error("Failed to apply template: {0}")]
    TemplateApply(String),

    #[error("Failed to check import progress: {0}")]
    Polling(String),

    #[error("Nothing selected to import: {0}")]
    MissingSelection(&'static str),
}
