//! Error handling for the budget pipeline
//!
//! This module provides:
//! - Stable error codes with categories for log correlation
//! - The fatal `SchemaError` raised before any aggregation runs
//! - Non-fatal `Notice` values that travel with datasets and views
//! - Context helpers for foreign errors

use crate::analysis::schema::LogicalColumn;
use crate::model::Theme;
use anyhow::{Context as _, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// A required logical column could not be resolved
    SchemaError = 1001,
    /// Dataset file missing or not a file
    DatasetNotFound = 1002,
    /// Dataset extension not in the allowed list
    UnsupportedFormat = 1003,
    /// Requested sheet absent, or the workbook has no sheets
    SheetNotFound = 1004,
    /// Workbook bytes could not be parsed
    WorkbookParse = 1005,
    /// Filesystem failure while reading the dataset
    IoError = 1006,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::SchemaError => "schema_error",
            ErrorCode::DatasetNotFound | ErrorCode::SheetNotFound => "resource_not_found",
            ErrorCode::UnsupportedFormat | ErrorCode::WorkbookParse => "format_error",
            ErrorCode::IoError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// FATAL ERRORS
// =============================================================================

/// A required column is absent under every known alias.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "required {column} column not found (tried: {}; dataset columns: {})",
    .tried.join(", "),
    .available.join(", ")
)]
pub struct SchemaError {
    pub column: LogicalColumn,
    pub tried: Vec<String>,
    pub available: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("dataset {path:?} does not exist or is not a file")]
    DatasetNotFound { path: PathBuf },

    #[error("dataset {path:?} has unsupported extension '{extension}'")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound { sheet: String, available: Vec<String> },

    #[error("failed to parse workbook {path:?}: {message}")]
    WorkbookParse { path: PathBuf, message: String },

    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BudgetError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BudgetError::Schema(_) => ErrorCode::SchemaError,
            BudgetError::DatasetNotFound { .. } => ErrorCode::DatasetNotFound,
            BudgetError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            BudgetError::SheetNotFound { .. } => ErrorCode::SheetNotFound,
            BudgetError::WorkbookParse { .. } => ErrorCode::WorkbookParse,
            BudgetError::Io { .. } => ErrorCode::IoError,
        }
    }

    /// Whether the failure stops the view before any aggregation.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, BudgetError::Schema(_))
    }
}

pub type BudgetResult<T> = std::result::Result<T, BudgetError>;

// =============================================================================
// NON-FATAL NOTICES
// =============================================================================

/// Condition the pipeline recovered from; rendered as a warning next to the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    MissingOptionalColumn {
        column: LogicalColumn,
        effect: String,
    },
    YearColumnFallback {
        column: String,
    },
    SkippedRows {
        count: usize,
        reason: String,
    },
    InvalidAllocations {
        count: usize,
    },
    TotalMismatch {
        year: String,
        theme: Theme,
        declared: Decimal,
        computed: Decimal,
    },
    EmptySelection {
        year: String,
        selection: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingOptionalColumn { column, effect } => {
                write!(f, "no {column} column found; {effect}")
            }
            Notice::YearColumnFallback { column } => {
                write!(f, "no 'Year' column found; using first column '{column}' as year")
            }
            Notice::SkippedRows { count, reason } => write!(f, "skipped {count} row(s): {reason}"),
            Notice::InvalidAllocations { count } => write!(
                f,
                "{count} allocation value(s) were negative, unreadable or out of range and count as 0"
            ),
            Notice::TotalMismatch {
                year,
                theme,
                declared,
                computed,
            } => write!(
                f,
                "{theme} {year}: declared total {declared} differs from computed total {computed}"
            ),
            Notice::EmptySelection { year, selection } => {
                write!(f, "no rows match {selection} for {year}")
            }
        }
    }
}

// =============================================================================
// CONTEXT HELPERS
// =============================================================================

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add operation context
    fn with_operation(self, operation: &str) -> Result<T>;

    /// Add dataset context
    fn with_dataset(self, path: &Path) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_operation(self, operation: &str) -> Result<T> {
        self.with_context(|| format!("Operation '{}' failed", operation))
    }

    fn with_dataset(self, path: &Path) -> Result<T> {
        self.with_context(|| format!("Error in dataset {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_message_names_column_and_aliases() {
        let error = SchemaError {
            column: LogicalColumn::SubTheme,
            tried: vec!["Sub_Theme".into(), "Sub_Sector".into()],
            available: vec!["Year".into(), "Amount".into()],
        };
        let message = error.to_string();
        assert!(message.contains("sub-theme"));
        assert!(message.contains("Sub_Theme, Sub_Sector"));
        assert!(message.contains("Year, Amount"));
    }

    #[test]
    fn budget_error_codes_and_categories() {
        let error = BudgetError::DatasetNotFound {
            path: PathBuf::from("missing.xlsx"),
        };
        assert_eq!(error.code(), ErrorCode::DatasetNotFound);
        assert_eq!(error.code().category(), "resource_not_found");
        assert_eq!(ErrorCode::SchemaError.code(), 1001);
        assert!(!error.is_schema_error());
    }

    #[test]
    fn notices_serialize_with_kind_tag() {
        let notice = Notice::InvalidAllocations { count: 2 };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "invalid_allocations");
        assert_eq!(json["count"], 2);
    }
}
