//! Error taxonomy for the mapping engine.
//!
//! Dataset-scoped errors (`UnrecognizedCategory`, `HeaderNotFound`,
//! `DateColumnNotFound`, read failures) abort a single dataset; the pipeline
//! degrades that dataset's columns to `N.A.`. Run-scoped errors
//! (`TemplateMismatch`, `InvalidTemplate`, `NoPeriods`) abort the whole run
//! before anything is written.

use thiserror::Error;

/// Shape of a matrix as (rows, columns), header rows included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

fn column_label(column: &Option<usize>) -> String {
    column.map_or_else(|| "none".to_string(), |c| c.to_string())
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("unrecognized category for dataset '{identity}'")]
    UnrecognizedCategory { identity: String },

    #[error("no Korean header row in the first {scanned} rows of '{dataset}'")]
    HeaderNotFound { dataset: String, scanned: usize },

    #[error("dataset '{dropped}' duplicates category {category} already supplied by '{kept}'")]
    DuplicateCategory {
        category: String,
        kept: String,
        dropped: String,
    },

    #[error("header found at row {header_row} of '{dataset}' but no column holds YYYY-MM periods")]
    DateColumnNotFound { dataset: String, header_row: usize },

    #[error(
        "template mismatch: expected {expected}, got {actual}, first diverging column {}",
        column_label(.first_diverging_column)
    )]
    TemplateMismatch {
        expected: Shape,
        actual: Shape,
        /// 1-based column index, Date column included.
        first_diverging_column: Option<usize>,
    },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("no periods available to anchor the output window")]
    NoPeriods,

    #[error("invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("failed to read workbook '{dataset}': {source}")]
    Workbook {
        dataset: String,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook '{0}' has no sheets")]
    EmptyWorkbook(String),

    #[error("workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapError {
    /// Whether this error only invalidates one dataset rather than the run.
    pub fn is_dataset_scoped(&self) -> bool {
        matches!(
            self,
            MapError::UnrecognizedCategory { .. }
                | MapError::DuplicateCategory { .. }
                | MapError::HeaderNotFound { .. }
                | MapError::DateColumnNotFound { .. }
                | MapError::Workbook { .. }
                | MapError::EmptyWorkbook(_)
                | MapError::Csv(_)
                | MapError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
