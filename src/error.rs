//! Error taxonomy for the district pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// An expected column is absent, usually schema drift in a source file.
    #[error("missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("cannot convert '{value}' in column '{column}' of {table}: {reason}")]
    TypeConversion {
        table: String,
        column: String,
        value: String,
        reason: String,
    },

    /// Inner join kept nothing; the topic tables disagree on district keys.
    #[error("join of {tables} produced no rows")]
    JoinEmptyResult { tables: String },

    #[error("district {district} appears more than once in {table}")]
    DuplicateDistrict { table: String, district: String },

    #[error("metric '{title}' appears more than once in {table}")]
    DuplicateMetric { table: String, title: String },

    #[error("column '{column}' is present in both {left} and {right}")]
    ColumnConflict {
        column: String,
        left: String,
        right: String,
    },

    #[error("cannot derive '{column}': {reason}")]
    InvalidDerivation { column: String, reason: String },

    #[error("invalid district pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn type_conversion(table: &str, column: &str, value: &str, reason: &str) -> Self {
        Self::TypeConversion {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
