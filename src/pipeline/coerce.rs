//! Lenient numeric coercion.
//!
//! Suppressed or unavailable statistics become missing, never zero.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::table::DistrictTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionRules {
    /// Placeholder strings meaning "no value", compared after trimming.
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,
    /// Stripped from the text before parsing, e.g. `,` in `12,345`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thousands_separator: Option<char>,
}

fn default_sentinels() -> Vec<String> {
    vec!["N".to_string()]
}

impl Default for CoercionRules {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
            thousands_separator: None,
        }
    }
}

impl CoercionRules {
    pub fn with_thousands_separator(mut self, sep: char) -> Self {
        self.thousands_separator = Some(sep);
        self
    }
}

const WHITESPACE: &str = " \t\r\n";

/// Text of `column` with blanks and sentinels nulled and separators stripped.
fn clean_text(column: &str, rules: &CoercionRules) -> Expr {
    let trimmed = col(column).str().strip_chars(lit(WHITESPACE));
    let is_missing = rules
        .sentinels
        .iter()
        .fold(trimmed.clone().eq(lit("")), |acc, sentinel| {
            acc.or(trimmed.clone().eq(lit(sentinel.as_str())))
        });
    let text = match rules.thousands_separator {
        Some(sep) => trimmed
            .str()
            .replace_all(lit(sep.to_string()), lit(""), true),
        None => trimmed,
    };

    when(is_missing)
        .then(lit(NULL).cast(DataType::String))
        .otherwise(text)
        .alias(column)
}

/// Lenient cast: anything that is not a finite number becomes null.
fn to_number(column: &str) -> Expr {
    let number = col(column).cast(DataType::Float64);
    when(number.clone().is_finite())
        .then(number)
        .otherwise(lit(NULL).cast(DataType::Float64))
        .alias(column)
}

/// Converts `columns` to `Float64` in place.
///
/// Blanks, sentinels and unparsable text become null. Returns the number of
/// non-sentinel values that could not be parsed.
#[tracing::instrument(skip_all, fields(table = %table.name))]
pub fn coerce_numeric(
    table: &mut DistrictTable,
    columns: &[String],
    rules: &CoercionRules,
) -> Result<usize> {
    let mut text_columns = Vec::new();
    for column in columns {
        if table.require_column(column)?.dtype() == &DataType::String {
            text_columns.push(column.as_str());
        }
    }

    if columns.is_empty() {
        return Ok(0);
    }

    let cleaned = table
        .frame()
        .clone()
        .lazy()
        .with_columns(text_columns.iter().map(|c| clean_text(c, rules)).collect::<Vec<_>>())
        .collect()?;
    let coerced = cleaned
        .clone()
        .lazy()
        .with_columns(columns.iter().map(|c| to_number(c)).collect::<Vec<_>>())
        .collect()?;

    let mut unparsable = 0usize;
    for column in &text_columns {
        let before = cleaned.column(column)?.null_count();
        let after = coerced.column(column)?.null_count();
        if after > before {
            debug!(column, count = after - before, "Unparsable values coerced to missing");
            unparsable += after - before;
        }
    }

    *table.frame_mut() = coerced;
    debug!(columns = columns.len(), unparsable, "Numeric coercion complete");
    Ok(unparsable)
}
