use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::table::DistrictTable;

pub const DEFAULT_ROUNDING_DIGITS: u32 = 1;
/// More decimals than an `f64` can hold; configurations above this are rejected.
pub const MAX_ROUNDING_DIGITS: u32 = 15;

/// Rounds half to even at `digits` decimal places, at most [`MAX_ROUNDING_DIGITS`].
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(MAX_ROUNDING_DIGITS) as i32);
    (value * factor).round_ties_even() / factor
}

/// Projects `table` to `column_order` and rounds every numeric column.
///
/// Applying it to its own output with the same arguments changes nothing.
#[tracing::instrument(skip_all, fields(table = %table.name, digits = rounding_digits))]
pub fn finalize(
    table: &DistrictTable,
    column_order: &[String],
    rounding_digits: u32,
) -> Result<DistrictTable> {
    let mut out = table.project(column_order)?;
    for name in column_order {
        let column = out.require_column(name)?;
        if column.dtype() == &DataType::String {
            continue;
        }
        let numbers = column.cast(&DataType::Float64)?;
        let rounded = numbers
            .f64()?
            .apply_values(move |v| round_to(v, rounding_digits));
        out.frame_mut().replace(name, rounded.into_series())?;
    }
    debug!(rows = out.len(), columns = column_order.len(), "Table finalized");
    Ok(out)
}

/// The finished per-district table, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictSummary {
    /// Header of the leading district identifier column, e.g. `CD116`.
    pub id_column: String,
    pub rounding_digits: u32,
    pub table: DistrictTable,
}

impl DistrictSummary {
    pub fn new(id_column: impl Into<String>, table: DistrictTable, rounding_digits: u32) -> Self {
        Self {
            id_column: id_column.into(),
            rounding_digits,
            table,
        }
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.id_column.clone())
            .chain(self.table.columns().into_iter().map(str::to_string))
            .collect()
    }

    /// Rows as output strings: canonical district id first, missing values blank.
    pub fn records(&self) -> Result<Vec<Vec<String>>> {
        let mut records: Vec<Vec<String>> = self
            .table
            .keys()?
            .iter()
            .map(|key| vec![key.to_string()])
            .collect();

        let digits = self.rounding_digits as usize;
        for name in self.table.columns() {
            let column = self.table.require_column(name)?;
            if column.dtype() == &DataType::String {
                for (record, text) in records.iter_mut().zip(column.str()?) {
                    record.push(text.unwrap_or_default().to_string());
                }
            } else {
                let numbers = column.cast(&DataType::Float64)?;
                for (record, value) in records.iter_mut().zip(numbers.f64()?) {
                    record.push(value.map(|v| format!("{v:.digits$}")).unwrap_or_default());
                }
            }
        }

        Ok(records)
    }
}
