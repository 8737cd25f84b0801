//! Table types shared by every pipeline stage, backed by polars frames.

use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;

use crate::error::{PipelineError, Result};

/// Key column holding the region name.
pub const REGION: &str = "region";
/// Key column holding the district number.
pub const DISTRICT: &str = "district";

/// Composite join key: region name plus district number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistrictKey {
    pub region: String,
    pub district: u32,
}

impl DistrictKey {
    pub fn new(region: impl Into<String>, district: u32) -> Self {
        Self {
            region: region.into(),
            district,
        }
    }
}

/// Canonical display form, e.g. `Ohio 01`.
impl fmt::Display for DistrictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}", self.region, self.district)
    }
}

/// Looks up `name` in `frame`, reporting schema drift as [`PipelineError::MissingColumn`].
pub(crate) fn require_column<'a>(frame: &'a DataFrame, table: &str, name: &str) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| PipelineError::missing_column(table, name))
}

/// One input file as read: every column is text, blank fields are null.
#[derive(Debug, Clone)]
pub struct RawTopicTable {
    pub source: String,
    pub frame: DataFrame,
}

impl RawTopicTable {
    /// Builds the text frame from a header line and its records.
    /// Short records are padded with nulls, long ones are cut to the header width.
    pub fn from_records(source: &str, headers: &[String], rows: &[Vec<String>]) -> Result<Self> {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<Option<&str>> = rows
                    .iter()
                    .map(|row| {
                        row.get(i)
                            .map(String::as_str)
                            .filter(|v| !v.trim().is_empty())
                    })
                    .collect();
                Column::new(name.as_str().into(), values)
            })
            .collect::<Vec<_>>();

        Ok(Self {
            source: source.to_string(),
            frame: DataFrame::new(columns)?,
        })
    }

    pub fn headers(&self) -> Vec<String> {
        self.frame
            .get_column_names_str()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        require_column(&self.frame, &self.source, name)
    }

    /// Text values of one column, in row order.
    pub fn values(&self, name: &str) -> Result<Vec<Option<&str>>> {
        Ok(self.require_column(name)?.str()?.into_iter().collect())
    }
}

/// A frame with exactly one row per [`DistrictKey`].
///
/// The key lives in the [`REGION`] and [`DISTRICT`] columns; every other
/// column is a metric. Used for cleaned topic tables, joined tables and the
/// finalized summary.
#[derive(Debug, Clone)]
pub struct DistrictTable {
    pub name: String,
    frame: DataFrame,
}

impl PartialEq for DistrictTable {
    fn eq(&self, other: &Self) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}

impl DistrictTable {
    /// Wraps `frame` after checking the key columns and key uniqueness.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MissingColumn`] without key columns,
    /// [`PipelineError::DuplicateDistrict`] when a district occurs twice.
    pub fn from_frame(name: impl Into<String>, frame: DataFrame) -> Result<Self> {
        let table = Self {
            name: name.into(),
            frame,
        };

        let mut seen = HashSet::new();
        for key in table.keys()? {
            if !seen.insert(key.clone()) {
                return Err(PipelineError::DuplicateDistrict {
                    table: table.name,
                    district: key.to_string(),
                });
            }
        }

        Ok(table)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub(crate) fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Metric column names in frame order, key columns excluded.
    pub fn columns(&self) -> Vec<&str> {
        self.frame
            .get_column_names_str()
            .into_iter()
            .filter(|c| *c != REGION && *c != DISTRICT)
            .collect()
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        require_column(&self.frame, &self.name, name)
    }

    /// District keys in row order.
    pub fn keys(&self) -> Result<Vec<DistrictKey>> {
        let regions = self.require_column(REGION)?.str()?;
        let districts = self.require_column(DISTRICT)?.u32()?;

        Ok(regions
            .into_iter()
            .zip(districts)
            .filter_map(|(region, district)| Some(DistrictKey::new(region?, district?)))
            .collect())
    }

    /// Orders rows by region, then district number.
    pub fn sort_by_key(&mut self) -> Result<()> {
        self.frame = self.frame.sort(
            [REGION, DISTRICT],
            SortMultipleOptions::default().with_maintain_order(true),
        )?;
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            self.require_column(name)?;
        }
        let remaining: Vec<String> = self
            .frame
            .get_column_names_str()
            .into_iter()
            .filter(|c| !names.iter().any(|n| n == c))
            .map(str::to_string)
            .collect();
        self.frame = self.frame.select(remaining)?;
        Ok(())
    }

    /// Builds a new table holding the key plus `columns` in that order.
    pub fn project(&self, columns: &[String]) -> Result<DistrictTable> {
        for column in columns {
            self.require_column(column)?;
        }
        let selection = [REGION, DISTRICT]
            .into_iter()
            .map(str::to_string)
            .chain(columns.iter().cloned());

        Ok(Self {
            name: self.name.clone(),
            frame: self.frame.select(selection)?,
        })
    }
}

#[cfg(test)]
impl DistrictTable {
    /// Numeric table with one `Option<f64>` per column in every row.
    pub(crate) fn from_numbers(
        name: &str,
        columns: &[&str],
        rows: &[(DistrictKey, Vec<Option<f64>>)],
    ) -> Self {
        let mut frame_columns = vec![
            Column::new(
                REGION.into(),
                rows.iter().map(|(k, _)| k.region.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                DISTRICT.into(),
                rows.iter().map(|(k, _)| k.district).collect::<Vec<_>>(),
            ),
        ];
        for (i, column) in columns.iter().enumerate() {
            let values: Vec<Option<f64>> = rows.iter().map(|(_, v)| v[i]).collect();
            frame_columns.push(Column::new((*column).into(), values));
        }
        Self::from_frame(name, DataFrame::new(frame_columns).unwrap()).unwrap()
    }

    pub(crate) fn number(&self, key: &DistrictKey, column: &str) -> Option<f64> {
        let row = self.keys().unwrap().iter().position(|k| k == key)?;
        self.frame.column(column).ok()?.f64().ok()?.get(row)
    }
}
