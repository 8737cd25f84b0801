//! Declarative description of one vintage's inputs, cleaning and output.
//!
//! The built-in specs live in [`super::y2018`] and [`super::y2023`]; either
//! can be replaced by a JSON file of the same shape:
//!
//! ```json
//! {
//!   "name": "2018",
//!   "id_column": "CD116",
//!   "input_dir": "data_2018/demographic_data",
//!   "output_file": "data_2018/cd_2018.csv",
//!   "keys": { "region": { "column": "State name" }, "district_column": "Congressional district" },
//!   "region_allowlist": ["Ohio", "Indiana"],
//!   "topics": [
//!     {
//!       "name": "turnout",
//!       "file": "voter_turnout_2018.csv",
//!       "header_row_offset": 2,
//!       "skip_rows": [3, 4],
//!       "rename": { "Voting rate3": "Voting rate" },
//!       "keep": ["Voting rate"]
//!     }
//!   ],
//!   "output_columns": ["Voting rate"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pipeline::finalize::{DEFAULT_ROUNDING_DIGITS, MAX_ROUNDING_DIGITS};
use crate::pipeline::{CoercionRules, DerivedColumn, KeyColumns};

/// Shape of an input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableLayout {
    /// One row per district.
    #[default]
    Rows,
    /// One row per metric named in `title_column`, one column per district.
    Wide { title_column: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    /// File name relative to the vintage input directory.
    pub file: String,
    #[serde(default)]
    pub header_row_offset: usize,
    #[serde(default)]
    pub skip_rows: Vec<usize>,
    #[serde(default)]
    pub layout: TableLayout,
    /// Raw header -> canonical name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Canonical metric columns retained (key columns are implied).
    pub keep: Vec<String>,
    /// Applied in order after numeric coercion.
    #[serde(default)]
    pub derive: Vec<DerivedColumn>,
    /// Removed after the derivations.
    #[serde(default)]
    pub drop: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VintageSpec {
    pub name: String,
    /// Header of the district identifier column in the output.
    pub id_column: String,
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
    pub keys: KeyColumns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_allowlist: Option<Vec<String>>,
    #[serde(default)]
    pub coercion: CoercionRules,
    pub topics: Vec<TopicSpec>,
    /// Applied in order to the joined table.
    #[serde(default)]
    pub derive: Vec<DerivedColumn>,
    pub output_columns: Vec<String>,
    #[serde(default = "default_rounding_digits")]
    pub rounding_digits: u32,
    /// Order output rows by district key instead of source order.
    #[serde(default)]
    pub sort_by_district: bool,
}

fn default_rounding_digits() -> u32 {
    DEFAULT_ROUNDING_DIGITS
}

impl VintageSpec {
    /// Loads a spec from a JSON file at `path` and checks it with [`Self::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec: Self = serde_json::from_str(&content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Rejects settings no input could satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.rounding_digits > MAX_ROUNDING_DIGITS {
            return Err(PipelineError::InvalidConfig(format!(
                "rounding_digits is {}, at most {MAX_ROUNDING_DIGITS} is supported",
                self.rounding_digits
            )));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
