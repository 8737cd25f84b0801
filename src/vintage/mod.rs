//! Per-vintage pipelines: read every topic, clean, derive, join, finalize.

pub mod spec;
pub mod y2018;
pub mod y2023;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::Result;
use crate::output::{log_preview, write_summary};
use crate::pipeline::{
    DistrictSummary, apply_derivation, coerce_numeric, finalize, join_on_district_key,
    load_topic_table, pivot_metrics, read_raw_file,
};
use crate::table::DistrictTable;

pub use spec::{TableLayout, TopicSpec, VintageSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vintage {
    Y2018,
    Y2023,
}

impl Vintage {
    pub const ALL: [Vintage; 2] = [Vintage::Y2018, Vintage::Y2023];

    /// Built-in configuration for this vintage.
    pub fn spec(self) -> VintageSpec {
        match self {
            Vintage::Y2018 => y2018::spec(),
            Vintage::Y2023 => y2023::spec(),
        }
    }

    /// Environment variable overriding the input directory.
    pub fn data_dir_var(self) -> &'static str {
        match self {
            Vintage::Y2018 => "CD_DATA_2018",
            Vintage::Y2023 => "CD_DATA_2023",
        }
    }
}

impl fmt::Display for Vintage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vintage::Y2018 => f.write_str("2018"),
            Vintage::Y2023 => f.write_str("2023"),
        }
    }
}

impl FromStr for Vintage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "2018" => Ok(Vintage::Y2018),
            "2023" => Ok(Vintage::Y2023),
            other => Err(format!("unknown vintage '{other}', expected 2018 or 2023")),
        }
    }
}

/// Reads and cleans one topic file into a table of numeric metrics.
///
/// The count of values that were not numbers is recorded on the span as `unparsable`.
#[tracing::instrument(
    skip_all,
    fields(vintage = %spec.name, topic = %topic.name, unparsable = tracing::field::Empty)
)]
pub fn build_topic(spec: &VintageSpec, topic: &TopicSpec, input_dir: &Path) -> Result<DistrictTable> {
    let path = input_dir.join(&topic.file);
    let raw = read_raw_file(&path, topic.header_row_offset, &topic.skip_rows)?;

    let raw = match &topic.layout {
        TableLayout::Rows => raw,
        TableLayout::Wide { title_column } => {
            pivot_metrics(&raw, title_column, &spec.keys.district_column)?
        }
    };

    let mut table = load_topic_table(
        &raw,
        &topic.rename,
        &topic.keep,
        &spec.keys,
        spec.region_allowlist.as_deref(),
    )?;
    table.name = topic.name.clone();

    let unparsable = coerce_numeric(&mut table, &topic.keep, &spec.coercion)?;
    tracing::Span::current().record("unparsable", unparsable as u64);
    if unparsable > 0 {
        warn!(unparsable, "Unparsable values treated as missing");
    }

    for derived in &topic.derive {
        apply_derivation(&mut table, derived)?;
    }
    if !topic.drop.is_empty() {
        table.drop_columns(&topic.drop)?;
    }

    Ok(table)
}

/// Runs every stage for `spec`, reading topic files from `input_dir`.
#[tracing::instrument(skip_all, fields(vintage = %spec.name))]
pub fn build_summary(spec: &VintageSpec, input_dir: &Path) -> Result<DistrictSummary> {
    let topics = spec
        .topics
        .iter()
        .map(|topic| build_topic(spec, topic, input_dir))
        .collect::<Result<Vec<_>>>()?;

    let mut joined = join_on_district_key(&topics)?;
    for derived in &spec.derive {
        apply_derivation(&mut joined, derived)?;
    }
    if spec.sort_by_district {
        joined.sort_by_key()?;
    }

    let table = finalize(&joined, &spec.output_columns, spec.rounding_digits)?;
    info!(districts = table.len(), "District summary built");

    Ok(DistrictSummary::new(
        spec.id_column.clone(),
        table,
        spec.rounding_digits,
    ))
}

/// Builds the summary and writes it to `output`. Nothing is written on failure.
pub fn run(spec: &VintageSpec, input_dir: &Path, output: &Path) -> Result<DistrictSummary> {
    let summary = build_summary(spec, input_dir)?;
    log_preview(&summary, 3)?;
    write_summary(output, &summary)?;
    Ok(summary)
}
