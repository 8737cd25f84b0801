//! Reading raw CSV extracts and cleaning them into per-district topic tables.

use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::{DISTRICT, DistrictTable, REGION, RawTopicTable, require_column};

/// Where the region half of a [`DistrictKey`] comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// Read from a (canonical, post-rename) column.
    Column(String),
    /// Every row belongs to the same region.
    Fixed(String),
}

/// Columns that together identify a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyColumns {
    pub region: RegionSource,
    pub district_column: String,
    /// Regex whose first capture group holds the district digits, e.g. `(\d+)` for `D07`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_pattern: Option<String>,
}

/// Opens `path` and reads it with [`read_raw_table`].
#[tracing::instrument(skip(path, skip_rows), fields(path = %path.display()))]
pub fn read_raw_file(
    path: &Path,
    header_row_offset: usize,
    skip_rows: &[usize],
) -> Result<RawTopicTable> {
    let file = File::open(path)?;
    read_raw_table(&path.display().to_string(), file, header_row_offset, skip_rows)
}

/// Reads every record of a CSV source without interpreting a header line.
///
/// `skip_rows` are zero-based record indices removed first; `header_row_offset`
/// then picks the header among the remaining records and everything above it
/// is discarded. Blank header cells become `Unnamed: <position>` and repeated
/// names get a `.1`, `.2`... suffix. Every column is loaded as text.
pub fn read_raw_table<R: Read>(
    source: &str,
    reader: R,
    header_row_offset: usize,
    skip_rows: &[usize],
) -> Result<RawTopicTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let skip: HashSet<usize> = skip_rows.iter().copied().collect();
    let mut records = Vec::new();
    for (i, result) in rdr.byte_records().enumerate() {
        let record = result?;
        if skip.contains(&i) {
            continue;
        }
        records.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect::<Vec<_>>(),
        );
    }

    let mut records = records.into_iter().skip(header_row_offset);
    let headers = match records.next() {
        Some(raw_headers) => normalize_headers(raw_headers),
        None => Vec::new(),
    };
    let rows: Vec<Vec<String>> = records.collect();

    debug!(source, columns = headers.len(), rows = rows.len(), "Raw table read");

    RawTopicTable::from_records(source, &headers, &rows)
}

fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// Cleans one raw table into a [`DistrictTable`].
///
/// Renames headers, drops rows whose region is outside `region_allowlist`
/// (when given), projects to `keep_columns` and derives the district key.
/// Values stay textual; see [`coerce_numeric`](super::coerce::coerce_numeric).
///
/// # Errors
///
/// [`PipelineError::MissingColumn`] if a key or kept column is absent,
/// [`PipelineError::TypeConversion`] if a kept row's district number is not a
/// non-negative integer, [`PipelineError::InvalidPattern`] for a bad
/// district pattern and [`PipelineError::DuplicateDistrict`] when a district
/// occurs twice.
#[tracing::instrument(skip_all, fields(table = %raw.source))]
pub fn load_topic_table(
    raw: &RawTopicTable,
    rename_map: &BTreeMap<String, String>,
    keep_columns: &[String],
    keys: &KeyColumns,
    region_allowlist: Option<&[String]>,
) -> Result<DistrictTable> {
    let mut frame = raw.frame.clone();
    let renamed: Vec<String> = frame
        .get_column_names_str()
        .into_iter()
        .map(|h| rename_map.get(h).cloned().unwrap_or_else(|| h.to_string()))
        .collect();
    frame.set_column_names(renamed)?;

    if let Some(column) = keep_columns.iter().find(|c| *c == REGION || *c == DISTRICT) {
        return Err(PipelineError::ColumnConflict {
            column: column.clone(),
            left: "district key".to_string(),
            right: raw.source.clone(),
        });
    }

    let regions: Vec<String> = match &keys.region {
        RegionSource::Column(name) => require_column(&frame, &raw.source, name)?
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().trim().to_string())
            .collect(),
        RegionSource::Fixed(name) => vec![name.clone(); frame.height()],
    };
    let districts: Vec<Option<&str>> = require_column(&frame, &raw.source, &keys.district_column)?
        .str()?
        .into_iter()
        .collect();
    for column in keep_columns {
        require_column(&frame, &raw.source, column)?;
    }

    let pattern = keys
        .district_pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|source| PipelineError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()?;

    let mut keep_rows = Vec::with_capacity(frame.height());
    let mut key_regions = Vec::new();
    let mut key_districts = Vec::new();

    for (region, district) in regions.into_iter().zip(districts.iter().copied()) {
        let allowed = region_allowlist.is_none_or(|allow| allow.contains(&region));
        keep_rows.push(allowed);
        if !allowed {
            continue;
        }

        key_districts.push(parse_district(
            district.unwrap_or_default(),
            pattern.as_ref(),
            &raw.source,
            &keys.district_column,
        )?);
        key_regions.push(region);
    }

    let filtered = keep_rows.iter().filter(|kept| !**kept).count();
    let mask = BooleanChunked::from_slice("allowed".into(), &keep_rows);
    let metrics = frame.filter(&mask)?.select(keep_columns.iter().cloned())?;

    let mut columns = vec![
        Column::new(REGION.into(), key_regions),
        Column::new(DISTRICT.into(), key_districts),
    ];
    columns.extend(metrics.get_columns().iter().cloned());
    let table = DistrictTable::from_frame(raw.source.clone(), DataFrame::new(columns)?)?;

    info!(
        rows = table.len(),
        filtered,
        columns = keep_columns.len(),
        "Topic table loaded"
    );

    Ok(table)
}

/// Parses a district number: integer text, or integral float text such as `3.0`.
pub fn parse_district(
    text: &str,
    pattern: Option<&Regex>,
    table: &str,
    column: &str,
) -> Result<u32> {
    let trimmed = text.trim();
    let digits = match pattern {
        Some(re) => re
            .captures(trimmed)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str())
            .ok_or_else(|| {
                PipelineError::type_conversion(table, column, text, "no district number found")
            })?,
        None => trimmed,
    };

    if let Ok(n) = digits.parse::<u32>() {
        return Ok(n);
    }

    match digits.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(PipelineError::type_conversion(
            table,
            column,
            text,
            "not a non-negative integer",
        )),
    }
}
