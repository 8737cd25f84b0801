//! Turning a metric-per-row extract into a district-per-row table.

use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::RawTopicTable;

/// Pivots a wide extract with one row per metric and one column per district.
///
/// The values of `title_column` become the headers of the result; every other
/// source column becomes one row whose first field (under `key_column`) is the
/// source column's header. District columns keep their source order. Rows with
/// a blank title are ignored. Values are left as text; thousands separators
/// are handled by numeric coercion.
///
/// # Errors
///
/// [`PipelineError::MissingColumn`] without a title column,
/// [`PipelineError::DuplicateMetric`] if a title occurs twice.
#[tracing::instrument(skip_all, fields(table = %raw.source))]
pub fn pivot_metrics(
    raw: &RawTopicTable,
    title_column: &str,
    key_column: &str,
) -> Result<RawTopicTable> {
    let mut titles = Vec::new();
    let mut seen = HashSet::new();
    let mut titled = Vec::with_capacity(raw.height());
    for title in raw.values(title_column)? {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        titled.push(title.is_some());
        let Some(title) = title else {
            debug!("Skipping row without a title");
            continue;
        };
        if !seen.insert(title) {
            return Err(PipelineError::DuplicateMetric {
                table: raw.source.clone(),
                title: title.to_string(),
            });
        }
        titles.push(title.to_string());
    }

    let districts: Vec<String> = raw
        .headers()
        .into_iter()
        .filter(|h| h != title_column)
        .collect();

    let frame = if titles.is_empty() || districts.is_empty() {
        let mut columns = vec![Column::new(key_column.into(), &districts)];
        columns.extend(
            titles
                .iter()
                .map(|t| Column::new(t.as_str().into(), vec![None::<&str>; districts.len()])),
        );
        DataFrame::new(columns)?
    } else {
        let mask = BooleanChunked::from_slice("titled".into(), &titled);
        let mut metrics = raw.frame.filter(&mask)?.select(districts.iter().cloned())?;
        let mut wide = metrics.transpose(Some(key_column), None)?;
        wide.set_column_names(std::iter::once(key_column).chain(titles.iter().map(String::as_str)))?;
        wide
    };

    info!(
        metrics = titles.len(),
        districts = frame.height(),
        "Wide extract pivoted"
    );

    Ok(RawTopicTable {
        source: raw.source.clone(),
        frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::load::read_raw_table;

    #[test]
    fn test_pivot_two_metrics_one_district() {
        let data = "Title,D01\nTotal population,10\nWhite,8\n";
        let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();

        let wide = pivot_metrics(&raw, "Title", "CD119FP").unwrap();

        assert_eq!(wide.headers(), vec!["CD119FP", "Total population", "White"]);
        assert_eq!(wide.values("CD119FP").unwrap(), vec![Some("D01")]);
        assert_eq!(wide.values("White").unwrap(), vec![Some("8")]);
    }

    #[test]
    fn test_pivot_keeps_district_order_and_formatting() {
        let data = "Title,D02,D01\nTotal population,\"1,200\",900\n,,\n";
        let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();

        let wide = pivot_metrics(&raw, "Title", "CD").unwrap();

        assert_eq!(wide.headers(), vec!["CD", "Total population"]);
        assert_eq!(wide.values("CD").unwrap(), vec![Some("D02"), Some("D01")]);
        assert_eq!(
            wide.values("Total population").unwrap(),
            vec![Some("1,200"), Some("900")]
        );
    }

    #[test]
    fn test_pivot_without_districts_is_empty() {
        let data = "Title\nWhite\n";
        let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();

        let wide = pivot_metrics(&raw, "Title", "CD").unwrap();

        assert_eq!(wide.headers(), vec!["CD", "White"]);
        assert_eq!(wide.height(), 0);
    }

    #[test]
    fn test_pivot_duplicate_title() {
        let data = "Title,D01\nWhite,1\nWhite,2\n";
        let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();
        let err = pivot_metrics(&raw, "Title", "CD").unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateMetric { .. }));
    }

    #[test]
    fn test_pivot_missing_title_column() {
        let data = "Label,D01\nWhite,1\n";
        let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();
        assert!(matches!(
            pivot_metrics(&raw, "Title", "CD"),
            Err(PipelineError::MissingColumn { .. })
        ));
    }
}
