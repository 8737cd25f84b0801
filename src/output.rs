//! Output formatting and persistence for district summaries.

use csv::WriterBuilder;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::DistrictSummary;

/// Logs the header and the first `rows` records at debug level.
pub fn log_preview(summary: &DistrictSummary, rows: usize) -> Result<()> {
    debug!(header = ?summary.header(), "Summary header");
    for record in summary.records()?.iter().take(rows) {
        debug!(?record, "Summary row");
    }
    Ok(())
}

/// Writes a [`DistrictSummary`] as CSV, replacing any existing file.
///
/// Creates missing parent directories.
pub fn write_summary(path: &Path, summary: &DistrictSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    writer.write_record(summary.header())?;
    let mut rows = 0usize;
    for record in summary.records()? {
        writer.write_record(&record)?;
        rows += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), rows, "Summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DistrictKey, DistrictTable};

    fn summary() -> DistrictSummary {
        let t = DistrictTable::from_numbers(
            "joined",
            &["Voting rate", "Did not finish high school"],
            &[
                (DistrictKey::new("Ohio", 1), vec![Some(62.3), None]),
                (DistrictKey::new("Michigan", 14), vec![Some(55.0), Some(9.1)]),
            ],
        );
        DistrictSummary::new("CD116", t, 1)
    }

    #[test]
    fn test_log_preview_reads_records() {
        log_preview(&summary(), 10).unwrap();
    }

    #[test]
    fn test_write_summary_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cd.csv");

        write_summary(&path, &summary()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "CD116,Voting rate,Did not finish high school",
                "Ohio 01,62.3,",
                "Michigan 14,55.0,9.1",
            ]
        );
    }

    #[test]
    fn test_write_summary_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cd.csv");

        write_summary(&path, &summary()).unwrap();
        write_summary(&path, &summary()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("CD116")).count();
        assert_eq!(header_count, 1);
    }
}
