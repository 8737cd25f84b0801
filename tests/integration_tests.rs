use cd_demographics::pipeline::{
    CoercionRules, KeyColumns, RegionSource, coerce_numeric, load_topic_table, pivot_metrics,
    read_raw_table,
};
use cd_demographics::vintage::{self, Vintage};
use cd_demographics::{DistrictKey, PipelineError};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

fn fixtures(vintage: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(vintage)
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_full_pipeline_2018() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cd_2018.csv");

    let summary = vintage::run(&Vintage::Y2018.spec(), &fixtures("2018"), &output)
        .expect("2018 pipeline failed");
    assert_eq!(summary.table.len(), 3);

    let lines = read_lines(&output);
    assert_eq!(
        lines,
        vec![
            "CD116,Voting rate,18-44,45-64,65 and older,Women,In Poverty,\
             Did not finish high school,Bachelors or more,White,Black,Asian,Hispanic",
            "Ohio 01,62.3,44.4,33.0,22.6,51.3,13.2,9.3,28.4,80.1,12.3,,3.4",
            "Ohio 02,58.1,42.5,34.0,23.5,51.0,15.0,7.0,35.2,70.0,20.0,4.0,5.0",
            "Indiana 01,50.0,46.0,32.0,22.0,50.5,12.1,,24.0,85.0,8.0,2.0,6.0",
        ]
    );
}

#[test]
fn test_2018_regions_come_from_allowlist() {
    let spec = Vintage::Y2018.spec();
    let allow = spec.region_allowlist.clone().unwrap();
    let summary = vintage::build_summary(&spec, &fixtures("2018")).unwrap();

    let keys = summary.table.keys().unwrap();
    for key in &keys {
        assert!(allow.contains(&key.region), "{key} not allowed");
    }
    // Texas is filtered out, Michigan 05 has no race row
    assert!(!keys.contains(&DistrictKey::new("Texas", 1)));
    assert!(!keys.contains(&DistrictKey::new("Michigan", 5)));
}

#[test]
fn test_full_pipeline_2023() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cd_2023.csv");

    vintage::run(&Vintage::Y2023.spec(), &fixtures("2023"), &output)
        .expect("2023 pipeline failed");

    let lines = read_lines(&output);
    assert_eq!(
        lines,
        vec![
            "CD119,18-44,45-64,65 and older,Women,In Poverty,\
             Did not finish high school,Bachelors or more,White,Black,Asian,Hispanic",
            "Ohio 01,44.9,33.3,21.8,51.0,12.4,8.8,30.1,80.0,10.0,3.0,4.5",
            "Ohio 02,53.3,26.7,20.0,50.0,,12.0,20.5,70.0,20.0,5.0,5.0",
        ]
    );
}

#[test]
fn test_wide_reshape_scenario() {
    let data = "Title,D01\nTotal population,10\nWhite,8\n";
    let raw = read_raw_table("ohio", data.as_bytes(), 0, &[]).unwrap();
    let wide = pivot_metrics(&raw, "Title", "CD119FP").unwrap();

    let keys = KeyColumns {
        region: RegionSource::Fixed("Ohio".into()),
        district_column: "CD119FP".into(),
        district_pattern: Some(r"(\d+)".into()),
    };
    let columns = vec!["Total population".to_string(), "White".to_string()];
    let mut table = load_topic_table(&wide, &BTreeMap::new(), &columns, &keys, None).unwrap();
    coerce_numeric(&mut table, &columns, &CoercionRules::default()).unwrap();

    assert_eq!(table.keys().unwrap(), vec![DistrictKey::new("Ohio", 1)]);
    let number = |column: &str| table.require_column(column).unwrap().f64().unwrap().get(0);
    assert_eq!(number("Total population"), Some(10.0));
    assert_eq!(number("White"), Some(8.0));
}

#[test]
fn test_config_override_narrows_regions() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = Vintage::Y2018.spec();
    spec.region_allowlist = Some(vec!["Indiana".to_string()]);

    let path = dir.path().join("indiana.json");
    fs::write(&path, spec.to_json_pretty().unwrap()).unwrap();
    let loaded = cd_demographics::VintageSpec::load(&path).unwrap();

    let summary = vintage::build_summary(&loaded, &fixtures("2018")).unwrap();
    let keys: Vec<String> = summary
        .table
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.to_string())
        .collect();
    assert_eq!(keys, vec!["Indiana 01"]);
}

#[test]
fn test_no_matching_region_fails_join() {
    let mut spec = Vintage::Y2018.spec();
    spec.region_allowlist = Some(vec!["Wisconsin".to_string()]);

    let err = vintage::build_summary(&spec, &fixtures("2018")).unwrap_err();
    assert!(matches!(err, PipelineError::JoinEmptyResult { .. }));
}

#[test]
fn test_missing_input_file_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cd_2018.csv");

    let err = vintage::run(&Vintage::Y2018.spec(), dir.path(), &output).unwrap_err();

    assert!(matches!(err, PipelineError::Io(_)));
    assert!(!output.exists());
}

#[test]
fn test_renamed_source_column_is_reported() {
    let mut spec = Vintage::Y2018.spec();
    spec.topics[0].rename.clear();

    let err = vintage::build_summary(&spec, &fixtures("2018")).unwrap_err();
    assert!(
        matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "Voting rate")
    );
}
