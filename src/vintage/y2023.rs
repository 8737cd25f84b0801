//! 2023 Ohio district profile (119th Congress boundaries).
//!
//! A single extract with one row per `Title` and one column per district
//! (`D01`, `D02`, ...). Counts carry thousands separators.

use super::spec::{TableLayout, TopicSpec, VintageSpec, renames, strings};
use crate::pipeline::finalize::DEFAULT_ROUNDING_DIGITS;
use crate::pipeline::{CoercionRules, CompositeOp, DerivedColumn, KeyColumns, RegionSource};

const VOTING_AGE: &str = "18 years and over";
const TOTAL: &str = "Total population";

fn derivations() -> Vec<DerivedColumn> {
    use CompositeOp::*;

    let mut derive = vec![
        DerivedColumn::new("Female and male", Sum, &["Female", "Male"]),
        DerivedColumn::new("Women", RatioPercent, &["Female", "Female and male"]),
        DerivedColumn::new(
            "Did not finish high school",
            ComplementPercent,
            &["Percent high school graduate or higher"],
        ),
        // The 5-year bins straddle 18; the 18-19 bucket is estimated as
        // (population under 20) - (population under 18).
        DerivedColumn::new(
            "Under 20",
            Sum,
            &["Under 5 years", "5 to 9 years", "10 to 14 years", "15 to 19 years"],
        ),
        DerivedColumn::new("Under 18", Difference, &[TOTAL, VOTING_AGE]),
        DerivedColumn::new("18-19", Difference, &["Under 20", "Under 18"]).non_negative(),
        DerivedColumn::new(
            "18-44 population",
            Sum,
            &["18-19", "20 to 24 years", "25 to 34 years", "35 to 44 years"],
        ),
        DerivedColumn::new("18-44", RatioPercent, &["18-44 population", VOTING_AGE]),
        DerivedColumn::new(
            "45-64 population",
            Sum,
            &["45 to 54 years", "55 to 59 years", "60 to 64 years"],
        ),
        DerivedColumn::new("45-64", RatioPercent, &["45-64 population", VOTING_AGE]),
        DerivedColumn::new("65 and older", RatioPercent, &["65 years and over", VOTING_AGE]),
    ];

    for race in ["White", "Black", "Asian", "Hispanic"] {
        derive.push(DerivedColumn::new(race, RatioPercent, &[race, TOTAL]));
    }

    derive
}

pub fn spec() -> VintageSpec {
    let profile = TopicSpec {
        name: "profile".to_string(),
        file: "Ohio_District_all_2023.csv".to_string(),
        header_row_offset: 0,
        skip_rows: Vec::new(),
        layout: TableLayout::Wide {
            title_column: "Title".to_string(),
        },
        rename: renames(&[
            ("Poverty Rate", "In Poverty"),
            ("Percent bachelor's degree or higher", "Bachelors or more"),
            ("Black or African American", "Black"),
            ("Hispanic or Latino (of any race)", "Hispanic"),
        ]),
        keep: strings(&[
            "Female",
            "Male",
            "Percent high school graduate or higher",
            "In Poverty",
            "Bachelors or more",
            TOTAL,
            "Under 5 years",
            "5 to 9 years",
            "10 to 14 years",
            "15 to 19 years",
            "20 to 24 years",
            "25 to 34 years",
            "35 to 44 years",
            "45 to 54 years",
            "55 to 59 years",
            "60 to 64 years",
            VOTING_AGE,
            "65 years and over",
            "White",
            "Black",
            "Asian",
            "Hispanic",
        ]),
        derive: derivations(),
        drop: Vec::new(),
    };

    VintageSpec {
        name: "2023".to_string(),
        id_column: "CD119".to_string(),
        input_dir: "data_2023".into(),
        output_file: "data_2023/cd_2023.csv".into(),
        keys: KeyColumns {
            region: RegionSource::Fixed("Ohio".to_string()),
            district_column: "CD119FP".to_string(),
            district_pattern: Some(r"(\d+)".to_string()),
        },
        region_allowlist: None,
        coercion: CoercionRules::default().with_thousands_separator(','),
        topics: vec![profile],
        derive: Vec::new(),
        output_columns: strings(&[
            "18-44",
            "45-64",
            "65 and older",
            "Women",
            "In Poverty",
            "Did not finish high school",
            "Bachelors or more",
            "White",
            "Black",
            "Asian",
            "Hispanic",
        ]),
        rounding_digits: DEFAULT_ROUNDING_DIGITS,
        sort_by_district: true,
    }
}
