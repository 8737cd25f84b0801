//! 2018 congressional district tables (116th Congress boundaries).
//!
//! Five topic extracts share a layout: two title lines, the header, two
//! footnote lines, then one row per district. Most metric columns have blank
//! headers and are addressed by position.

use super::spec::{TableLayout, TopicSpec, VintageSpec, renames, strings};
use crate::pipeline::finalize::DEFAULT_ROUNDING_DIGITS;
use crate::pipeline::{CoercionRules, CompositeOp, DerivedColumn, KeyColumns, RegionSource};

pub const STATES: [&str; 6] = [
    "Ohio",
    "Indiana",
    "Michigan",
    "Pennsylvania",
    "Wisconsin",
    "Missouri",
];

const HEADER_ROW: usize = 2;
const FOOTNOTE_ROWS: [usize; 2] = [3, 4];

fn topic(name: &str, file: &str, rename: &[(&str, &str)], keep: &[&str]) -> TopicSpec {
    TopicSpec {
        name: name.to_string(),
        file: file.to_string(),
        header_row_offset: HEADER_ROW,
        skip_rows: FOOTNOTE_ROWS.to_vec(),
        layout: TableLayout::Rows,
        rename: renames(rename),
        keep: strings(keep),
        derive: Vec::new(),
        drop: Vec::new(),
    }
}

pub fn spec() -> VintageSpec {
    let turnout = topic(
        "turnout",
        "voter_turnout_2018.csv",
        &[("Voting rate3", "Voting rate")],
        &["Voting rate"],
    );

    let age = topic(
        "age",
        "table02a_age_2018.csv",
        &[
            ("Unnamed: 8", "18-29"),
            ("Unnamed: 12", "30-44"),
            ("Unnamed: 16", "45-64"),
            ("Unnamed: 20", "65 and older"),
        ],
        &["18-29", "30-44", "45-64", "65 and older"],
    );

    let sex_poverty = topic(
        "sex_poverty",
        "table02b_sex_poverty_2018.csv",
        &[
            ("Unnamed: 8", "Men"),
            ("Unnamed: 12", "Women"),
            ("Unnamed: 18", "In Poverty"),
        ],
        &["Men", "Women", "In Poverty"],
    );

    let mut education = topic(
        "education",
        "table02c_education_2018.csv",
        &[
            ("Unnamed: 8", "Less than 9th grade"),
            ("Unnamed: 12", "9th to 12 Grade, no diploma"),
            ("Unnamed: 36", "High school or more"),
            ("Unnamed: 40", "Bachelors or more"),
        ],
        &[
            "Less than 9th grade",
            "9th to 12 Grade, no diploma",
            "High school or more",
            "Bachelors or more",
        ],
    );
    education.derive.push(DerivedColumn::new(
        "Did not finish high school",
        CompositeOp::Sum,
        &["Less than 9th grade", "9th to 12 Grade, no diploma"],
    ));
    education.drop = strings(&["Less than 9th grade", "9th to 12 Grade, no diploma"]);

    let race = topic(
        "race",
        "table02d_race_2018.csv",
        &[
            ("Unnamed: 8", "White"),
            ("Unnamed: 12", "Black"),
            ("Unnamed: 16", "Asian"),
            ("Unnamed: 36", "Hispanic"),
        ],
        &["White", "Black", "Asian", "Hispanic"],
    );

    VintageSpec {
        name: "2018".to_string(),
        id_column: "CD116".to_string(),
        input_dir: "data_2018/demographic_data".into(),
        output_file: "data_2018/cd_2018.csv".into(),
        keys: KeyColumns {
            region: RegionSource::Column("State name".to_string()),
            district_column: "Congressional district".to_string(),
            district_pattern: None,
        },
        region_allowlist: Some(strings(&STATES)),
        coercion: CoercionRules::default(),
        topics: vec![turnout, age, sex_poverty, education, race],
        derive: vec![DerivedColumn::new(
            "18-44",
            CompositeOp::Sum,
            &["18-29", "30-44"],
        )],
        output_columns: strings(&[
            "Voting rate",
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
        sort_by_district: false,
    }
}
