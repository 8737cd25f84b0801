//! District metric building blocks.
//!
//! Raw extracts are read and cleaned into one table per topic, coerced to
//! numbers, extended with derived metrics, inner-joined on the district key
//! and finally projected and rounded for output.

pub mod coerce;
pub mod derive;
pub mod finalize;
pub mod join;
pub mod load;
pub mod reshape;

pub use coerce::{CoercionRules, coerce_numeric};
pub use derive::{CompositeOp, DerivedColumn, apply_derivation, derive_composite};
pub use finalize::{DistrictSummary, finalize};
pub use join::join_on_district_key;
pub use load::{KeyColumns, RegionSource, load_topic_table, read_raw_file, read_raw_table};
pub use reshape::pivot_metrics;
