use polars::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::table::{DISTRICT, DistrictTable, REGION};

/// Row index of the first table, used to restore its order after joining.
const ORDER: &str = "__order";

/// Inner-joins topic tables on their district keys.
///
/// A district is kept only when every table has it; row order follows the
/// first table. Districts missing from any table are dropped, not imputed.
///
/// # Errors
///
/// [`PipelineError::JoinEmptyResult`] when no district survives (or no table
/// was given), [`PipelineError::ColumnConflict`] when two tables share a
/// metric column.
#[tracing::instrument(skip_all, fields(tables = tables.len()))]
pub fn join_on_district_key(tables: &[DistrictTable]) -> Result<DistrictTable> {
    let names = tables
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let Some((first, rest)) = tables.split_first() else {
        return Err(PipelineError::JoinEmptyResult { tables: names });
    };

    let mut owner: HashMap<&str, &str> = HashMap::new();
    for table in tables {
        for column in table.columns() {
            if let Some(left) = owner.insert(column, table.name.as_str()) {
                return Err(PipelineError::ColumnConflict {
                    column: column.to_string(),
                    left: left.to_string(),
                    right: table.name.clone(),
                });
            }
        }
    }

    let on = [col(REGION), col(DISTRICT)];
    let mut joined = first.frame().clone().lazy().with_row_index(ORDER, None);
    for table in rest {
        joined = joined.join(
            table.frame().clone().lazy(),
            on.clone(),
            on.clone(),
            JoinArgs::new(JoinType::Inner),
        );
    }
    let frame = joined
        .sort([ORDER], SortMultipleOptions::default())
        .collect()?
        .drop(ORDER)?;
    let joined = DistrictTable::from_frame(names.clone(), frame)?;

    info!(
        input_rows = ?tables.iter().map(DistrictTable::len).collect::<Vec<_>>(),
        joined_rows = joined.len(),
        "Tables joined on district key"
    );

    if joined.is_empty() {
        return Err(PipelineError::JoinEmptyResult { tables: names });
    }

    Ok(joined)
}
