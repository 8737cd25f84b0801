//! Composite metrics computed from existing numeric columns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::table::DistrictTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeOp {
    /// Σ components.
    Sum,
    /// components[0] − Σ components[1..].
    Difference,
    /// components[0] / components[1] × 100.
    RatioPercent,
    /// 100 − components[0].
    ComplementPercent,
}

impl CompositeOp {
    /// Builds the expression over `inputs`, one per component column.
    ///
    /// Nulls propagate; a zero denominator yields null. Fails when the number
    /// of inputs does not fit the operation.
    pub fn expr(self, inputs: &[Expr]) -> std::result::Result<Expr, String> {
        match (self, inputs) {
            (CompositeOp::Sum, [first, rest @ ..]) => Ok(rest
                .iter()
                .cloned()
                .fold(first.clone(), |acc, e| acc + e)),
            (CompositeOp::Difference, [first, rest @ ..]) if !rest.is_empty() => Ok(rest
                .iter()
                .cloned()
                .fold(first.clone(), |acc, e| acc - e)),
            (CompositeOp::RatioPercent, [numerator, denominator]) => {
                Ok(when(denominator.clone().eq(lit(0.0)))
                    .then(lit(NULL).cast(DataType::Float64))
                    .otherwise(numerator.clone() / denominator.clone() * lit(100.0)))
            }
            (CompositeOp::ComplementPercent, [share]) => Ok(lit(100.0) - share.clone()),
            _ => Err(format!(
                "{self:?} does not accept {} component(s)",
                inputs.len()
            )),
        }
    }
}

/// A declared derivation, as carried in vintage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    pub op: CompositeOp,
    pub components: Vec<String>,
    /// Negative results are clamped to zero with a warning.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub non_negative: bool,
}

impl DerivedColumn {
    pub fn new(name: &str, op: CompositeOp, components: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            op,
            components: components.iter().map(|c| c.to_string()).collect(),
            non_negative: false,
        }
    }

    pub fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }
}

/// Computes `new_column` from `components`, replacing it if it already exists.
///
/// Any missing input makes the result missing. Text that survived coercion
/// is rejected with [`PipelineError::TypeConversion`], an operation given the
/// wrong number of components with [`PipelineError::InvalidDerivation`].
pub fn derive_composite(
    table: &mut DistrictTable,
    new_column: &str,
    components: &[String],
    op: CompositeOp,
) -> Result<()> {
    compute(table, new_column, components, op, false)
}

/// Applies a configured [`DerivedColumn`].
#[tracing::instrument(skip_all, fields(table = %table.name, column = %derived.name))]
pub fn apply_derivation(table: &mut DistrictTable, derived: &DerivedColumn) -> Result<()> {
    compute(
        table,
        &derived.name,
        &derived.components,
        derived.op,
        derived.non_negative,
    )
}

/// Numeric input column for a derivation; text that survived coercion is rejected.
fn numeric_input(table: &DistrictTable, name: &str) -> Result<Expr> {
    let column = table.require_column(name)?;
    if column.dtype() == &DataType::String {
        let value = column
            .str()?
            .into_iter()
            .flatten()
            .next()
            .unwrap_or_default()
            .to_string();
        return Err(PipelineError::type_conversion(
            &table.name,
            name,
            &value,
            "derived metric inputs must be numeric",
        ));
    }
    Ok(col(name).cast(DataType::Float64))
}

fn compute(
    table: &mut DistrictTable,
    new_column: &str,
    components: &[String],
    op: CompositeOp,
    non_negative: bool,
) -> Result<()> {
    let inputs = components
        .iter()
        .map(|c| numeric_input(table, c))
        .collect::<Result<Vec<_>>>()?;
    let expr = op
        .expr(&inputs)
        .map_err(|reason| PipelineError::InvalidDerivation {
            column: new_column.to_string(),
            reason,
        })?;

    let mut frame = table
        .frame()
        .clone()
        .lazy()
        .with_column(expr.alias(new_column))
        .collect()?;

    if non_negative {
        let values = frame.column(new_column)?.f64()?;
        for (key, value) in table.keys()?.iter().zip(values) {
            if let Some(v) = value.filter(|v| *v < 0.0) {
                warn!(district = %key, value = v, "Negative estimate clamped to zero");
            }
        }
        frame = frame
            .lazy()
            .with_column(
                when(col(new_column).lt(lit(0.0)))
                    .then(lit(0.0))
                    .otherwise(col(new_column))
                    .alias(new_column),
            )
            .collect()?;
    }

    let missing = frame.column(new_column)?.null_count();
    debug!(column = new_column, ?op, missing, "Derived column computed");
    *table.frame_mut() = frame;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DISTRICT, DistrictKey, REGION};

    fn ohio() -> DistrictKey {
        DistrictKey::new("Ohio", 1)
    }

    fn table(columns: &[&str], values: Vec<Option<f64>>) -> DistrictTable {
        DistrictTable::from_numbers("t", columns, &[(ohio(), values)])
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ratio_percent_female_share() {
        let mut t = table(&["Female", "Total"], vec![Some(52.0), Some(100.0)]);
        derive_composite(&mut t, "Women", &names(&["Female", "Total"]), CompositeOp::RatioPercent)
            .unwrap();
        assert_eq!(t.number(&ohio(), "Women"), Some(52.0));
    }

    #[test]
    fn test_ratio_percent_zero_denominator_is_missing() {
        let mut t = table(&["a", "b"], vec![Some(5.0), Some(0.0)]);
        derive_composite(&mut t, "r", &names(&["a", "b"]), CompositeOp::RatioPercent).unwrap();
        assert_eq!(t.number(&ohio(), "r"), None);
    }

    #[test]
    fn test_sum_order_does_not_matter() {
        let mut t = table(&["a", "b", "c"], vec![Some(3.5), Some(1.25), Some(7.0)]);
        derive_composite(&mut t, "abc", &names(&["a", "b", "c"]), CompositeOp::Sum).unwrap();
        derive_composite(&mut t, "cab", &names(&["c", "a", "b"]), CompositeOp::Sum).unwrap();
        assert_eq!(t.number(&ohio(), "abc"), t.number(&ohio(), "cab"));
        assert_eq!(t.number(&ohio(), "abc"), Some(11.75));
    }

    #[test]
    fn test_difference_subtracts_the_rest() {
        let mut t = table(&["Total", "18+", "x"], vec![Some(100.0), Some(75.0), Some(5.0)]);
        derive_composite(&mut t, "d", &names(&["Total", "18+", "x"]), CompositeOp::Difference)
            .unwrap();
        assert_eq!(t.number(&ohio(), "d"), Some(20.0));
    }

    #[test]
    fn test_complement_adds_back_to_hundred() {
        let mut t = table(&["hs"], vec![Some(91.4)]);
        derive_composite(&mut t, "no_hs", &names(&["hs"]), CompositeOp::ComplementPercent).unwrap();
        let no_hs = t.number(&ohio(), "no_hs").unwrap();
        assert!((no_hs + 91.4 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_input_propagates() {
        let mut t = table(&["Less than 9th grade", "9th to 12th"], vec![None, Some(4.0)]);
        derive_composite(
            &mut t,
            "Did not finish high school",
            &names(&["Less than 9th grade", "9th to 12th"]),
            CompositeOp::Sum,
        )
        .unwrap();
        assert_eq!(t.number(&ohio(), "Did not finish high school"), None);
    }

    #[test]
    fn test_text_input_is_rejected() {
        let frame = DataFrame::new(vec![
            Column::new(REGION.into(), ["Ohio"]),
            Column::new(DISTRICT.into(), [1u32]),
            Column::new("a".into(), ["abc"]),
        ])
        .unwrap();
        let mut t = DistrictTable::from_frame("t", frame).unwrap();

        let err = derive_composite(&mut t, "b", &names(&["a"]), CompositeOp::Sum).unwrap_err();

        assert!(matches!(err, PipelineError::TypeConversion { ref value, .. } if value == "abc"));
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let mut t = table(&["a"], vec![Some(1.0)]);
        let err = derive_composite(&mut t, "b", &names(&["a"]), CompositeOp::RatioPercent)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDerivation { .. }));
    }

    #[test]
    fn test_expr_checks_input_count() {
        assert!(CompositeOp::RatioPercent.expr(&[]).is_err());
        assert!(CompositeOp::Sum.expr(&[]).is_err());
        assert!(CompositeOp::Difference.expr(&[col("a")]).is_err());
        assert!(CompositeOp::ComplementPercent.expr(&[col("a"), col("b")]).is_err());
        assert!(CompositeOp::Sum.expr(&[col("a")]).is_ok());
    }

    #[test]
    fn test_overwrites_existing_column() {
        let mut t = table(&["White", "Total"], vec![Some(8.0), Some(10.0)]);
        derive_composite(&mut t, "White", &names(&["White", "Total"]), CompositeOp::RatioPercent)
            .unwrap();
        assert_eq!(t.columns().len(), 2);
        assert_eq!(t.number(&ohio(), "White"), Some(80.0));
    }

    #[test]
    fn test_non_negative_clamps() {
        let mut t = table(&["a", "b"], vec![Some(3.0), Some(5.0)]);
        let derived = DerivedColumn::new("d", CompositeOp::Difference, &["a", "b"]).non_negative();
        apply_derivation(&mut t, &derived).unwrap();
        assert_eq!(t.number(&ohio(), "d"), Some(0.0));
    }

    #[test]
    fn test_op_serde_names() {
        let json = serde_json::to_string(&CompositeOp::RatioPercent).unwrap();
        assert_eq!(json, "\"RATIO_PERCENT\"");
    }
}
