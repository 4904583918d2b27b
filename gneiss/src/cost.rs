//! Defines the cost model.
//!
//! The engine only needs costs to be totally ordered and additive; what a
//! unit of cost means is up to the [`CostModel`] implementation. The bundled
//! [`SimpleCostModel`] charges by estimated rows processed, which is enough
//! to make cross-backend choices such as "filter before shipping rows out of
//! a backend" fall out of the numbers.

use derive_more::{Add, AddAssign, Sub, SubAssign, Sum};

use crate::error::{OptError, OptResult};
use crate::operator::Operator;
use crate::stat::Statistics;
use crate::traits::TraitSet;

pub const INF: Cost = Cost(f64::INFINITY);

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Add, Sub, Sum, AddAssign, SubAssign)]
pub struct Cost(f64);

impl Cost {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Cost {
    fn from(c: f64) -> Self {
        Cost(c)
    }
}

/// Estimates the cost of one operator, without accumulating children's cost.
pub trait CostModel: Send + Sync {
    fn estimate_cost(
        &self,
        operator: &Operator,
        traits: &TraitSet,
        output_stat: &Statistics,
        input_stats: &[Statistics],
    ) -> OptResult<Cost>;
}

/// Cost model charging by rows processed.
#[derive(Default)]
pub struct SimpleCostModel {}

impl CostModel for SimpleCostModel {
    fn estimate_cost(
        &self,
        operator: &Operator,
        traits: &TraitSet,
        output_stat: &Statistics,
        input_stats: &[Statistics],
    ) -> OptResult<Cost> {
        if traits.convention().is_none() {
            return Err(OptError::internal(
                "no cost for abstract operator".to_string(),
            ));
        }

        let input_rows: f64 = input_stats.iter().map(|s| s.row_count()).sum();
        let output_rows = output_stat.row_count();

        let cost = match operator {
            Operator::Scan(_) => output_rows,
            Operator::Filter(_) => input_rows,
            Operator::Projection(_) => input_rows,
            // Build one side, probe the other, emit the result.
            Operator::Join(_) => input_rows + output_rows,
            Operator::Limit(_) => output_rows,
            Operator::Sort(_) => input_rows * input_rows.max(2.0).ln(),
            // Rows crossing a backend boundary are the dominating term.
            Operator::Exchange(_) => input_rows,
            Operator::Modify(_) => input_rows,
        };

        Ok(Cost::from(cost))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_schema::{DataType, Field, Schema};

    use crate::cost::{CostModel, SimpleCostModel, INF};
    use crate::operator::{Operator, TableDesc, TableScan};
    use crate::stat::Statistics;
    use crate::traits::{Convention, TraitRegistry};

    #[test]
    fn test_cost_ordering() {
        assert!(super::Cost::from(1.0) < super::Cost::from(2.0));
        assert!(super::Cost::from(1.0) < INF);
        assert_eq!(
            super::Cost::from(3.0),
            super::Cost::from(1.0) + super::Cost::from(2.0)
        );
    }

    #[test]
    fn test_no_cost_for_abstract_operator() {
        let table = Arc::new(TableDesc::new(
            "t1",
            Arc::new(Schema::new(vec![Field::new("c1", DataType::Int64, false)])),
        ));
        let scan = Operator::Scan(TableScan::new(table));

        let registry = TraitRegistry::default();
        let model = SimpleCostModel::default();

        model
            .estimate_cost(&scan, &registry.default_set(), &Statistics::default(), &[])
            .unwrap_err();

        let physical = registry.default_set().with_convention(Convention::new("ROW"));
        let cost = model
            .estimate_cost(&scan, &physical, &Statistics::new(100.0), &[])
            .unwrap();
        assert_eq!(100.0, cost.value());
    }
}
