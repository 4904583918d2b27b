use log::trace;

use gneiss::error::OptResult;
use gneiss::expr::{BinaryOp, ScalarExpr};
use gneiss::operator::{Exchange, Operator, TableDesc};
use gneiss::rules::OptExprNode::ExprHandleNode;
use gneiss::rules::{
    abstract_node, any, ConverterRule, OptExpression, Pattern, RuleContext,
};
use gneiss::traits::Convention;
use gneiss::utils::TreeBuilder;

use crate::columnar::{COLUMNAR, COLUMNAR_PROVIDER};
use crate::row::ROW;

fn is_columnar_table(table: &TableDesc) -> bool {
    table.provider() == Some(COLUMNAR_PROVIDER)
}

/// Lowers scans of columnar tables into the columnar convention.
#[derive(Default)]
pub struct ColumnarScanRule {}

impl ColumnarScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl ConverterRule for ColumnarScanRule {
    fn name(&self) -> &str {
        "ColumnarScanRule"
    }

    fn source_convention(&self) -> Convention {
        Convention::NONE
    }

    fn target_convention(&self) -> Convention {
        COLUMNAR
    }

    fn convert(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        match input.get_operator(ctx)? {
            Operator::Scan(scan) if is_columnar_table(scan.table()) => {
                let operator = input.get_operator(ctx)?.clone();
                Ok(Some(OptExpression::with_operator_traits(
                    operator,
                    ctx.default_traits().with_convention(COLUMNAR),
                    vec![],
                )))
            }
            _ => Ok(None),
        }
    }
}

/// Pushes a filter into the columnar store.
///
/// The store evaluates predicates only against its partition index, so a
/// filter is accepted exactly when it is a pure conjunction of
/// `partition_key = literal` terms over the scanned table. Anything else is
/// semantically rejected and stays outside the store.
pub struct ColumnarFilterRule {
    pattern: Pattern,
}

impl Default for ColumnarFilterRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnarFilterRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::new_builder(abstract_node(|op| {
                matches!(op, Operator::Filter(_))
            }))
            .leaf(any as gneiss::rules::OperatorMatcher)
            .end(),
        }
    }

    /// The scanned table below the filter, if the filter sits directly on a
    /// scan.
    fn scanned_table<'a>(
        input: &'a OptExpression,
        ctx: &'a RuleContext,
    ) -> OptResult<Option<&'a TableDesc>> {
        match input[0].get_operator(ctx)? {
            Operator::Scan(scan) => Ok(Some(scan.table())),
            _ => Ok(None),
        }
    }
}

/// Whether `predicate` is a pure conjunction of `key = literal` terms over
/// `keys`.
fn is_partition_key_filter(predicate: &ScalarExpr, keys: &[String]) -> bool {
    if keys.is_empty() {
        return false;
    }

    predicate.conjuncts().iter().all(|conjunct| {
        let (left, op, right) = match conjunct {
            ScalarExpr::BinaryExpr { left, op, right } => (&**left, *op, &**right),
            _ => return false,
        };
        if op != BinaryOp::Eq {
            return false;
        }
        let (column, value) = match (left, right) {
            (ScalarExpr::Column(column), ScalarExpr::Literal(value)) => (column, value),
            (ScalarExpr::Literal(value), ScalarExpr::Column(column)) => (column, value),
            _ => return false,
        };
        !value.is_null() && keys.iter().any(|key| key == column)
    })
}

impl ConverterRule for ColumnarFilterRule {
    fn name(&self) -> &str {
        "ColumnarFilterRule"
    }

    fn source_convention(&self) -> Convention {
        Convention::NONE
    }

    fn target_convention(&self) -> Convention {
        COLUMNAR
    }

    fn pattern(&self) -> Option<&Pattern> {
        Some(&self.pattern)
    }

    fn matches(&self, input: &OptExpression, ctx: &RuleContext) -> OptResult<bool> {
        let table = match Self::scanned_table(input, ctx)? {
            Some(table) if is_columnar_table(table) => table.clone(),
            _ => return Ok(false),
        };

        let predicate = match input.get_operator(ctx)? {
            Operator::Filter(filter) => filter.predicate(),
            _ => return Ok(false),
        };

        let pushable = is_partition_key_filter(predicate, table.partition_keys());
        if !pushable {
            trace!(
                "Filter {} is not a partition key conjunction over {:?}",
                predicate,
                table.partition_keys()
            );
        }
        Ok(pushable)
    }

    fn convert(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        let operator = input.get_operator(ctx)?.clone();
        Ok(Some(OptExpression::with_operator_traits(
            operator,
            ctx.default_traits().with_convention(COLUMNAR),
            input.inputs().to_vec(),
        )))
    }
}

/// Bridges columnar results into the row engine.
///
/// The bridge is an exchange running in the row convention whose input is
/// required in the columnar convention; it ships rows out of the store
/// unchanged.
#[derive(Default)]
pub struct ColumnarToRowRule {}

impl ColumnarToRowRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl ConverterRule for ColumnarToRowRule {
    fn name(&self) -> &str {
        "ColumnarToRowRule"
    }

    fn source_convention(&self) -> Convention {
        COLUMNAR
    }

    fn target_convention(&self) -> Convention {
        ROW
    }

    fn convert(
        &self,
        input: OptExpression,
        _ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        let group = match input.node() {
            ExprHandleNode(handle) => handle.group_id(),
            _ => return Ok(None),
        };

        Ok(Some(OptExpression::with_operator(
            Operator::Exchange(Exchange::new(COLUMNAR)),
            vec![OptExpression::with_group_handle(group)],
        )))
    }
}

#[cfg(test)]
mod tests {
    use gneiss::expr::{col, lit};

    use crate::columnar::rules::is_partition_key_filter;

    fn keys() -> Vec<String> {
        vec!["c1".to_string()]
    }

    #[test]
    fn test_partition_key_equality_is_accepted() {
        assert!(is_partition_key_filter(&col("c1").eq(lit(5i64)), &keys()));
        // Literal on the left works too.
        assert!(is_partition_key_filter(&lit(5i64).eq(col("c1")), &keys()));
    }

    #[test]
    fn test_cross_column_comparison_is_rejected() {
        assert!(!is_partition_key_filter(&col("c1").not_eq(col("c2")), &keys()));
        assert!(!is_partition_key_filter(&col("c1").eq(col("c2")), &keys()));
    }

    #[test]
    fn test_non_key_column_is_rejected() {
        assert!(!is_partition_key_filter(&col("c2").eq(lit(5i64)), &keys()));
    }

    #[test]
    fn test_disjunction_is_rejected() {
        let predicate = col("c1").eq(lit(5i64)).or(col("c1").eq(lit(6i64)));
        assert!(!is_partition_key_filter(&predicate, &keys()));
    }

    #[test]
    fn test_conjunction_of_key_equalities_is_accepted() {
        let keys = vec!["c1".to_string(), "c2".to_string()];
        let predicate = col("c1").eq(lit(5i64)).and(col("c2").eq(lit("x")));
        assert!(is_partition_key_filter(&predicate, &keys));

        let mixed = col("c1").eq(lit(5i64)).and(col("c3").eq(lit("x")));
        assert!(!is_partition_key_filter(&mixed, &keys));
    }
}
