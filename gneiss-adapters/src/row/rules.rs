use gneiss::error::OptResult;
use gneiss::operator::{Operator, Sort};
use gneiss::planner::Enforcer;
use gneiss::rules::{ConverterRule, OptExpression, RuleContext};
use gneiss::traits::{Convention, TraitSet};

use crate::row::{ROW, ROW_PROVIDER};

/// Lowers abstract operators into the row convention.
///
/// The row enumerator executes every operator kind, so conversion is a copy
/// with new traits. The only nodes it refuses are scans of tables owned by
/// another storage adapter; those must enter row execution through that
/// adapter's bridge.
#[derive(Default)]
pub struct RowConverterRule {}

impl RowConverterRule {
    pub fn new() -> Self {
        Self {}
    }

    fn scan_is_native(operator: &Operator) -> bool {
        match operator {
            Operator::Scan(scan) => matches!(
                scan.table().provider(),
                None | Some(ROW_PROVIDER)
            ),
            Operator::Modify(modify) => matches!(
                modify.table().provider(),
                None | Some(ROW_PROVIDER)
            ),
            _ => true,
        }
    }
}

impl ConverterRule for RowConverterRule {
    fn name(&self) -> &str {
        "RowConverterRule"
    }

    fn source_convention(&self) -> Convention {
        Convention::NONE
    }

    fn target_convention(&self) -> Convention {
        ROW
    }

    fn convert(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        let operator = input.get_operator(ctx)?.clone();

        if !Self::scan_is_native(&operator) {
            return Ok(None);
        }
        // Exchanges are created by bridges, never lowered from abstract
        // plans.
        if matches!(operator, Operator::Exchange(_)) {
            return Ok(None);
        }

        // A lowered sort guarantees its own collation.
        let traits = ctx.default_traits().with_convention(ROW);
        let traits = match &operator {
            Operator::Sort(sort) => traits.with_collation(sort.collation().clone()),
            _ => traits,
        };

        Ok(Some(OptExpression::with_operator_traits(
            operator,
            traits,
            input.inputs().to_vec(),
        )))
    }
}

/// Establishes a required collation by sorting in the row engine.
#[derive(Default)]
pub struct RowSortEnforcer {}

impl RowSortEnforcer {
    pub fn new() -> Self {
        Self {}
    }
}

impl Enforcer for RowSortEnforcer {
    fn convention(&self) -> Convention {
        ROW
    }

    fn enforce(&self, required: &TraitSet) -> Option<Operator> {
        let collation = required.collation();
        if collation.is_empty() {
            return None;
        }
        Some(Operator::Sort(Sort::new(collation)))
    }
}
