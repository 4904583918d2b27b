use std::cmp::min;

use crate::error::{OptError, OptResult};
use crate::operator::{Limit, Operator, TableScan};
use crate::rules::{
    abstract_node, OptExpression, Pattern, Rule, RuleContext, RulePromise, RuleResult,
};
use crate::utils::TreeBuilder;

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref MERGE_LIMITS_PATTERN: Pattern = {
        Pattern::new_builder(abstract_node(|op| matches!(op, Operator::Limit(_))))
          .leaf(abstract_node(|op| matches!(op, Operator::Limit(_))))
        .end()
    };
    static ref PUSH_LIMIT_OVER_PROJECTION_PATTERN: Pattern = {
        Pattern::new_builder(abstract_node(|op| matches!(op, Operator::Limit(_))))
          .leaf(abstract_node(|op| matches!(op, Operator::Projection(_))))
        .end()
    };
    static ref PUSH_LIMIT_TO_TABLE_SCAN_PATTERN: Pattern = {
        Pattern::new_builder(abstract_node(|op| matches!(op, Operator::Limit(_))))
          .leaf(abstract_node(|op| matches!(op, Operator::Scan(_))))
        .end()
    };
}

/// Collapses two adjacent limits into the smaller one.
#[derive(Clone, Default)]
pub struct MergeLimitsRule {}

impl MergeLimitsRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for MergeLimitsRule {
    fn name(&self) -> &str {
        "MergeLimitsRule"
    }

    fn pattern(&self) -> &Pattern {
        &MERGE_LIMITS_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        if let (Operator::Limit(limit1), Operator::Limit(limit2)) =
            (input.get_operator(ctx)?, input[0].get_operator(ctx)?)
        {
            let new_fetch = min(limit1.fetch(), limit2.fetch());

            let ret = input[0].clone_with_inputs(Operator::Limit(Limit::new(new_fetch)));

            result.add(ret);
            Ok(())
        } else {
            Err(OptError::internal("pattern mismatched"))
        }
    }

    fn promise(&self) -> RulePromise {
        RulePromise::Low
    }
}

/// Swaps a limit with the projection below it, so the limit can keep sinking
/// towards the scan.
#[derive(Clone, Default)]
pub struct PushLimitOverProjectionRule {}

impl PushLimitOverProjectionRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PushLimitOverProjectionRule {
    fn name(&self) -> &str {
        "PushLimitOverProjectionRule"
    }

    fn pattern(&self) -> &Pattern {
        &PUSH_LIMIT_OVER_PROJECTION_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let limit = input.get_operator(ctx)?.clone();
        let projection = input[0].get_operator(ctx)?.clone();

        let new_limit = input[0].clone_with_inputs(limit);
        let ret = OptExpression::with_operator(projection, vec![new_limit]);

        result.add(ret);

        Ok(())
    }

    fn promise(&self) -> RulePromise {
        RulePromise::Low
    }
}

/// Folds a limit into the scan below it.
#[derive(Clone, Default)]
pub struct PushLimitToTableScanRule {}

impl PushLimitToTableScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PushLimitToTableScanRule {
    fn name(&self) -> &str {
        "PushLimitToTableScanRule"
    }

    fn pattern(&self) -> &Pattern {
        &PUSH_LIMIT_TO_TABLE_SCAN_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        if let (Operator::Limit(limit), Operator::Scan(scan)) =
            (input.get_operator(ctx)?, input[0].get_operator(ctx)?)
        {
            let new_limit = scan
                .limit()
                .map(|l| min(l, limit.fetch()))
                .unwrap_or_else(|| limit.fetch());

            let ret = OptExpression::from(Operator::Scan(TableScan::with_limit(
                scan.table().clone(),
                new_limit,
            )));

            result.add(ret);

            Ok(())
        } else {
            Err(OptError::internal("pattern mismatched"))
        }
    }

    fn promise(&self) -> RulePromise {
        RulePromise::Low
    }
}
