use crate::error::{OptError, OptResult};
use crate::operator::{Filter, Operator};
use crate::rules::{
    abstract_node, OptExpression, Pattern, Rule, RuleContext, RuleResult,
};
use crate::utils::TreeBuilder;

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref MERGE_FILTERS_PATTERN: Pattern = {
        Pattern::new_builder(abstract_node(|op| matches!(op, Operator::Filter(_))))
          .leaf(abstract_node(|op| matches!(op, Operator::Filter(_))))
        .end()
    };
}

/// Collapses two adjacent filters into one conjunctive filter.
#[derive(Clone, Default)]
pub struct MergeFiltersRule {}

impl MergeFiltersRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for MergeFiltersRule {
    fn name(&self) -> &str {
        "MergeFiltersRule"
    }

    fn pattern(&self) -> &Pattern {
        &MERGE_FILTERS_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        if let (Operator::Filter(outer), Operator::Filter(inner)) =
            (input.get_operator(ctx)?, input[0].get_operator(ctx)?)
        {
            let merged = outer.predicate().clone().and(inner.predicate().clone());

            let ret = input[0].clone_with_inputs(Operator::Filter(Filter::new(merged)));

            result.add(ret);
            Ok(())
        } else {
            Err(OptError::internal("pattern mismatched"))
        }
    }
}
