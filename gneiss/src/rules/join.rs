use std::collections::HashSet;

use crate::error::{OptError, OptResult};
use crate::expr::col;
use crate::operator::{JoinType, Operator, Projection};
use crate::rules::{
    abstract_node, OptExpression, Pattern, Rule, RuleContext, RulePromise, RuleResult,
};

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref COMMUTATE_JOIN_PATTERN: Pattern = {
        Pattern::new_leaf(abstract_node(CommutateJoinRule::matches_operator))
    };
}

/// Commutates inner join inputs.
///
/// Swapping the inputs reorders the concatenated output fields, so the
/// swapped join is wrapped in a projection restoring the original field
/// order; without it the alternative would not be logically equivalent.
#[derive(Clone, Default)]
pub struct CommutateJoinRule {}

impl CommutateJoinRule {
    pub fn new() -> Self {
        Self {}
    }

    fn matches_operator(op: &Operator) -> bool {
        match op {
            Operator::Join(join) => matches!(join.join_type(), JoinType::Inner),
            _ => false,
        }
    }
}

impl Rule for CommutateJoinRule {
    fn name(&self) -> &str {
        "CommutateJoinRule"
    }

    fn pattern(&self) -> &Pattern {
        &COMMUTATE_JOIN_PATTERN
    }

    /// The restoring projection selects columns by name, so both sides must
    /// expose disjoint field names.
    fn matches(&self, input: &OptExpression, ctx: &RuleContext) -> OptResult<bool> {
        let left = input[0].row_type(ctx)?;
        let right = input[1].row_type(ctx)?;

        let left_names: HashSet<&str> =
            left.fields().iter().map(|f| f.name().as_str()).collect();
        let disjoint = right
            .fields()
            .iter()
            .all(|f| !left_names.contains(f.name().as_str()));

        Ok(disjoint)
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        if !matches!(input.get_operator(ctx)?, Operator::Join(_)) {
            return Err(OptError::internal("pattern mismatched"));
        }

        let join = input.get_operator(ctx)?.clone();
        let left = input[0].clone();
        let right = input[1].clone();

        let original_columns = input
            .row_type(ctx)?
            .fields()
            .iter()
            .map(|f| col(f.name().as_str()))
            .collect::<Vec<_>>();

        let swapped = OptExpression::with_operator(join, vec![right, left]);
        let ret = OptExpression::with_operator(
            Operator::Projection(Projection::new(original_columns)),
            vec![swapped],
        );

        result.add(ret);
        Ok(())
    }

    fn promise(&self) -> RulePromise {
        RulePromise::Medium
    }
}
