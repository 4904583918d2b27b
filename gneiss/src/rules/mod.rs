//! Optimization rules.
//!
//! A rule defines an equivalent transformation of a query plan. There are
//! three kinds of rules:
//!
//! 1. Rewrite rule. It produces a transformation which is assumed to be
//! better than the original plan, for example [`MergeLimitsRule`] which
//! collapses adjacent limits.
//! 2. Exploration rule. It produces an equivalent alternative abstract plan
//! enlarging the search space, for example [`CommutateJoinRule`] which swaps
//! the inputs of an inner join.
//! 3. Converter rule ([`ConverterRule`]). It rewrites an expression from one
//! convention into another, preserving row type and semantics. Backend
//! adapters extend the optimizer exclusively through these.
//!
//! ## Pattern
//!
//! A pattern defines what expressions a rule should operate on. With the
//! pattern declared separately, a rule never iterates plans itself: the
//! engine enumerates bindings matching the pattern and hands each one to
//! [`Rule::apply`] as an [`OptExpression`]. The rule answers with zero or
//! more replacement trees through [`RuleResult`]; the engine owns inserting
//! them into the memo and scheduling follow-up work.
//!
//! A structural match can still be semantically inapplicable, e.g. "this
//! filter is not a conjunction of key equalities". [`Rule::matches`] is the
//! hook for such checks; returning `false` skips the binding silently, it is
//! not an error.

mod pattern;
pub use pattern::*;
mod opt_expr;
pub use opt_expr::*;
mod convert;
pub use convert::*;
mod filter;
pub use filter::*;
mod limit;
pub use limit::*;
mod join;
pub use join::*;

use std::fmt::{Debug, Display, Formatter};

use crate::error::OptResult;
use crate::planner::{Group, GroupExpr, GroupExprId, GroupId, Memo, OptimizerConfig};
use crate::traits::TraitSet;

/// Identity of a registered rule, assigned by the
/// [`crate::planner::OptimizerConfigBuilder`] in registration order.
///
/// Used to record which rules have already fired on a memo expression, so
/// the same rule is never applied to the same expression twice.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct RuleId(pub(crate) usize);

impl Debug for RuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Use to identify applying order of rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum RulePromise {
    Low = 1,
    Medium = 2,
    High = 3,
}

/// Read-only view of the planning session handed to rules.
///
/// Rules resolve [`OptExpression`] handles through this; they can never
/// mutate the memo directly.
pub struct RuleContext<'a> {
    memo: &'a Memo,
    config: &'a OptimizerConfig,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(memo: &'a Memo, config: &'a OptimizerConfig) -> Self {
        Self { memo, config }
    }

    pub fn expr_at(&self, handle: GroupExprId) -> &GroupExpr {
        &self.memo[handle]
    }

    pub fn group_at(&self, handle: GroupId) -> &Group {
        &self.memo[handle]
    }

    pub fn config(&self) -> &OptimizerConfig {
        self.config
    }

    /// The abstract trait set of this session, i.e. one default value per
    /// registered trait dimension.
    pub fn default_traits(&self) -> TraitSet {
        self.config.trait_registry().default_set()
    }
}

pub struct RuleResult {
    exprs: OptExprVec,
}

impl Default for RuleResult {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleResult {
    pub fn new() -> Self {
        Self { exprs: vec![] }
    }

    pub fn add(&mut self, new_expr: OptExpression) {
        self.exprs.push(new_expr);
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn results(self) -> impl Iterator<Item = OptExpression> {
        self.exprs.into_iter()
    }

    #[cfg(test)]
    pub(crate) fn exprs(&self) -> &[OptExpression] {
        &self.exprs
    }
}

/// A rule should only focus on providing equivalent transformations of
/// optimizer expressions.
///
/// Rules must be deterministic: given the same memo state and the same
/// binding, `apply` must always produce the same output.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    /// Pattern for rule.
    fn pattern(&self) -> &Pattern;

    /// Semantic gate run per binding after the structural match. Returning
    /// `false` skips the binding; it is ordinary control flow, not an error.
    fn matches(&self, _input: &OptExpression, _ctx: &RuleContext) -> OptResult<bool> {
        Ok(true)
    }

    /// Apply the rule to one matched binding.
    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()>;

    /// Use to identify applying order of rules.
    fn promise(&self) -> RulePromise {
        RulePromise::Medium
    }
}
