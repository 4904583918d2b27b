use std::sync::Arc;

use log::trace;

use crate::error::OptResult;
use crate::rules::OptExprNode::OperatorNode;
use crate::rules::{
    OptExpression, Pattern, Rule, RuleContext, RulePromise, RuleResult,
};
use crate::traits::Convention;

/// A rule rewriting an expression from one convention into another while
/// preserving row type and logical semantics.
///
/// The convention pair is declared statically so the engine can index
/// converter rules by (source, target) and reason about reachability when a
/// direct conversion is missing: a converted expression re-enters the rule
/// queue like any other, so registered X→Y and Y→Z rules compose into X→Z
/// without further help.
///
/// `convert` returning `Ok(None)` means "this expression cannot be converted
/// directly". That is a recoverable condition, not an error; the search goes
/// on with other members and other conversion chains.
pub trait ConverterRule: Send + Sync {
    fn name(&self) -> &str;

    fn source_convention(&self) -> Convention;

    fn target_convention(&self) -> Convention;

    /// Custom operand pattern, for converters that need to look below the
    /// expression they convert. The root must still only match expressions
    /// in the source convention.
    fn pattern(&self) -> Option<&Pattern> {
        None
    }

    /// Semantic gate, see [`Rule::matches`].
    fn matches(&self, _input: &OptExpression, _ctx: &RuleContext) -> OptResult<bool> {
        Ok(true)
    }

    fn convert(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>>;
}

/// Runs a [`ConverterRule`] inside the ordinary match-and-fire loop.
///
/// Ensures every emitted root carries the declared target convention, so a
/// converter cannot accidentally register its output as abstract.
pub struct ConverterRuleAdapter {
    inner: Arc<dyn ConverterRule>,
    pattern: Pattern,
}

impl ConverterRuleAdapter {
    pub fn new(inner: Arc<dyn ConverterRule>) -> Self {
        let pattern = Pattern::converting(inner.source_convention());
        Self { inner, pattern }
    }

    pub fn source_convention(&self) -> Convention {
        self.inner.source_convention()
    }

    pub fn target_convention(&self) -> Convention {
        self.inner.target_convention()
    }
}

impl Rule for ConverterRuleAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn pattern(&self) -> &Pattern {
        self.inner.pattern().unwrap_or(&self.pattern)
    }

    fn matches(&self, input: &OptExpression, ctx: &RuleContext) -> OptResult<bool> {
        self.inner.matches(input, ctx)
    }

    fn apply(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        match self.inner.convert(input, ctx)? {
            Some(converted) => {
                result.add(self.force_target_convention(converted, ctx));
                Ok(())
            }
            None => {
                trace!(
                    "Converter rule {} found no direct conversion to {}",
                    self.inner.name(),
                    self.target_convention()
                );
                Ok(())
            }
        }
    }

    fn promise(&self) -> RulePromise {
        RulePromise::High
    }
}

impl ConverterRuleAdapter {
    fn force_target_convention(
        &self,
        converted: OptExpression,
        ctx: &RuleContext,
    ) -> OptExpression {
        match converted.node() {
            OperatorNode {
                operator,
                traits: None,
            } => {
                let traits = ctx
                    .default_traits()
                    .with_convention(self.target_convention());
                let inputs = converted.inputs().to_vec();
                OptExpression::with_operator_traits(operator.clone(), traits, inputs)
            }
            _ => converted,
        }
    }
}
