//! The planning engine.
//!
//! One [`OptimizerConfig`] is built at process initialization, carrying the
//! registered trait dimensions, rules, converter rules, enforcers and the
//! cost model. It is immutable afterwards and shared by reference across
//! concurrently running sessions; each [`VolcanoOptimizer`] session owns its
//! private [`Memo`] and work queue, so sessions never share mutable state.

mod memo;
pub use memo::*;
mod binding;
pub(crate) use binding::*;
mod search;
pub use search::*;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::cost::{CostModel, SimpleCostModel};
use crate::error::OptResult;
use crate::operator::Operator;
use crate::plan::Plan;
use crate::rules::{ConverterRule, ConverterRuleAdapter, Rule, RuleId};
use crate::traits::{Convention, TraitDef, TraitRegistry, TraitSet};

/// Inserts a missing physical property on top of an otherwise acceptable
/// alternative, e.g. a sort establishing a required collation.
///
/// Without a registered enforcer, a required trait no alternative provides
/// makes the plan search fail with "no physical plan found"; enforcers are
/// how backends opt into closing that gap.
pub trait Enforcer: Send + Sync {
    /// Convention this enforcer operates in.
    fn convention(&self) -> Convention;

    /// Operator establishing the unmet part of `required`, or `None` if
    /// this enforcer cannot help.
    fn enforce(&self, required: &TraitSet) -> Option<Operator>;
}

/// Budget of one planning session.
///
/// The budget is checked at every rule firing; exceeding it aborts the whole
/// session rather than returning a partially optimized plan.
#[derive(Clone, Debug)]
pub struct SessionBudget {
    /// Maximum number of rule firings.
    pub max_firings: usize,
    /// Optional wall clock limit.
    pub timeout: Option<Duration>,
}

impl Default for SessionBudget {
    fn default() -> Self {
        Self {
            max_firings: 10_000,
            timeout: None,
        }
    }
}

/// Static rule and trait registry shared by all planning sessions.
///
/// Built once through [`OptimizerConfigBuilder`]; registration is a builder
/// step, never a mutation of live state.
pub struct OptimizerConfig {
    registry: TraitRegistry,
    rules: Vec<Arc<dyn Rule>>,
    /// Rule indexes in firing order: higher promise first, registration
    /// order within equal promise.
    rule_order: Vec<usize>,
    /// Converter rule indexes by (source, target) convention.
    converters: HashMap<(Convention, Convention), Vec<usize>>,
    enforcers: Vec<Arc<dyn Enforcer>>,
    cost_model: Arc<dyn CostModel>,
    /// Cap on chains of rewrites derived from one seed expression. Guards
    /// against rule sets that keep re-deriving each other's output.
    max_rewrite_depth: u32,
}

impl OptimizerConfig {
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::default()
    }

    pub fn trait_registry(&self) -> &TraitRegistry {
        &self.registry
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost_model.as_ref()
    }

    pub fn enforcers(&self) -> &[Arc<dyn Enforcer>] {
        &self.enforcers
    }

    pub fn max_rewrite_depth(&self) -> u32 {
        self.max_rewrite_depth
    }

    pub(crate) fn rule(&self, rule_id: RuleId) -> &Arc<dyn Rule> {
        &self.rules[rule_id.0]
    }

    pub(crate) fn rule_order(&self) -> &[usize] {
        &self.rule_order
    }

    /// Chain of conventions reaching `to` from `from` through registered
    /// converter rules, shortest first. `None` if unreachable.
    pub fn conversion_path(
        &self,
        from: Convention,
        to: Convention,
    ) -> Option<Vec<Convention>> {
        if from == to {
            return Some(vec![from]);
        }

        let mut edges: Vec<(Convention, Convention)> =
            self.converters.keys().copied().collect();
        edges.sort_by_key(|(src, dest)| (src.name(), dest.name()));

        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([vec![from]]);
        while let Some(path) = queue.pop_front() {
            let last = *path.last().unwrap();
            for (src, dest) in &edges {
                if *src != last || visited.contains(dest) {
                    continue;
                }
                let mut next = path.clone();
                next.push(*dest);
                if *dest == to {
                    return Some(next);
                }
                visited.insert(*dest);
                queue.push_back(next);
            }
        }
        None
    }

    /// Runs one planning session with the default budget.
    pub fn optimize(&self, plan: Plan, required: TraitSet) -> OptResult<Plan> {
        VolcanoOptimizer::new(self).optimize(plan, required)
    }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    registry: TraitRegistry,
    rules: Vec<Arc<dyn Rule>>,
    converters: HashMap<(Convention, Convention), Vec<usize>>,
    enforcers: Vec<Arc<dyn Enforcer>>,
    cost_model: Option<Arc<dyn CostModel>>,
    max_rewrite_depth: Option<u32>,
}

impl OptimizerConfigBuilder {
    /// Registers a trait dimension. Must happen before any plan node
    /// referencing that dimension is constructed.
    pub fn register_trait_def(mut self, def: TraitDef) -> Self {
        self.registry.register(def);
        self
    }

    pub fn register_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn register_converter_rule(mut self, rule: Arc<dyn ConverterRule>) -> Self {
        let key = (rule.source_convention(), rule.target_convention());
        let adapter: Arc<dyn Rule> = Arc::new(ConverterRuleAdapter::new(rule));
        self.converters.entry(key).or_default().push(self.rules.len());
        self.rules.push(adapter);
        self
    }

    pub fn register_enforcer(mut self, enforcer: Arc<dyn Enforcer>) -> Self {
        self.enforcers.push(enforcer);
        self
    }

    pub fn with_cost_model(mut self, cost_model: Arc<dyn CostModel>) -> Self {
        self.cost_model = Some(cost_model);
        self
    }

    pub fn with_max_rewrite_depth(mut self, depth: u32) -> Self {
        self.max_rewrite_depth = Some(depth);
        self
    }

    pub fn build(self) -> OptimizerConfig {
        let mut rule_order: Vec<usize> = (0..self.rules.len()).collect();
        rule_order.sort_by_key(|idx| std::cmp::Reverse(self.rules[*idx].promise()));

        OptimizerConfig {
            registry: self.registry,
            rules: self.rules,
            rule_order,
            converters: self.converters,
            enforcers: self.enforcers,
            cost_model: self
                .cost_model
                .unwrap_or_else(|| Arc::new(SimpleCostModel::default())),
            max_rewrite_depth: self.max_rewrite_depth.unwrap_or(32),
        }
    }
}
