use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::cost::Cost;
use crate::error::{OptError, OptResult};
use crate::plan::{Plan, PlanNode, PlanNodeIdGen, PlanNodeRef};
use crate::planner::{
    Binding, GroupExprId, GroupId, Memo, OptimizerConfig, SessionBudget,
};
use crate::rules::{OptExpression, RuleContext, RuleId, RuleResult};
use crate::stat::Statistics;
use crate::traits::{Convention, TraitSet};

/// A failed rule firing, kept for later inspection.
///
/// Rule errors never abort the search; the failing transformation is
/// discarded and the session continues with the remaining rules.
#[derive(Debug)]
pub struct Diagnostic {
    rule: String,
    expr: GroupExprId,
    error: OptError,
}

impl Diagnostic {
    fn new(rule: &str, expr: GroupExprId, error: OptError) -> Self {
        Self {
            rule: rule.to_string(),
            expr,
            error,
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn expr(&self) -> GroupExprId {
        self.expr
    }

    pub fn error(&self) -> &OptError {
        &self.error
    }
}

/// One scheduled rule firing: a rule bound to a candidate expression.
struct RuleCall {
    rule_id: RuleId,
    expr_id: GroupExprId,
    /// Length of the rewrite chain that produced the candidate. Caps
    /// rule sets whose outputs keep re-triggering each other.
    depth: u32,
}

/// One planning session.
///
/// Seeds the memo with the input plan, fires matching rules off a FIFO work
/// queue until fixed point or budget exhaustion, then extracts the
/// lowest-cost fully-converted plan for the required trait set.
///
/// A session is single-threaded and owns all of its state except the
/// immutable [`OptimizerConfig`]; concurrent compilations each run their own
/// session.
pub struct VolcanoOptimizer<'a> {
    config: &'a OptimizerConfig,
    budget: SessionBudget,
    memo: Memo,
    queue: VecDeque<RuleCall>,
    fired: usize,
    started_at: Option<Instant>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> VolcanoOptimizer<'a> {
    pub fn new(config: &'a OptimizerConfig) -> Self {
        Self::with_budget(config, SessionBudget::default())
    }

    pub fn with_budget(config: &'a OptimizerConfig, budget: SessionBudget) -> Self {
        Self {
            config,
            budget,
            memo: Memo::new(config.trait_registry().clone()),
            queue: VecDeque::new(),
            fired: 0,
            started_at: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    /// Failed rule firings recorded during the last [`optimize`] call.
    ///
    /// [`optimize`]: VolcanoOptimizer::optimize
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Rule firings consumed by the last [`optimize`] call.
    ///
    /// [`optimize`]: VolcanoOptimizer::optimize
    pub fn fired(&self) -> usize {
        self.fired
    }

    /// Compiles `plan` into the lowest-cost alternative realizing
    /// `required`.
    ///
    /// Returns either a complete, fully-converted plan or an error; no
    /// partially transformed plan ever escapes, including on budget
    /// exhaustion.
    pub fn optimize(&mut self, plan: Plan, required: TraitSet) -> OptResult<Plan> {
        self.config.trait_registry().validate(&required)?;

        self.memo = Memo::new(self.config.trait_registry().clone());
        self.queue.clear();
        self.diagnostics.clear();
        self.fired = 0;
        self.started_at = Some(Instant::now());

        let seeds = self.memo.init_with_plan(&plan)?;
        for expr_id in seeds {
            self.enqueue_matching_rules(expr_id, 0);
        }

        while let Some(call) = self.queue.pop_front() {
            self.check_budget()?;
            self.fire(call)?;
            self.memo.merge_duplicate_groups();
        }

        debug!("Search reached fixed point after {} rule firings", self.fired);

        self.extract_best_plan(&required)
    }

    fn check_budget(&self) -> OptResult<()> {
        if self.fired >= self.budget.max_firings {
            return Err(OptError::BudgetExceeded { fired: self.fired });
        }
        if let (Some(started_at), Some(timeout)) = (self.started_at, self.budget.timeout)
        {
            if started_at.elapsed() > timeout {
                return Err(OptError::BudgetExceeded { fired: self.fired });
            }
        }
        Ok(())
    }

    /// Fires one rule call: binds the pattern, runs the rule per binding and
    /// registers its output into the matched group.
    fn fire(&mut self, call: RuleCall) -> OptResult<()> {
        let expr_id = self.memo.resolve_expr(call.expr_id);
        if self.memo[expr_id].is_rule_applied(call.rule_id) {
            return Ok(());
        }
        self.fired += 1;

        let config = self.config;
        let rule = Arc::clone(config.rule(call.rule_id));

        debug!(
            "Applying rule {} to group expression {:?}",
            rule.name(),
            expr_id
        );

        // Bindings must be fully enumerated before any insertion; group
        // merges are deferred until the firing completes for the same
        // reason.
        let bindings: Vec<OptExpression> =
            Binding::new(expr_id, rule.pattern(), &self.memo)
                .into_iter()
                .collect();

        let mut outputs = Vec::new();
        for binding in bindings {
            let ctx = RuleContext::new(&self.memo, config);

            match rule.matches(&binding, &ctx) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(
                        "Rule {} structurally matched {:?} but is inapplicable",
                        rule.name(),
                        expr_id
                    );
                    continue;
                }
                Err(error) => {
                    self.diagnostics
                        .push(Diagnostic::new(rule.name(), expr_id, error));
                    continue;
                }
            }

            let mut result = RuleResult::new();
            match rule.apply(binding, &ctx, &mut result) {
                Ok(()) => outputs.extend(result.results()),
                Err(error) => {
                    self.diagnostics
                        .push(Diagnostic::new(rule.name(), expr_id, error));
                }
            }
        }

        for output in outputs {
            let mut new_exprs = Vec::new();
            match self.memo.insert_opt_expression(
                &output,
                Some(expr_id.group_id()),
                &mut new_exprs,
            ) {
                Ok(_) => {
                    for new_expr in new_exprs {
                        if call.depth >= self.config.max_rewrite_depth() {
                            debug!(
                                "Rewrite depth cap reached at {:?}, not scheduling \
                                 follow-up rules",
                                new_expr
                            );
                            continue;
                        }
                        self.enqueue_matching_rules(new_expr, call.depth + 1);
                    }
                }
                // A transformation that changes the row type has broken
                // logical equivalence; the memo can no longer be trusted.
                Err(error @ OptError::RowTypeMismatch { .. }) => return Err(error),
                Err(error) => {
                    self.diagnostics
                        .push(Diagnostic::new(rule.name(), expr_id, error));
                }
            }
        }

        self.memo[expr_id].set_rule_applied(call.rule_id);
        Ok(())
    }

    /// Schedules every registered rule whose pattern root matches the
    /// expression, in promise order.
    fn enqueue_matching_rules(&mut self, expr_id: GroupExprId, depth: u32) {
        let config = self.config;
        for idx in config.rule_order() {
            let rule = config.rule(RuleId(*idx));
            if self.memo[expr_id].matches_without_children(rule.pattern()) {
                self.queue.push_back(RuleCall {
                    rule_id: RuleId(*idx),
                    expr_id,
                    depth,
                });
            }
        }
    }

    fn extract_best_plan(&mut self, required: &TraitSet) -> OptResult<Plan> {
        let root = self.memo.root_group_id();
        let mut visiting = Vec::new();

        if self.optimize_group(root, required, &mut visiting)?.is_none() {
            if self
                .config
                .conversion_path(Convention::NONE, required.convention())
                .is_none()
            {
                debug!(
                    "Convention {} is unreachable from {} with the registered \
                     converter rules",
                    required.convention(),
                    Convention::NONE
                );
            }
            return Err(OptError::NoPlanFound {
                required: required.clone(),
            });
        }

        let mut id_gen = PlanNodeIdGen::default();
        let root_node = self.build_best_plan(root, required, &mut id_gen)?;
        Ok(Plan::new(root_node))
    }

    /// Finds the lowest-cost alternative of `group_id` satisfying
    /// `required`, caching the winner per required trait set.
    fn optimize_group(
        &mut self,
        group_id: GroupId,
        required: &TraitSet,
        visiting: &mut Vec<(GroupId, TraitSet)>,
    ) -> OptResult<Option<Cost>> {
        let group_id = self.memo.resolve_group(group_id);

        if let Some(winner) = self.memo[group_id].winner(required) {
            return Ok(Some(winner.lowest_cost()));
        }

        // Self-referential members (e.g. a sort whose input is its own
        // group) recurse with a weaker requirement; a revisit of the same
        // (group, requirement) state is a dead end, not an error.
        let state = (group_id, required.clone());
        if visiting.contains(&state) {
            return Ok(None);
        }
        visiting.push(state);

        let mut best: Option<(Cost, GroupExprId, Vec<TraitSet>)> = None;
        for expr_id in self.memo[group_id].expr_ids() {
            if let Some((cost, input_required)) =
                self.cost_of_expr(expr_id, required, visiting)?
            {
                if best.as_ref().map(|(c, ..)| cost < *c).unwrap_or(true) {
                    best = Some((cost, expr_id, input_required));
                }
            }
        }

        // No alternative provides the requirement outright; see whether an
        // enforcer can establish it on top of a weaker winner.
        let config = self.config;
        for enforcer in config.enforcers() {
            if enforcer.convention() != required.convention() {
                continue;
            }
            let operator = match enforcer.enforce(required) {
                Some(operator) => operator,
                None => continue,
            };

            let (expr_id, _) = self.memo.insert_expr(
                operator,
                required.clone(),
                vec![group_id],
                Some(group_id),
            )?;
            if let Some((cost, input_required)) =
                self.cost_of_expr(expr_id, required, visiting)?
            {
                if best.as_ref().map(|(c, ..)| cost < *c).unwrap_or(true) {
                    best = Some((cost, expr_id, input_required));
                }
            }
        }

        visiting.pop();

        if let Some((cost, expr_id, input_required)) = best {
            self.memo[group_id].update_winner(required, expr_id, input_required, cost);
            Ok(Some(cost))
        } else {
            Ok(None)
        }
    }

    /// Cost of one alternative for `required`: its own cost plus the best
    /// cost of each input under the requirements the operator derives.
    fn cost_of_expr(
        &mut self,
        expr_id: GroupExprId,
        required: &TraitSet,
        visiting: &mut Vec<(GroupId, TraitSet)>,
    ) -> OptResult<Option<(Cost, Vec<TraitSet>)>> {
        let expr_id = self.memo.resolve_expr(expr_id);
        let (operator, traits, inputs) = {
            let expr = &self.memo[expr_id];
            (
                expr.operator().clone(),
                expr.traits().clone(),
                expr.inputs().to_vec(),
            )
        };

        // Abstract alternatives are never executable.
        if traits.convention().is_none() {
            return Ok(None);
        }
        if !traits.satisfies(required) {
            return Ok(None);
        }

        let input_required = operator.required_input_traits(&traits);
        if input_required.len() != inputs.len() {
            debug!(
                "Operator {} derived {} input requirements for {} inputs, skipping",
                operator,
                input_required.len(),
                inputs.len()
            );
            return Ok(None);
        }

        let output_stat = self.memo[expr_id.group_id()].stats().clone();
        let input_stats: Vec<Statistics> = inputs
            .iter()
            .map(|g| self.memo[*g].stats().clone())
            .collect();

        let mut total = match self.config.cost_model().estimate_cost(
            &operator,
            &traits,
            &output_stat,
            &input_stats,
        ) {
            Ok(cost) => cost,
            Err(error) => {
                self.diagnostics
                    .push(Diagnostic::new("cost model", expr_id, error));
                return Ok(None);
            }
        };

        for (input_group, child_required) in inputs.iter().zip(input_required.iter()) {
            match self.optimize_group(*input_group, child_required, visiting)? {
                Some(cost) => total += cost,
                None => return Ok(None),
            }
        }

        Ok(Some((total, input_required)))
    }

    fn build_best_plan(
        &self,
        group_id: GroupId,
        required: &TraitSet,
        id_gen: &mut PlanNodeIdGen,
    ) -> OptResult<PlanNodeRef> {
        let group_id = self.memo.resolve_group(group_id);
        let winner = self.memo[group_id].winner(required).ok_or_else(|| {
            OptError::NoPlanFound {
                required: required.clone(),
            }
        })?;

        let expr = &self.memo[winner.group_expr_id()];
        let (operator, traits, row_type, inputs) = (
            expr.operator().clone(),
            expr.traits().clone(),
            expr.row_type(),
            expr.inputs().to_vec(),
        );
        let input_required = winner.input_required.clone();

        let mut children = Vec::with_capacity(inputs.len());
        for (input_group, child_required) in inputs.iter().zip(input_required.iter()) {
            children.push(self.build_best_plan(*input_group, child_required, id_gen)?);
        }

        let id = id_gen.gen_next();
        Ok(Arc::new(PlanNode::new(id, operator, traits, row_type, children)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::OptError;
    use crate::expr::{col, lit};
    use crate::operator::{Operator, Sort};
    use crate::plan::{explain_to_string, LogicalPlanBuilder};
    use crate::planner::{
        Enforcer, OptimizerConfig, SessionBudget, VolcanoOptimizer,
    };
    use crate::test_utils::{t1, CopyConverterRule};
    use crate::traits::{Collation, ColumnOrder, Convention, TraitRegistry, TraitSet};

    const TEST: Convention = Convention::new("TEST");

    fn required(convention: Convention) -> TraitSet {
        TraitRegistry::default()
            .default_set()
            .with_convention(convention)
    }

    fn test_plan() -> crate::plan::Plan {
        LogicalPlanBuilder::new()
            .scan(t1())
            .filter(col("c1").eq(lit(5i64)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_optimize_converts_whole_plan() {
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        let plan = config.optimize(test_plan(), required(TEST)).unwrap();

        for node in plan.bfs_iterator() {
            assert_eq!(TEST, node.traits().convention());
        }
        // Conversion never touches the row type.
        assert_eq!(t1().schema(), plan.root().row_type());
        assert!(matches!(plan.root().operator(), Operator::Filter(_)));
    }

    #[test]
    fn test_chained_conversion() {
        let x = Convention::new("X");
        let y = Convention::new("Y");
        let z = Convention::new("Z");

        // X→Y and Y→Z are registered, a direct X→Z is not.
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                x,
            )))
            .register_converter_rule(Arc::new(CopyConverterRule::new(x, y)))
            .register_converter_rule(Arc::new(CopyConverterRule::new(y, z)))
            .build();

        let plan = config.optimize(test_plan(), required(z)).unwrap();

        for node in plan.bfs_iterator() {
            assert_eq!(z, node.traits().convention());
        }
    }

    #[test]
    fn test_single_hop_conversion_failure_is_recoverable() {
        use crate::test_utils::RejectingConverterRule;

        // One converter refuses every expression, the other accepts; the
        // refusal is local, the session still succeeds.
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(RejectingConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();
        let plan = config.optimize(test_plan(), required(TEST)).unwrap();
        assert_eq!(TEST, plan.root().traits().convention());

        // With only the refusing converter, no chain reaches the target.
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(RejectingConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();
        let err = config.optimize(test_plan(), required(TEST)).unwrap_err();
        assert!(matches!(err, OptError::NoPlanFound { .. }));
    }

    #[test]
    fn test_no_plan_found_without_converters() {
        let config = OptimizerConfig::builder().build();

        let err = config.optimize(test_plan(), required(TEST)).unwrap_err();
        assert!(matches!(err, OptError::NoPlanFound { .. }));
    }

    #[test]
    fn test_budget_exceeded_is_distinct_from_no_plan() {
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        let mut session = VolcanoOptimizer::with_budget(
            &config,
            SessionBudget {
                max_firings: 0,
                timeout: None,
            },
        );
        let err = session.optimize(test_plan(), required(TEST)).unwrap_err();
        assert!(matches!(err, OptError::BudgetExceeded { .. }));
    }

    #[test]
    fn test_determinism() {
        let config = OptimizerConfig::builder()
            .register_rule(Arc::new(crate::rules::MergeFiltersRule::new()))
            .register_rule(Arc::new(crate::rules::PushLimitToTableScanRule::new()))
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        let build = || {
            LogicalPlanBuilder::new()
                .scan(t1())
                .filter(col("c1").eq(lit(5i64)))
                .filter(col("c2").eq(lit("x")))
                .limit(10)
                .build()
                .unwrap()
        };

        let first = config.optimize(build(), required(TEST)).unwrap();
        let second = config.optimize(build(), required(TEST)).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            explain_to_string(&first).unwrap(),
            explain_to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_join_exploration_terminates_and_preserves_row_type() {
        use crate::operator::JoinType;
        use crate::test_utils::t2;

        // Commutation emits a different operator kind (a projection over the
        // swapped join) than the matched shape, and its output re-triggers
        // the rule on the swapped join. The memo dedup closes the loop.
        let config = OptimizerConfig::builder()
            .register_rule(Arc::new(crate::rules::CommutateJoinRule::new()))
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.scan(t2()).build().unwrap().root();
            builder
                .scan(t1())
                .join(JoinType::Inner, col("c1").eq(col("t2_c1")), right)
                .build()
                .unwrap()
        };
        let original_row_type = plan.root().row_type();

        let plan = config.optimize(plan, required(TEST)).unwrap();

        assert_eq!(original_row_type, plan.root().row_type());
        assert_eq!(TEST, plan.root().traits().convention());
    }

    struct TestSortEnforcer;

    impl Enforcer for TestSortEnforcer {
        fn convention(&self) -> Convention {
            TEST
        }

        fn enforce(&self, required: &TraitSet) -> Option<Operator> {
            let collation = required.collation();
            if collation.is_empty() {
                return None;
            }
            Some(Operator::Sort(Sort::new(collation)))
        }
    }

    fn sorted_requirement() -> TraitSet {
        required(TEST).with_collation(Collation::new(vec![ColumnOrder::asc("c1")]))
    }

    #[test]
    fn test_required_collation_without_enforcer_is_unrealizable() {
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        // No sort-introducing rule registered: the requirement must fail
        // loudly instead of silently dropping the collation.
        let err = config
            .optimize(test_plan(), sorted_requirement())
            .unwrap_err();
        assert!(matches!(err, OptError::NoPlanFound { .. }));
    }

    #[test]
    fn test_enforcer_establishes_required_collation() {
        let config = OptimizerConfig::builder()
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .register_enforcer(Arc::new(TestSortEnforcer))
            .build();

        let plan = config.optimize(test_plan(), sorted_requirement()).unwrap();

        let root = plan.root();
        assert!(matches!(root.operator(), Operator::Sort(_)));
        assert!(root.traits().satisfies(&sorted_requirement()));
        assert!(matches!(root.inputs()[0].operator(), Operator::Filter(_)));
        // Sorting is a pass-through for the row type.
        assert_eq!(t1().schema(), root.row_type());
    }

    #[test]
    fn test_diagnostics_do_not_abort_search() {
        struct FailingRule;

        impl crate::rules::Rule for FailingRule {
            fn name(&self) -> &str {
                "FailingRule"
            }

            fn pattern(&self) -> &crate::rules::Pattern {
                use crate::rules::abstract_node;
                lazy_static! {
                    static ref PATTERN: crate::rules::Pattern =
                        crate::rules::Pattern::new_leaf(abstract_node(|op| {
                            matches!(op, Operator::Filter(_))
                        }));
                }
                &PATTERN
            }

            fn apply(
                &self,
                _input: crate::rules::OptExpression,
                _ctx: &crate::rules::RuleContext,
                _result: &mut crate::rules::RuleResult,
            ) -> crate::error::OptResult<()> {
                Err(OptError::UnsupportedOperator {
                    operator: "Filter".to_string(),
                    context: "FailingRule",
                })
            }
        }

        let config = OptimizerConfig::builder()
            .register_rule(Arc::new(FailingRule))
            .register_converter_rule(Arc::new(CopyConverterRule::new(
                Convention::NONE,
                TEST,
            )))
            .build();

        let mut session = VolcanoOptimizer::new(&config);
        let plan = session.optimize(test_plan(), required(TEST)).unwrap();

        assert!(matches!(plan.root().operator(), Operator::Filter(_)));
        assert_eq!(1, session.diagnostics().len());
        assert_eq!("FailingRule", session.diagnostics()[0].rule());
    }
}
