use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::mem::swap;
use std::ops::{Index, IndexMut};

use arrow_schema::SchemaRef;
use itertools::Itertools;
use prettytable::{row, Table};

use crate::cost::Cost;
use crate::error::{OptError, OptResult};
use crate::operator::{Operator, OperatorTrait};
use crate::plan::Plan;
use crate::rules::OptExprNode::{ExprHandleNode, GroupHandleNode, OperatorNode};
use crate::rules::{OptExpression, Pattern, RuleId};
use crate::stat::Statistics;
use crate::traits::{TraitRegistry, TraitSet};

/// A group id is an index into the memo's group table.
#[derive(Hash, Eq, PartialEq, Clone, Copy, Ord, PartialOrd)]
pub struct GroupId(pub usize);

impl Debug for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A group expression id is an index of one member within a group.
#[derive(Hash, Eq, PartialEq, Clone, Copy)]
pub struct GroupExprId {
    pub(crate) group_id: GroupId,
    pub(crate) expr_id: usize,
}

impl GroupExprId {
    pub fn new(group_id: GroupId, expr_id: usize) -> Self {
        Self { group_id, expr_id }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }
}

impl Debug for GroupExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{:?}", self.group_id, self.expr_id)
    }
}

impl Display for GroupExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{:?}", self.group_id, self.expr_id)
    }
}

/// One member of an equivalence group: an operator with its payload, the
/// trait set it carries, and its inputs as group handles.
///
/// Inputs are handles into the session-owned memo rather than owning
/// pointers, so any number of alternatives can share one child group.
pub struct GroupExpr {
    operator: Operator,
    inputs: Vec<GroupId>,
    traits: TraitSet,
    row_type: SchemaRef,
    /// Rules already applied to this group expression.
    applied_rules: HashSet<RuleId>,
}

impl GroupExpr {
    fn new(
        operator: Operator,
        inputs: Vec<GroupId>,
        traits: TraitSet,
        row_type: SchemaRef,
    ) -> Self {
        Self {
            operator,
            inputs,
            traits,
            row_type,
            applied_rules: HashSet::new(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn inputs(&self) -> &[GroupId] {
        &self.inputs
    }

    pub fn traits(&self) -> &TraitSet {
        &self.traits
    }

    pub fn row_type(&self) -> SchemaRef {
        self.row_type.clone()
    }

    /// Whether this expression still carries convention `NONE`.
    pub fn is_abstract(&self) -> bool {
        self.traits.convention().is_none()
    }

    /// Canonical identity of the logical shape: operator kind, payload and
    /// input group identities. Traits are deliberately excluded, converted
    /// alternatives of one shape share a digest.
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.operator.hash(&mut hasher);
        self.inputs.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn is_rule_applied(&self, rule_id: RuleId) -> bool {
        self.applied_rules.contains(&rule_id)
    }

    pub(crate) fn set_rule_applied(&mut self, rule_id: RuleId) {
        self.applied_rules.insert(rule_id);
    }

    /// Structural match of this expression against a pattern root, without
    /// descending into children.
    pub(crate) fn matches_without_children(&self, pattern: &Pattern) -> bool {
        (pattern.predict)(&self.operator)
            && pattern
                .convention
                .map(|c| self.traits.convention() == c)
                .unwrap_or(true)
            && pattern
                .children
                .as_ref()
                .map(|c| c.len() == self.inputs.len())
                .unwrap_or(true)
    }

    fn expr_key(&self) -> ExprKey {
        ExprKey {
            operator: self.operator.clone(),
            inputs: self.inputs.clone(),
            traits: self.traits.clone(),
        }
    }

    fn logical_key(&self) -> LogicalKey {
        LogicalKey {
            operator: self.operator.clone(),
            inputs: self.inputs.clone(),
        }
    }
}

/// Identity of one concrete member, logical shape plus traits.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub(crate) struct ExprKey {
    operator: Operator,
    inputs: Vec<GroupId>,
    traits: TraitSet,
}

/// Identity of a logical shape, the hashable form of the digest.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub(crate) struct LogicalKey {
    operator: Operator,
    inputs: Vec<GroupId>,
}

/// The best known alternative of a group for one required trait set.
#[derive(Debug, Clone)]
pub struct Winner {
    pub(crate) lowest_cost: Cost,
    pub(crate) group_expr_id: GroupExprId,
    /// Required trait sets of the winner's inputs.
    pub(crate) input_required: Vec<TraitSet>,
}

impl Winner {
    pub fn lowest_cost(&self) -> Cost {
        self.lowest_cost
    }

    pub fn group_expr_id(&self) -> GroupExprId {
        self.group_expr_id
    }
}

/// A set of logically equivalent group expressions.
///
/// All members return the same result set, so the row type and statistics
/// live here. Per required trait set, the group additionally remembers the
/// best alternative found so far.
pub struct Group {
    group_id: GroupId,
    row_type: SchemaRef,
    stats: Statistics,
    exprs: Vec<GroupExpr>,
    /// Lowest cost alternative for each required trait set.
    best_plans: HashMap<TraitSet, Winner>,
}

impl Group {
    fn new(group_id: GroupId, row_type: SchemaRef, stats: Statistics) -> Self {
        Self {
            group_id,
            row_type,
            stats,
            exprs: vec![],
            best_plans: HashMap::new(),
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn row_type(&self) -> SchemaRef {
        self.row_type.clone()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Member ids in insertion order.
    pub fn expr_ids(&self) -> Vec<GroupExprId> {
        (0..self.exprs.len())
            .map(|expr_id| GroupExprId::new(self.group_id, expr_id))
            .collect()
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub(crate) fn winner(&self, required: &TraitSet) -> Option<&Winner> {
        self.best_plans.get(required)
    }

    /// Replaces the cached best plan if `cost` is lower.
    ///
    /// Once a best plan is recorded its cost only ever decreases for the
    /// lifetime of the session.
    pub(crate) fn update_winner(
        &mut self,
        required: &TraitSet,
        group_expr_id: GroupExprId,
        input_required: Vec<TraitSet>,
        cost: Cost,
    ) {
        if let Some(winner) = self.best_plans.get(required) {
            if winner.lowest_cost <= cost {
                return;
            }
        }

        self.best_plans.insert(
            required.clone(),
            Winner {
                lowest_cost: cost,
                group_expr_id,
                input_required,
            },
        );
    }

    fn insert_expr(&mut self, expr: GroupExpr) -> GroupExprId {
        let expr_id = self.exprs.len();
        self.exprs.push(expr);
        GroupExprId::new(self.group_id, expr_id)
    }
}

impl Index<GroupExprId> for Group {
    type Output = GroupExpr;

    fn index(&self, index: GroupExprId) -> &Self::Output {
        &self.exprs[index.expr_id]
    }
}

impl IndexMut<GroupExprId> for Group {
    fn index_mut(&mut self, index: GroupExprId) -> &mut Self::Output {
        &mut self.exprs[index.expr_id]
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Group {:?}:", &self.group_id.0)?;

        let mut table = Table::new();
        table.add_row(row!["Id", "Operator", "Traits", "Inputs"]);
        for (expr_id, expr) in self.exprs.iter().enumerate() {
            table.add_row(row![
                expr_id,
                format!("{}", expr.operator),
                format!("{}", expr.traits),
                format!("{:?}", expr.inputs)
            ]);
        }

        writeln!(f, "{}", table)
    }
}

/// Dynamic programming table storing equivalence groups.
///
/// The memo is exclusively owned by one planning session and dropped with
/// it; nothing in here is ever shared across sessions.
pub struct Memo {
    registry: TraitRegistry,
    groups: HashMap<GroupId, Group>,
    root_group_id: GroupId,
    next_group_id: usize,

    /// Used to avoid inserting duplicate group expressions.
    expr_index: HashMap<ExprKey, GroupExprId>,
    /// Maps each known logical shape to the group owning it.
    logical_index: HashMap<LogicalKey, GroupId>,

    /// Records which group a merged group has been merged into.
    merged_groups: HashMap<GroupId, GroupId>,
    /// Records where a merged group's expressions moved to.
    merged_exprs: HashMap<GroupExprId, GroupExprId>,

    /// Duplicated group pairs found but not merged yet.
    ///
    /// Merging while a rule firing is in flight would invalidate its
    /// bindings, so duplicates are only marked here and merged between
    /// firings.
    pending_merges: Vec<(GroupId, GroupId)>,
}

impl Memo {
    pub fn new(registry: TraitRegistry) -> Self {
        Self {
            registry,
            groups: HashMap::new(),
            root_group_id: GroupId(0),
            next_group_id: 0,
            expr_index: HashMap::new(),
            logical_index: HashMap::new(),
            merged_groups: HashMap::new(),
            merged_exprs: HashMap::new(),
            pending_merges: vec![],
        }
    }

    /// Registers a whole plan bottom up and makes its root the memo root.
    ///
    /// Returns the newly created expression ids in registration order.
    pub fn init_with_plan(&mut self, plan: &Plan) -> OptResult<Vec<GroupExprId>> {
        let plan_nodes = plan.bfs_iterator().collect::<Vec<_>>();
        let mut node_to_group = HashMap::with_capacity(plan_nodes.len());
        let mut new_exprs = Vec::with_capacity(plan_nodes.len());

        for node in plan_nodes.into_iter().rev() {
            let inputs = node
                .inputs()
                .iter()
                .map(|input| *node_to_group.get(&input.id()).unwrap())
                .collect();

            let (expr_id, is_new) = self.insert_expr(
                node.operator().clone(),
                node.traits().clone(),
                inputs,
                None,
            )?;
            if is_new {
                new_exprs.push(expr_id);
            }
            node_to_group.insert(node.id(), expr_id.group_id);
        }

        self.root_group_id = *node_to_group.get(&plan.root().id()).unwrap();
        Ok(new_exprs)
    }

    pub fn root_group_id(&self) -> GroupId {
        self.resolve_group(self.root_group_id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group ids in ascending order.
    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().sorted().collect()
    }

    /// Inserts a rule result and returns the id of its root expression.
    ///
    /// Newly created expression ids, including those of operator nodes
    /// nested below the root, are appended to `new_exprs`. This method only
    /// ever creates groups and expressions; duplicated groups found along
    /// the way are marked and merged later, see [`Memo::merge_duplicate_groups`].
    pub(crate) fn insert_opt_expression(
        &mut self,
        opt_expr: &OptExpression,
        target_group: Option<GroupId>,
        new_exprs: &mut Vec<GroupExprId>,
    ) -> OptResult<GroupExprId> {
        match opt_expr.node() {
            ExprHandleNode(expr_id) => Ok(self.resolve_expr(*expr_id)),
            GroupHandleNode(_) => Err(OptError::internal(
                "group handle cannot be inserted directly",
            )),
            OperatorNode { operator, traits } => {
                let mut input_groups = Vec::with_capacity(opt_expr.inputs().len());
                for input in opt_expr.inputs() {
                    let group_id = match input.node() {
                        GroupHandleNode(group_id) => self.resolve_group(*group_id),
                        _ => {
                            self.insert_opt_expression(input, None, new_exprs)?
                                .group_id
                        }
                    };
                    input_groups.push(group_id);
                }

                let traits = match traits {
                    Some(traits) => traits.clone(),
                    None => self.registry.default_set(),
                };

                let (expr_id, is_new) = self.insert_expr(
                    operator.clone(),
                    traits,
                    input_groups,
                    target_group,
                )?;
                if is_new {
                    new_exprs.push(expr_id);
                }
                Ok(expr_id)
            }
        }
    }

    /// Inserts one expression, deduplicating against everything already
    /// registered.
    ///
    /// Returns the expression id and whether it was newly created.
    pub(crate) fn insert_expr(
        &mut self,
        operator: Operator,
        traits: TraitSet,
        inputs: Vec<GroupId>,
        target_group: Option<GroupId>,
    ) -> OptResult<(GroupExprId, bool)> {
        self.registry.validate(&traits)?;

        let inputs: Vec<GroupId> =
            inputs.into_iter().map(|g| self.resolve_group(g)).collect();
        let target_group = target_group.map(|g| self.resolve_group(g));

        let input_types: Vec<SchemaRef> = inputs
            .iter()
            .map(|g| self[*g].row_type())
            .collect();
        let row_type = operator.derive_row_type(&input_types)?;

        let expr_key = ExprKey {
            operator: operator.clone(),
            inputs: inputs.clone(),
            traits: traits.clone(),
        };

        if let Some(existing) = self.expr_index.get(&expr_key).copied() {
            let existing = self.resolve_expr(existing);
            if let Some(target) = target_group {
                if target != existing.group_id {
                    self.mark_duplicated_group(target, existing.group_id);
                }
            }
            return Ok((existing, false));
        }

        let logical_key = LogicalKey {
            operator: operator.clone(),
            inputs: inputs.clone(),
        };

        // The owning group is the one already holding this logical shape;
        // otherwise the requested target; otherwise a fresh group.
        let group_id = match self.logical_index.get(&logical_key).copied() {
            Some(existing_group) => {
                let existing_group = self.resolve_group(existing_group);
                if let Some(target) = target_group {
                    if target != existing_group {
                        self.mark_duplicated_group(target, existing_group);
                    }
                }
                existing_group
            }
            None => match target_group {
                Some(target) => target,
                None => {
                    let input_stats: Vec<Statistics> = inputs
                        .iter()
                        .map(|g| self[*g].stats().clone())
                        .collect();
                    let stats = operator.derive_statistics(&input_stats);
                    self.new_group(row_type.clone(), stats)
                }
            },
        };

        // A transformation may never change what a group returns.
        if self[group_id].row_type() != row_type {
            return Err(OptError::RowTypeMismatch {
                expected: self[group_id].row_type(),
                actual: row_type,
            });
        }

        let expr = GroupExpr::new(operator, inputs, traits, row_type);
        let expr_id = self
            .groups
            .get_mut(&group_id)
            .unwrap()
            .insert_expr(expr);

        self.expr_index.insert(expr_key, expr_id);
        self.logical_index.entry(logical_key).or_insert(group_id);

        Ok((expr_id, true))
    }

    fn new_group(&mut self, row_type: SchemaRef, stats: Statistics) -> GroupId {
        let group_id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        self.groups
            .insert(group_id, Group::new(group_id, row_type, stats));
        group_id
    }

    /// Marks two groups as logically identical, to be merged between
    /// firings.
    fn mark_duplicated_group(&mut self, a: GroupId, b: GroupId) {
        if a != b {
            self.pending_merges.push((a, b));
        }
    }

    pub(crate) fn has_pending_merges(&self) -> bool {
        !self.pending_merges.is_empty()
    }

    /// Processes all pending merges.
    ///
    /// Merging can reveal further duplicates (two shapes becoming identical
    /// once their inputs are unified), so this runs until none are left.
    pub(crate) fn merge_duplicate_groups(&mut self) {
        while !self.pending_merges.is_empty() {
            let mut pending = vec![];
            swap(&mut pending, &mut self.pending_merges);

            for (a, b) in pending {
                let a = self.resolve_group(a);
                let b = self.resolve_group(b);
                if a == b {
                    continue;
                }
                // The smaller id survives, which keeps merges convergent.
                let (dest, src) = if a < b { (a, b) } else { (b, a) };
                self.merge_group(src, dest);
            }

            self.rewrite_group_references();
        }
    }

    fn merge_group(&mut self, src: GroupId, dest: GroupId) {
        let src_group = self.groups.remove(&src).unwrap();
        self.merged_groups.insert(src, dest);

        // Move member expressions.
        for (old_expr_id, expr) in src_group
            .exprs
            .into_iter()
            .enumerate()
            .map(|(expr_id, expr)| (GroupExprId::new(src, expr_id), expr))
        {
            let dest_group = self.groups.get_mut(&dest).unwrap();
            let new_expr_id = dest_group.insert_expr(expr);
            self.merged_exprs.insert(old_expr_id, new_expr_id);
        }

        // Merge best plans, keeping the lower cost per trait set.
        for (required, mut winner) in src_group.best_plans {
            winner.group_expr_id = self.resolve_expr(winner.group_expr_id);
            let dest_group = self.groups.get_mut(&dest).unwrap();
            match dest_group.best_plans.get(&required) {
                Some(existing) if existing.lowest_cost <= winner.lowest_cost => {}
                _ => {
                    dest_group.best_plans.insert(required, winner);
                }
            }
        }

        if self.root_group_id == src {
            self.root_group_id = dest;
        }
    }

    /// Rewrites all input handles to canonical group ids and rebuilds the
    /// dedup indexes. Newly discovered duplicates are queued for the next
    /// round.
    fn rewrite_group_references(&mut self) {
        let mapping = self.merged_groups.clone();
        let resolve = |mut group_id: GroupId| {
            while let Some(next) = mapping.get(&group_id) {
                group_id = *next;
            }
            group_id
        };

        for group in self.groups.values_mut() {
            for expr in group.exprs.iter_mut() {
                for input in expr.inputs.iter_mut() {
                    *input = resolve(*input);
                }
            }
        }

        self.expr_index.clear();
        self.logical_index.clear();

        let mut new_duplicates = vec![];
        for group_id in self.groups.keys().copied().sorted().collect::<Vec<_>>() {
            for expr_id in self[group_id].expr_ids() {
                let expr_key = self[expr_id].expr_key();
                let logical_key = self[expr_id].logical_key();

                match self.expr_index.get(&expr_key) {
                    None => {
                        self.expr_index.insert(expr_key, expr_id);
                    }
                    Some(existing) => {
                        // Two formerly distinct expressions became
                        // identical. If they live in different groups those
                        // groups are logically equal as well.
                        if existing.group_id != group_id {
                            new_duplicates.push((existing.group_id, group_id));
                        }
                    }
                }

                match self.logical_index.get(&logical_key) {
                    None => {
                        self.logical_index.insert(logical_key, group_id);
                    }
                    Some(existing) if *existing != group_id => {
                        new_duplicates.push((*existing, group_id));
                    }
                    _ => {}
                }
            }
        }

        self.pending_merges.extend(new_duplicates);
    }

    pub(crate) fn resolve_group(&self, mut group_id: GroupId) -> GroupId {
        while let Some(next) = self.merged_groups.get(&group_id) {
            group_id = *next;
        }
        group_id
    }

    pub(crate) fn resolve_expr(&self, mut expr_id: GroupExprId) -> GroupExprId {
        while let Some(next) = self.merged_exprs.get(&expr_id) {
            expr_id = *next;
        }
        expr_id
    }
}

impl Index<GroupId> for Memo {
    type Output = Group;

    fn index(&self, index: GroupId) -> &Group {
        self.groups.get(&self.resolve_group(index)).unwrap()
    }
}

impl IndexMut<GroupId> for Memo {
    fn index_mut(&mut self, index: GroupId) -> &mut Self::Output {
        let group_id = self.resolve_group(index);
        self.groups.get_mut(&group_id).unwrap()
    }
}

impl Index<GroupExprId> for Memo {
    type Output = GroupExpr;

    fn index(&self, index: GroupExprId) -> &Self::Output {
        let expr_id = self.resolve_expr(index);
        &self[expr_id.group_id][expr_id]
    }
}

impl IndexMut<GroupExprId> for Memo {
    fn index_mut(&mut self, index: GroupExprId) -> &mut Self::Output {
        let expr_id = self.resolve_expr(index);
        let group_id = self.resolve_group(expr_id.group_id);
        &mut self.groups.get_mut(&group_id).unwrap()[expr_id]
    }
}

impl Debug for Memo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "Groups in memo (root {:?}):", self.root_group_id())?;
        writeln!(f)?;

        for group_id in self.group_ids() {
            writeln!(f, "{:?}", self[group_id])?;
        }

        // Merged groups.
        {
            writeln!(f, "Merged groups:")?;
            let mut table = Table::new();
            table.add_row(row!["Source Group Id", "Target Group Id"]);
            for (src, dest) in self.merged_groups.iter().sorted_by_key(|(src, _)| **src)
            {
                table.add_row(row![src, dest]);
            }

            writeln!(f, "{}", table)?;
        }

        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::expr::{col, lit};
    use crate::operator::{Filter, JoinType, Operator, TableScan};
    use crate::plan::LogicalPlanBuilder;
    use crate::planner::Memo;
    use crate::test_utils::{t1, t2};
    use crate::traits::TraitRegistry;

    fn memo_from(plan: &crate::plan::Plan) -> Memo {
        let mut memo = Memo::new(TraitRegistry::default());
        memo.init_with_plan(plan).unwrap();
        memo
    }

    #[test]
    fn test_build_memo_from_plan() {
        let plan = LogicalPlanBuilder::new()
            .scan(t1())
            .filter(col("c1").eq(lit(5i64)))
            .projection(vec![col("c1")])
            .build()
            .unwrap();

        let memo = memo_from(&plan);
        assert_eq!(3, memo.group_count());

        // Projection at the root.
        let root_group = &memo[memo.root_group_id()];
        assert_eq!(1, root_group.expr_count());
        let root_expr = &memo[root_group.expr_ids()[0]];
        assert!(matches!(root_expr.operator(), Operator::Projection(_)));
        assert!(root_expr.is_abstract());

        // Filter below it.
        let filter_group = &memo[root_expr.inputs()[0]];
        let filter_expr = &memo[filter_group.expr_ids()[0]];
        assert_eq!(
            &Operator::Filter(Filter::new(col("c1").eq(lit(5i64)))),
            filter_expr.operator()
        );

        // Scan at the bottom.
        let scan_group = &memo[filter_expr.inputs()[0]];
        let scan_expr = &memo[scan_group.expr_ids()[0]];
        assert_eq!(
            &Operator::Scan(TableScan::new(t1())),
            scan_expr.operator()
        );
        assert!(scan_expr.inputs().is_empty());
    }

    #[test]
    fn test_build_memo_with_multi_child_plan() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.scan(t2()).build().unwrap().root();

            builder
                .scan(t1())
                .join(JoinType::Inner, col("c1").eq(col("t2_c1")), right)
                .build()
                .unwrap()
        };

        let memo = memo_from(&plan);
        assert_eq!(3, memo.group_count());

        let root_expr = &memo[memo[memo.root_group_id()].expr_ids()[0]];
        assert!(matches!(root_expr.operator(), Operator::Join(_)));
        assert_eq!(2, root_expr.inputs().len());
    }

    #[test]
    fn test_registering_same_shape_twice_dedups() {
        let plan = LogicalPlanBuilder::new()
            .scan(t1())
            .filter(col("c1").eq(lit(5i64)))
            .build()
            .unwrap();

        let mut memo = memo_from(&plan);
        let groups_before = memo.group_count();
        let scan_group = {
            let root_expr = &memo[memo[memo.root_group_id()].expr_ids()[0]];
            root_expr.inputs()[0]
        };

        // Same logical shape, same traits: no new expression.
        let (expr_id, is_new) = memo
            .insert_expr(
                Operator::Scan(TableScan::new(t1())),
                TraitRegistry::default().default_set(),
                vec![],
                None,
            )
            .unwrap();
        assert!(!is_new);
        assert_eq!(scan_group, expr_id.group_id());

        // Same logical shape under different traits: one more member of the
        // same group, not a new group.
        let physical = TraitRegistry::default()
            .default_set()
            .with_convention(crate::traits::Convention::new("ROW"));
        let (expr_id, is_new) = memo
            .insert_expr(
                Operator::Scan(TableScan::new(t1())),
                physical,
                vec![],
                None,
            )
            .unwrap();
        assert!(is_new);
        assert_eq!(scan_group, expr_id.group_id());
        assert_eq!(2, memo[scan_group].expr_count());
        assert_eq!(groups_before, memo.group_count());
    }

    #[test]
    fn test_digest_ignores_traits() {
        let plan = LogicalPlanBuilder::new().scan(t1()).build().unwrap();
        let mut memo = memo_from(&plan);

        let abstract_id = memo[memo.root_group_id()].expr_ids()[0];
        let physical = TraitRegistry::default()
            .default_set()
            .with_convention(crate::traits::Convention::new("ROW"));
        let (physical_id, _) = memo
            .insert_expr(
                Operator::Scan(TableScan::new(t1())),
                physical,
                vec![],
                None,
            )
            .unwrap();

        assert_eq!(memo[abstract_id].digest(), memo[physical_id].digest());
    }

    #[test]
    fn test_row_type_mismatch_is_rejected() {
        let plan = LogicalPlanBuilder::new()
            .scan(t1())
            .projection(vec![col("c1")])
            .build()
            .unwrap();

        let mut memo = memo_from(&plan);
        let root_group = memo.root_group_id();

        // A scan of the whole table has a different row type than the
        // projection group.
        let err = memo
            .insert_expr(
                Operator::Scan(TableScan::new(t1())),
                TraitRegistry::default().default_set(),
                vec![],
                Some(root_group),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::OptError::RowTypeMismatch { .. }));
    }

    #[test]
    fn test_winner_cost_is_monotonic() {
        let plan = LogicalPlanBuilder::new().scan(t1()).build().unwrap();
        let mut memo = memo_from(&plan);
        let group_id = memo.root_group_id();
        let expr_id = memo[group_id].expr_ids()[0];
        let required = TraitRegistry::default().default_set();

        let group = &mut memo[group_id];
        group.update_winner(&required, expr_id, vec![], 10.0.into());
        assert_eq!(10.0, group.winner(&required).unwrap().lowest_cost().value());

        // A worse plan never replaces the winner.
        group.update_winner(&required, expr_id, vec![], 20.0.into());
        assert_eq!(10.0, group.winner(&required).unwrap().lowest_cost().value());

        group.update_winner(&required, expr_id, vec![], 5.0.into());
        assert_eq!(5.0, group.winner(&required).unwrap().lowest_cost().value());
    }

    #[test]
    fn test_merge_duplicate_groups() {
        // Two filter towers over the same scan; replacing one filter's
        // predicate with the other's makes their groups duplicates.
        let plan = LogicalPlanBuilder::new()
            .scan(t1())
            .filter(col("c1").eq(lit(5i64)))
            .build()
            .unwrap();
        let mut memo = memo_from(&plan);
        let filter_group = memo.root_group_id();

        let other = LogicalPlanBuilder::new()
            .scan(t1())
            .filter(col("c1").eq(lit(7i64)))
            .build()
            .unwrap();
        let other_root = memo.init_with_plan(&other).unwrap();
        let other_group = other_root.last().unwrap().group_id();
        assert_ne!(filter_group, other_group);

        let scan_group = memo[memo[filter_group].expr_ids()[0]].inputs()[0];

        // Register the `= 5` shape into the `= 7` group, marking both
        // groups as duplicates.
        let (_, is_new) = memo
            .insert_expr(
                Operator::Filter(Filter::new(col("c1").eq(lit(5i64)))),
                TraitRegistry::default().default_set(),
                vec![scan_group],
                Some(other_group),
            )
            .unwrap();
        assert!(!is_new);
        assert!(memo.has_pending_merges());

        memo.merge_duplicate_groups();

        let merged = memo.resolve_group(other_group);
        assert_eq!(memo.resolve_group(filter_group), merged);
        // Both filter shapes are members of the surviving group.
        assert_eq!(2, memo[merged].expr_count());
        assert_eq!(2, memo.group_count());
    }
}
