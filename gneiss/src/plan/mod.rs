//! Query plans.
//!
//! A [`Plan`] is a single-root dag of [`PlanNode`]s. It is used at both ends
//! of the optimizer: the abstract tree handed in by a validator, and the
//! fully-converted tree handed back after optimization. Nodes are shared via
//! [`PlanNodeRef`], so rewritten plans reuse untouched subtrees.

mod explain;
pub use explain::*;

use std::collections::HashSet;
use std::mem::swap;
use std::sync::Arc;

use arrow_schema::SchemaRef;

use crate::error::OptResult;
use crate::expr::ScalarExpr;
use crate::operator::{
    Filter, Join, JoinType, Limit, ModifyKind, Operator, OperatorTrait, Projection,
    Sort, TableDesc, TableModify, TableScan,
};
use crate::traits::{Collation, TraitRegistry, TraitSet};

pub type PlanNodeId = u32;

pub type PlanNodeRef = Arc<PlanNode>;

#[derive(Default, Clone)]
pub struct PlanNodeIdGen {
    next: PlanNodeId,
}

impl PlanNodeIdGen {
    pub fn gen_next(&mut self) -> PlanNodeId {
        self.next += 1;
        self.next
    }
}

/// One node in a plan.
///
/// The row type is derived once at construction and fixed afterwards; every
/// rewrite producing this node again under a different trait set must
/// reproduce it exactly.
#[derive(Debug)]
pub struct PlanNode {
    id: PlanNodeId,
    operator: Operator,
    traits: TraitSet,
    row_type: SchemaRef,
    inputs: Vec<PlanNodeRef>,
}

/// The `eq` ignores `id`.
impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator
            && self.traits == other.traits
            && self.row_type == other.row_type
            && self.inputs == other.inputs
    }
}

impl PlanNode {
    pub fn new(
        id: PlanNodeId,
        operator: Operator,
        traits: TraitSet,
        row_type: SchemaRef,
        inputs: Vec<PlanNodeRef>,
    ) -> Self {
        Self {
            id,
            operator,
            traits,
            row_type,
            inputs,
        }
    }

    /// Builds a node deriving its row type from the inputs.
    pub fn derive(
        id: PlanNodeId,
        operator: Operator,
        traits: TraitSet,
        inputs: Vec<PlanNodeRef>,
    ) -> OptResult<Self> {
        let input_types: Vec<SchemaRef> =
            inputs.iter().map(|input| input.row_type()).collect();
        let row_type = operator.derive_row_type(&input_types)?;
        Ok(Self::new(id, operator, traits, row_type, inputs))
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn traits(&self) -> &TraitSet {
        &self.traits
    }

    pub fn row_type(&self) -> SchemaRef {
        self.row_type.clone()
    }

    pub fn inputs(&self) -> &[PlanNodeRef] {
        &self.inputs
    }
}

/// A query plan.
#[derive(PartialEq, Debug)]
pub struct Plan {
    root: PlanNodeRef,
}

impl Plan {
    pub fn new(root: PlanNodeRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> PlanNodeRef {
        self.root.clone()
    }

    pub fn bfs_iterator(&self) -> impl Iterator<Item = PlanNodeRef> {
        let mut visited = HashSet::new();
        visited.insert(self.root.id);

        BFSPlanNodeIter {
            cur_level: vec![self.root.clone()],
            next_level: vec![],
            visited,
        }
    }
}

/// Breadth first iterator of a single-root dag plan.
struct BFSPlanNodeIter {
    visited: HashSet<PlanNodeId>,
    cur_level: Vec<PlanNodeRef>,
    next_level: Vec<PlanNodeRef>,
}

impl Iterator for BFSPlanNodeIter {
    type Item = PlanNodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur_level.is_empty() {
            swap(&mut self.cur_level, &mut self.next_level);
        }

        if let Some(p) = self.cur_level.pop() {
            for input in &p.inputs {
                if !self.visited.contains(&input.id) {
                    self.next_level.push(input.clone());
                    self.visited.insert(input.id);
                }
            }

            Some(p)
        } else {
            None
        }
    }
}

/// Fluent builder of abstract input plans.
///
/// Every node is created in convention `NONE` with its row type derived
/// bottom up. Derivation errors are deferred and surfaced by [`build`].
///
/// [`build`]: LogicalPlanBuilder::build
pub struct LogicalPlanBuilder {
    registry: TraitRegistry,
    root: Option<PlanNodeRef>,
    next_plan_node_id: PlanNodeId,
    error: Option<crate::error::OptError>,
}

impl Default for LogicalPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalPlanBuilder {
    pub fn new() -> Self {
        Self::with_registry(TraitRegistry::default())
    }

    /// Builder for sessions with extra trait dimensions registered.
    pub fn with_registry(registry: TraitRegistry) -> Self {
        Self {
            registry,
            root: None,
            next_plan_node_id: 0,
            error: None,
        }
    }

    fn push(&mut self, operator: Operator, inputs: Vec<PlanNodeRef>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        let id = self.next_plan_node_id;
        self.next_plan_node_id += 1;
        match PlanNode::derive(id, operator, self.registry.default_set(), inputs) {
            Ok(node) => self.root = Some(Arc::new(node)),
            Err(e) => self.error = Some(e),
        }
        self
    }

    fn take_root(&mut self) -> Vec<PlanNodeRef> {
        match self.root.take() {
            Some(root) => vec![root],
            None => {
                self.error.get_or_insert(crate::error::OptError::internal(
                    "plan builder has no input node",
                ));
                vec![]
            }
        }
    }

    pub fn scan(&mut self, table: Arc<TableDesc>) -> &mut Self {
        self.push(Operator::Scan(TableScan::new(table)), vec![])
    }

    pub fn filter(&mut self, predicate: ScalarExpr) -> &mut Self {
        let inputs = self.take_root();
        self.push(Operator::Filter(Filter::new(predicate)), inputs)
    }

    pub fn projection<I: IntoIterator<Item = ScalarExpr>>(
        &mut self,
        exprs: I,
    ) -> &mut Self {
        let inputs = self.take_root();
        self.push(Operator::Projection(Projection::new(exprs)), inputs)
    }

    pub fn join(
        &mut self,
        join_type: JoinType,
        condition: ScalarExpr,
        right: PlanNodeRef,
    ) -> &mut Self {
        let mut inputs = self.take_root();
        inputs.push(right);
        self.push(Operator::Join(Join::new(join_type, condition)), inputs)
    }

    pub fn limit(&mut self, fetch: usize) -> &mut Self {
        let inputs = self.take_root();
        self.push(Operator::Limit(Limit::new(fetch)), inputs)
    }

    pub fn sort(&mut self, collation: Collation) -> &mut Self {
        let inputs = self.take_root();
        self.push(Operator::Sort(Sort::new(collation)), inputs)
    }

    pub fn modify(&mut self, table: Arc<TableDesc>, kind: ModifyKind) -> &mut Self {
        let inputs = self.take_root();
        self.push(Operator::Modify(TableModify::new(table, kind)), inputs)
    }

    /// Consumes the current plan, but not the rest of the state, e.g. plan
    /// node ids. This is useful for building multi-child plans, e.g. join.
    pub fn build(&mut self) -> OptResult<Plan> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let root = self.root.take().ok_or_else(|| {
            crate::error::OptError::internal("plan builder has no root node")
        })?;
        Ok(Plan { root })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_schema::{DataType, Field, Schema};

    use crate::expr::{col, lit};
    use crate::operator::{JoinType, Operator, TableDesc};
    use crate::plan::LogicalPlanBuilder;

    fn table(name: &str) -> Arc<TableDesc> {
        Arc::new(TableDesc::new(
            name,
            Arc::new(Schema::new(vec![
                Field::new(format!("{}_c1", name), DataType::Int64, false),
                Field::new(format!("{}_c2", name), DataType::Utf8, true),
            ])),
        ))
    }

    #[test]
    fn test_build_plan() {
        let plan = LogicalPlanBuilder::new()
            .scan(table("t1"))
            .filter(col("t1_c1").eq(lit(5i64)))
            .projection(vec![col("t1_c1")])
            .limit(10)
            .build()
            .unwrap();

        assert!(matches!(plan.root().operator(), Operator::Limit(_)));
        assert_eq!(4, plan.bfs_iterator().count());
        assert_eq!(1, plan.root().row_type().fields().len());
        assert!(plan.root().traits().convention().is_none());
    }

    #[test]
    fn test_build_join_plan() {
        let mut builder = LogicalPlanBuilder::new();
        let right = builder.scan(table("t2")).build().unwrap().root();
        let plan = builder
            .scan(table("t1"))
            .join(
                JoinType::Inner,
                col("t1_c1").eq(lit(1i64)),
                right,
            )
            .build()
            .unwrap();

        assert_eq!(2, plan.root().inputs().len());
        assert_eq!(4, plan.root().row_type().fields().len());
    }

    #[test]
    fn test_unknown_column_is_reported() {
        LogicalPlanBuilder::new()
            .scan(table("t1"))
            .filter(col("no_such_column").eq(lit(5i64)))
            .build()
            .unwrap_err();
    }

    const T3_SCHEMA_JSON: &str = r#"{
                "fields": [
                    {
                        "name": "c1",
                        "nullable": false,
                        "data_type": "Utf8",
                        "dict_id": 0,
                        "dict_is_ordered": false,
                        "metadata": {}
                    },
                    {
                        "name": "c2",
                        "nullable": false,
                        "data_type": "Utf8",
                        "dict_id": 0,
                        "dict_is_ordered": false,
                        "metadata": {}
                    }
                ],
                "metadata": {}
            }"#;

    #[test]
    fn test_scan_row_type_from_json_schema() {
        let schema: Schema = serde_json::from_str(T3_SCHEMA_JSON).unwrap();
        let table = Arc::new(TableDesc::new("t3", Arc::new(schema)));

        let plan = LogicalPlanBuilder::new()
            .scan(table)
            .projection(vec![col("c1")])
            .build()
            .unwrap();

        assert_eq!(1, plan.root().row_type().fields().len());
        assert_eq!("c1", plan.root().row_type().field(0).name());
    }
}
