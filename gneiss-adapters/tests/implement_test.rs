mod utils;

use gneiss::error::{OptError, OptResult};
use gneiss::expr::{col, lit};
use gneiss::implementor::{implement_plan, Implementor};
use gneiss::operator::JoinType;
use gneiss::plan::{LogicalPlanBuilder, PlanNodeRef};

use gneiss_adapters::columnar::ColumnarImplementor;
use gneiss_adapters::row::RowImplementor;

use crate::utils::{adapters_config, orders, row_required, users};

/// Records the order in which nodes contribute their fragment.
#[derive(Default)]
struct RecordingImplementor {
    fragments: Vec<String>,
}

impl Implementor for RecordingImplementor {
    fn implement(&mut self, node: &PlanNodeRef) -> OptResult<()> {
        for (ordinal, child) in node.inputs().iter().enumerate() {
            self.visit_child(ordinal, child)?;
        }
        self.fragments.push(node.operator().as_ref().to_string());
        Ok(())
    }
}

#[test]
fn test_children_are_materialized_before_parent() {
    let config = adapters_config();

    let plan = {
        let mut builder = LogicalPlanBuilder::new();
        let right = builder.scan(orders()).build().unwrap().root();
        builder
            .scan(users())
            .join(
                JoinType::Inner,
                col("id").eq(col("customer_id")),
                right,
            )
            .build()
            .unwrap()
    };
    let plan = config.optimize(plan, row_required()).unwrap();

    let mut implementor = RecordingImplementor::default();
    implement_plan(&plan, &mut implementor).unwrap();

    // Left subtree first, then the right one, the join last.
    assert_eq!(
        vec!["Scan", "Scan", "Exchange", "Join"],
        implementor.fragments
    );
}

#[test]
fn test_row_program_reads_bottom_up() {
    let config = adapters_config();

    let plan = LogicalPlanBuilder::new()
        .scan(users())
        .filter(col("name").eq(lit("ada")))
        .limit(10)
        .build()
        .unwrap();
    let plan = config.optimize(plan, row_required()).unwrap();

    let mut implementor = RowImplementor::new();
    implement_plan(&plan, &mut implementor).unwrap();
    let program = implementor.finish();

    assert_eq!(
        vec![
            "scan users".to_string(),
            "filter name = 'ada'".to_string(),
            "limit 10".to_string(),
        ],
        program.steps()
    );
}

#[test]
fn test_columnar_implementor_builds_store_query() {
    let config = adapters_config();

    let plan = LogicalPlanBuilder::new()
        .scan(orders())
        .filter(col("customer_id").eq(lit(42i64)))
        .build()
        .unwrap();
    let plan = config.optimize(plan, row_required()).unwrap();

    // Everything below the exchange belongs to the store.
    let root = plan.root();
    let fragment = &root.inputs()[0];
    let mut implementor = ColumnarImplementor::new();
    implementor.implement(fragment).unwrap();

    assert_eq!(
        "SELECT * FROM orders WHERE customer_id = 42",
        implementor.query()
    );
}

#[test]
fn test_columnar_implementor_rejects_unsupported_operator() {
    let config = adapters_config();

    let plan = {
        let mut builder = LogicalPlanBuilder::new();
        let right = builder.scan(orders()).build().unwrap().root();
        builder
            .scan(users())
            .join(
                JoinType::Inner,
                col("id").eq(col("customer_id")),
                right,
            )
            .build()
            .unwrap()
    };
    let plan = config.optimize(plan, row_required()).unwrap();

    let mut implementor = ColumnarImplementor::new();
    let err = implementor.implement(&plan.root()).unwrap_err();
    assert!(matches!(err, OptError::UnsupportedOperator { .. }));
}
