mod utils;

use gneiss::error::OptError;
use gneiss::expr::{col, lit};
use gneiss::operator::{ModifyKind, Operator};
use gneiss::plan::LogicalPlanBuilder;
use gneiss::planner::VolcanoOptimizer;
use gneiss::traits::{Collation, ColumnOrder, Convention};

use gneiss_adapters::columnar::COLUMNAR;
use gneiss_adapters::row::ROW;

use crate::utils::{
    adapters_config, config_without_enforcer, orders, row_required, users,
};

#[test]
fn test_partition_key_filter_is_pushed_into_columnar_store() {
    let config = adapters_config();

    let plan = LogicalPlanBuilder::new()
        .scan(orders())
        .filter(col("customer_id").eq(lit(42i64)))
        .build()
        .unwrap();
    let original_row_type = plan.root().row_type();

    let plan = config.optimize(plan, row_required()).unwrap();

    // The filter ran inside the store; only the exchange runs in the row
    // engine.
    let exchange = plan.root();
    assert!(matches!(exchange.operator(), Operator::Exchange(_)));
    assert_eq!(ROW, exchange.traits().convention());

    let filter = &exchange.inputs()[0];
    assert!(matches!(filter.operator(), Operator::Filter(_)));
    assert_eq!(COLUMNAR, filter.traits().convention());

    let scan = &filter.inputs()[0];
    assert!(matches!(scan.operator(), Operator::Scan(_)));
    assert_eq!(COLUMNAR, scan.traits().convention());

    // Conversion preserved the row type on every node.
    assert_eq!(original_row_type, exchange.row_type());
    assert_eq!(original_row_type, filter.row_type());
    assert_eq!(original_row_type, scan.row_type());
}

#[test]
fn test_cross_column_filter_stays_out_of_columnar_store() {
    let config = adapters_config();

    let plan = LogicalPlanBuilder::new()
        .scan(orders())
        .filter(col("customer_id").not_eq(col("amount")))
        .build()
        .unwrap();

    let mut session = VolcanoOptimizer::new(&config);
    let optimized = session.optimize(plan, row_required()).unwrap();

    // The store rejected the filter, so it runs in the row engine above the
    // bridge.
    let filter = optimized.root();
    assert!(matches!(filter.operator(), Operator::Filter(_)));
    assert_eq!(ROW, filter.traits().convention());

    let exchange = &filter.inputs()[0];
    assert!(matches!(exchange.operator(), Operator::Exchange(_)));

    let scan = &exchange.inputs()[0];
    assert_eq!(COLUMNAR, scan.traits().convention());

    // The logical filter gained no columnar alternative: besides the
    // abstract member it was only ever lowered into the row convention.
    let memo = session.memo();
    let root_group = memo.root_group_id();
    let conventions: Vec<Convention> = memo[root_group]
        .expr_ids()
        .into_iter()
        .map(|id| memo[id].traits().convention())
        .collect();
    assert!(conventions.contains(&Convention::NONE));
    assert!(!conventions.contains(&COLUMNAR));
}

#[test]
fn test_scan_reaches_row_engine_through_conversion_chain() {
    let config = adapters_config();

    // No direct NONE→ROW conversion exists for a columnar table; the plan
    // is realized by composing NONE→COLUMNAR with COLUMNAR→ROW.
    let plan = LogicalPlanBuilder::new().scan(orders()).build().unwrap();
    let plan = config.optimize(plan, row_required()).unwrap();

    let exchange = plan.root();
    assert!(matches!(exchange.operator(), Operator::Exchange(_)));
    assert_eq!(ROW, exchange.traits().convention());
    assert_eq!(
        COLUMNAR,
        exchange.inputs()[0].traits().convention()
    );
}

#[test]
fn test_required_collation_is_enforced_by_row_sort() {
    let config = adapters_config();
    let required = row_required()
        .with_collation(Collation::new(vec![ColumnOrder::asc("amount")]));

    let plan = LogicalPlanBuilder::new()
        .scan(orders())
        .filter(col("customer_id").eq(lit(42i64)))
        .build()
        .unwrap();

    let plan = config.optimize(plan, required.clone()).unwrap();

    let sort = plan.root();
    assert!(matches!(sort.operator(), Operator::Sort(_)));
    assert!(sort.traits().satisfies(&required));
}

#[test]
fn test_required_collation_without_sort_rule_is_unrealizable() {
    let config = config_without_enforcer();
    let required = row_required()
        .with_collation(Collation::new(vec![ColumnOrder::asc("amount")]));

    let plan = LogicalPlanBuilder::new().scan(orders()).build().unwrap();

    let err = config.optimize(plan, required).unwrap_err();
    assert!(matches!(err, OptError::NoPlanFound { .. }));
}

#[test]
fn test_modify_plan_runs_in_row_engine() {
    let config = adapters_config();

    let plan = LogicalPlanBuilder::new()
        .scan(users())
        .filter(col("name").eq(lit("gone")))
        .modify(users(), ModifyKind::Delete)
        .build()
        .unwrap();

    let plan = config.optimize(plan, row_required()).unwrap();

    let modify = plan.root();
    assert!(matches!(modify.operator(), Operator::Modify(_)));
    assert_eq!(ROW, modify.traits().convention());
    assert_eq!(1, modify.row_type().fields().len());
    assert_eq!("rows_affected", modify.row_type().field(0).name());
}

#[test]
fn test_plans_join_across_backends() {
    let config = adapters_config();

    let plan = {
        let mut builder = LogicalPlanBuilder::new();
        let right = builder.scan(orders()).build().unwrap().root();
        builder
            .scan(users())
            .join(
                gneiss::operator::JoinType::Inner,
                col("id").eq(col("customer_id")),
                right,
            )
            .build()
            .unwrap()
    };

    let plan = config.optimize(plan, row_required()).unwrap();

    let join = plan.root();
    assert!(matches!(join.operator(), Operator::Join(_)));
    assert_eq!(ROW, join.traits().convention());

    // Left side is native; the right side bridges out of the store.
    assert!(matches!(join.inputs()[0].operator(), Operator::Scan(_)));
    assert_eq!(ROW, join.inputs()[0].traits().convention());
    assert!(matches!(join.inputs()[1].operator(), Operator::Exchange(_)));
}
