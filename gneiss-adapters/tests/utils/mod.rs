use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

use gneiss::operator::TableDesc;
use gneiss::planner::OptimizerConfig;
use gneiss::rules::MergeFiltersRule;
use gneiss::traits::{TraitRegistry, TraitSet};

use gneiss_adapters::columnar::{
    ColumnarFilterRule, ColumnarScanRule, ColumnarToRowRule, COLUMNAR_PROVIDER,
};
use gneiss_adapters::row::{RowConverterRule, RowSortEnforcer, ROW};

pub const ORDERS_SCHEMA_JSON: &str = r#"{
        "fields": [
            {
                "name": "customer_id",
                "nullable": false,
                "data_type": "Int64",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            },
            {
                "name": "amount",
                "nullable": false,
                "data_type": "Int64",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            }
        ],
        "metadata": {}
    }"#;

pub fn schema_from_json(json: &str) -> SchemaRef {
    let schema: Schema = serde_json::from_str(json).unwrap();
    Arc::new(schema)
}

/// A table owned by the columnar store, partitioned by `customer_id`.
pub fn orders() -> Arc<TableDesc> {
    Arc::new(
        TableDesc::new("orders", schema_from_json(ORDERS_SCHEMA_JSON))
            .with_provider(COLUMNAR_PROVIDER)
            .with_partition_keys(vec!["customer_id"])
            .with_row_count(10_000),
    )
}

/// A table served natively by the row engine.
pub fn users() -> Arc<TableDesc> {
    Arc::new(
        TableDesc::new(
            "users",
            Arc::new(Schema::new(vec![
                Field::new("id", DataType::Int64, false),
                Field::new("name", DataType::Utf8, true),
            ])),
        )
        .with_row_count(500),
    )
}

/// Config with both sample backends registered.
pub fn adapters_config() -> OptimizerConfig {
    OptimizerConfig::builder()
        .register_rule(Arc::new(MergeFiltersRule::new()))
        .register_converter_rule(Arc::new(RowConverterRule::new()))
        .register_converter_rule(Arc::new(ColumnarScanRule::new()))
        .register_converter_rule(Arc::new(ColumnarFilterRule::new()))
        .register_converter_rule(Arc::new(ColumnarToRowRule::new()))
        .register_enforcer(Arc::new(RowSortEnforcer::new()))
        .build()
}

/// Config without the sort enforcer.
pub fn config_without_enforcer() -> OptimizerConfig {
    OptimizerConfig::builder()
        .register_converter_rule(Arc::new(RowConverterRule::new()))
        .register_converter_rule(Arc::new(ColumnarScanRule::new()))
        .register_converter_rule(Arc::new(ColumnarFilterRule::new()))
        .register_converter_rule(Arc::new(ColumnarToRowRule::new()))
        .build()
}

pub fn row_required() -> TraitSet {
    TraitRegistry::default().default_set().with_convention(ROW)
}
