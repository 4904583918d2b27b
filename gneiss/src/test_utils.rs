//! Shared fixtures for unit tests.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

use crate::error::OptResult;
use crate::operator::TableDesc;
use crate::rules::{ConverterRule, OptExpression, RuleContext};
use crate::traits::Convention;

/// Table `t1` with columns `c1: Int64`, `c2: Utf8`.
pub fn t1() -> Arc<TableDesc> {
    Arc::new(
        TableDesc::new(
            "t1",
            Arc::new(Schema::new(vec![
                Field::new("c1", DataType::Int64, false),
                Field::new("c2", DataType::Utf8, true),
            ])),
        )
        .with_row_count(1000),
    )
}

/// Table `t2` with columns `t2_c1: Int64`, `t2_c2: Utf8`.
pub fn t2() -> Arc<TableDesc> {
    Arc::new(
        TableDesc::new(
            "t2",
            Arc::new(Schema::new(vec![
                Field::new("t2_c1", DataType::Int64, false),
                Field::new("t2_c2", DataType::Utf8, true),
            ])),
        )
        .with_row_count(100),
    )
}

/// Converter copying any expression into the target convention unchanged.
///
/// The smallest possible backend: every operator is supported and children
/// are requested in the same convention. Useful for exercising the engine
/// without a real adapter.
pub struct CopyConverterRule {
    name: String,
    from: Convention,
    to: Convention,
}

impl CopyConverterRule {
    pub fn new(from: Convention, to: Convention) -> Self {
        Self {
            name: format!("CopyConverterRule({}->{})", from, to),
            from,
            to,
        }
    }
}

impl ConverterRule for CopyConverterRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_convention(&self) -> Convention {
        self.from
    }

    fn target_convention(&self) -> Convention {
        self.to
    }

    fn convert(
        &self,
        input: OptExpression,
        ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        let operator = input.get_operator(ctx)?.clone();
        let traits = ctx.default_traits().with_convention(self.to);
        Ok(Some(OptExpression::with_operator_traits(
            operator,
            traits,
            input.inputs().to_vec(),
        )))
    }
}

/// Converter accepting nothing, for exercising the `Ok(None)` path.
pub struct RejectingConverterRule {
    from: Convention,
    to: Convention,
}

impl RejectingConverterRule {
    pub fn new(from: Convention, to: Convention) -> Self {
        Self { from, to }
    }
}

impl ConverterRule for RejectingConverterRule {
    fn name(&self) -> &str {
        "RejectingConverterRule"
    }

    fn source_convention(&self) -> Convention {
        self.from
    }

    fn target_convention(&self) -> Convention {
        self.to
    }

    fn convert(
        &self,
        _input: OptExpression,
        _ctx: &RuleContext,
    ) -> OptResult<Option<OptExpression>> {
        Ok(None)
    }
}
