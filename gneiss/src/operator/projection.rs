use std::fmt::Formatter;
use std::sync::Arc;

use arrow_schema::{Schema, SchemaRef};
use itertools::Itertools;

use crate::error::{OptError, OptResult};
use crate::expr::ScalarExpr;
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::Statistics;

/// Projection operator computing one output column per expression.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Projection {
    exprs: Vec<ScalarExpr>,
}

impl Projection {
    pub fn new<I: IntoIterator<Item = ScalarExpr>>(exprs: I) -> Self {
        Self {
            exprs: exprs.into_iter().collect(),
        }
    }

    pub fn exprs(&self) -> &[ScalarExpr] {
        &self.exprs
    }
}

impl OperatorTrait for Projection {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        let input = inputs
            .first()
            .ok_or_else(|| OptError::internal("projection requires one input"))?;
        let fields: Vec<_> = self
            .exprs
            .iter()
            .map(|expr| expr.to_field(input))
            .try_collect()?;
        Ok(Arc::new(Schema::new(fields)))
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        input_stats.first().cloned().unwrap_or_default()
    }
}

impl DisplayFields for Projection {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field(
                "exprs",
                &format_args!("[{}]", self.exprs.iter().join(", ")),
            )
            .finish()
    }
}
