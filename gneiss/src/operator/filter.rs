use std::fmt::Formatter;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::expr::ScalarExpr;
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::{Statistics, DEFAULT_SELECTIVITY};

/// Filter operator keeping only rows that satisfy a predicate.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Filter {
    predicate: ScalarExpr,
}

impl Filter {
    pub fn new(predicate: ScalarExpr) -> Self {
        Self { predicate }
    }

    pub fn predicate(&self) -> &ScalarExpr {
        &self.predicate
    }
}

impl OperatorTrait for Filter {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        let input = inputs
            .first()
            .ok_or_else(|| OptError::internal("filter requires one input"))?;
        self.predicate.validate(input)?;
        Ok(input.clone())
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        let input_rows = input_stats
            .first()
            .map(|s| s.row_count())
            .unwrap_or_default();
        Statistics::new(input_rows * DEFAULT_SELECTIVITY)
    }
}

impl DisplayFields for Filter {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field("predicate", &format_args!("{}", self.predicate))
            .finish()
    }
}
