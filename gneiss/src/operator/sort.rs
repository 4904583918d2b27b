use std::fmt::Formatter;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::Statistics;
use crate::traits::Collation;

/// Sort operator establishing a collation over its input.
///
/// Besides appearing in input plans, this is the operator enforcers insert
/// when a required collation has no naturally sorted alternative.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Sort {
    collation: Collation,
}

impl Sort {
    pub fn new(collation: Collation) -> Self {
        Self { collation }
    }

    pub fn collation(&self) -> &Collation {
        &self.collation
    }
}

impl OperatorTrait for Sort {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        inputs
            .first()
            .cloned()
            .ok_or_else(|| OptError::internal("sort requires one input"))
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        input_stats.first().cloned().unwrap_or_default()
    }
}

impl DisplayFields for Sort {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field("collation", &format_args!("{}", self.collation))
            .finish()
    }
}
