use std::fmt::Formatter;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::Statistics;
use crate::traits::Convention;

/// Bridge operator shipping rows out of one backend into another.
///
/// An exchange carries the convention of its consumer while its input runs
/// in `source`; converter rules insert it to realize cross-backend plans.
/// It is a pure pass-through: same row type, same rows.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Exchange {
    source: Convention,
}

impl Exchange {
    pub fn new(source: Convention) -> Self {
        Self { source }
    }

    /// Convention the input rows are pulled from.
    pub fn source(&self) -> Convention {
        self.source
    }
}

impl OperatorTrait for Exchange {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        inputs
            .first()
            .cloned()
            .ok_or_else(|| OptError::internal("exchange requires one input"))
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        input_stats.first().cloned().unwrap_or_default()
    }
}

impl DisplayFields for Exchange {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field("source", &self.source)
            .finish()
    }
}
