use std::fmt::Formatter;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::Statistics;

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Limit {
    fetch: usize,
}

impl Limit {
    pub fn new(fetch: usize) -> Self {
        Self { fetch }
    }

    pub fn fetch(&self) -> usize {
        self.fetch
    }
}

impl OperatorTrait for Limit {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        inputs
            .first()
            .cloned()
            .ok_or_else(|| OptError::internal("limit requires one input"))
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        let input_rows = input_stats
            .first()
            .map(|s| s.row_count())
            .unwrap_or_default();
        Statistics::new(input_rows.min(self.fetch as f64))
    }
}

impl DisplayFields for Limit {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("").field("fetch", &self.fetch).finish()
    }
}
