use std::fmt::Formatter;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use strum_macros::AsRefStr;

use crate::error::{OptError, OptResult};
use crate::operator::{DisplayFields, OperatorTrait, TableDesc};
use crate::stat::Statistics;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, AsRefStr)]
pub enum ModifyKind {
    Insert,
    Update,
    Delete,
}

/// Table modification operator writing its input rows back to a table.
///
/// The output is a single row reporting how many rows were affected.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TableModify {
    table: Arc<TableDesc>,
    kind: ModifyKind,
}

impl TableModify {
    pub fn new(table: Arc<TableDesc>, kind: ModifyKind) -> Self {
        Self { table, kind }
    }

    pub fn table(&self) -> &Arc<TableDesc> {
        &self.table
    }

    pub fn kind(&self) -> ModifyKind {
        self.kind
    }
}

impl OperatorTrait for TableModify {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        if inputs.len() != 1 {
            return Err(OptError::internal("table modify requires one input"));
        }
        Ok(Arc::new(Schema::new(vec![Field::new(
            "rows_affected",
            DataType::Int64,
            false,
        )])))
    }

    fn arity(&self) -> usize {
        1
    }

    fn derive_statistics(&self, _input_stats: &[Statistics]) -> Statistics {
        Statistics::new(1.0)
    }
}

impl DisplayFields for TableModify {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field("table", &self.table.name())
            .field("kind", &self.kind)
            .finish()
    }
}
