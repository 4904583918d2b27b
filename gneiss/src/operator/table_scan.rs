use std::fmt::Formatter;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::{Statistics, DEFAULT_ROW_COUNT};

/// Description of a stored table, supplied by the catalog that owns it.
///
/// The optimizer core never talks to storage; everything it needs to know
/// about a table travels in this descriptor: the row type, which adapter
/// serves the table, its partition keys and a row count estimate.
#[derive(Clone, Debug)]
pub struct TableDesc {
    name: String,
    schema: SchemaRef,
    /// Columns the storage adapter partitions by. Backends use these to
    /// decide which predicates they can evaluate natively.
    partition_keys: Vec<String>,
    /// Name of the storage adapter serving this table, if any.
    provider: Option<String>,
    row_count: Option<u64>,
}

impl TableDesc {
    pub fn new<S: Into<String>>(name: S, schema: SchemaRef) -> Self {
        Self {
            name: name.into(),
            schema,
            partition_keys: vec![],
            provider: None,
            row_count: None,
        }
    }

    pub fn with_partition_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_keys = keys.into_iter().map(|k| k.into()).collect();
        self
    }

    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn partition_keys(&self) -> &[String] {
        &self.partition_keys
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn row_count(&self) -> Option<u64> {
        self.row_count
    }
}

impl PartialEq for TableDesc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.schema == other.schema
            && self.partition_keys == other.partition_keys
            && self.provider == other.provider
    }
}

impl Eq for TableDesc {}

/// Schemas are not hashable; the name identifies the table within one
/// catalog.
impl Hash for TableDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.partition_keys.hash(state);
        self.provider.hash(state);
    }
}

/// Table scan operator.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TableScan {
    table: Arc<TableDesc>,
    limit: Option<usize>,
}

impl TableScan {
    pub fn new(table: Arc<TableDesc>) -> Self {
        Self { table, limit: None }
    }

    pub fn with_limit(table: Arc<TableDesc>, limit: usize) -> Self {
        Self {
            table,
            limit: Some(limit),
        }
    }

    pub fn table(&self) -> &Arc<TableDesc> {
        &self.table
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl OperatorTrait for TableScan {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        if !inputs.is_empty() {
            return Err(OptError::internal("table scan accepts no input"));
        }
        Ok(self.table.schema())
    }

    fn arity(&self) -> usize {
        0
    }

    fn derive_statistics(&self, _input_stats: &[Statistics]) -> Statistics {
        let row_count = self
            .table
            .row_count()
            .map(|c| c as f64)
            .unwrap_or(DEFAULT_ROW_COUNT);
        let row_count = match self.limit {
            Some(limit) => row_count.min(limit as f64),
            None => row_count,
        };
        Statistics::new(row_count)
    }
}

impl DisplayFields for TableScan {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        let mut s = fmt.debug_struct("");
        s.field("table", &self.table.name());
        if let Some(limit) = self.limit {
            s.field("limit", &limit);
        }
        s.finish()
    }
}
