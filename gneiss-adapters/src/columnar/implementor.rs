use gneiss::error::{OptError, OptResult};
use gneiss::implementor::Implementor;
use gneiss::operator::Operator;
use gneiss::plan::PlanNodeRef;

/// Builds the store-native query for one columnar plan fragment.
///
/// The walk appends fragments in call order: the scan names the table,
/// each filter above it contributes its conjuncts to the predicate list,
/// a projection narrows the selected columns. Operator kinds the store
/// cannot execute fail the walk; the planner never produces them inside
/// the columnar convention, so hitting one means the plan is corrupt.
#[derive(Default)]
pub struct ColumnarImplementor {
    table: Option<String>,
    selects: Vec<String>,
    predicates: Vec<String>,
}

impl ColumnarImplementor {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_table(&mut self, table: String) {
        self.table = Some(table);
    }

    fn add_select(&mut self, column: String) {
        self.selects.push(column);
    }

    fn add_predicate(&mut self, predicate: String) {
        self.predicates.push(predicate);
    }

    /// The accumulated query in a SQL-ish shape, for inspection and tests.
    pub fn query(&self) -> String {
        let projection = if self.selects.is_empty() {
            "*".to_string()
        } else {
            self.selects.join(", ")
        };
        let mut query = format!(
            "SELECT {} FROM {}",
            projection,
            self.table.as_deref().unwrap_or("?")
        );
        if !self.predicates.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.predicates.join(" AND "));
        }
        query
    }
}

impl Implementor for ColumnarImplementor {
    fn implement(&mut self, node: &PlanNodeRef) -> OptResult<()> {
        for (ordinal, child) in node.inputs().iter().enumerate() {
            self.visit_child(ordinal, child)?;
        }

        match node.operator() {
            Operator::Scan(scan) => {
                self.set_table(scan.table().name().to_string());
            }
            Operator::Filter(filter) => {
                for conjunct in filter.predicate().conjuncts() {
                    self.add_predicate(format!("{}", conjunct));
                }
            }
            Operator::Projection(_) => {
                for field in node.row_type().fields().iter() {
                    self.add_select(field.name().clone());
                }
            }
            other => {
                return Err(OptError::UnsupportedOperator {
                    operator: format!("{}", other),
                    context: "columnar store",
                });
            }
        }

        Ok(())
    }
}
