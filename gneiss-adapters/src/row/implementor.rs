use std::fmt::{Display, Formatter};

use gneiss::error::OptResult;
use gneiss::implementor::Implementor;
use gneiss::operator::Operator;
use gneiss::plan::PlanNodeRef;

/// Linear execution program of the row enumerator.
///
/// Steps are in execution order: producers first, consumers after, exactly
/// the order fragments were appended during the implementor walk.
#[derive(Debug, Default, PartialEq)]
pub struct RowProgram {
    steps: Vec<String>,
}

impl RowProgram {
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

impl Display for RowProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>2}: {}", idx, step)?;
        }
        Ok(())
    }
}

/// Turns a chosen plan into a [`RowProgram`].
///
/// Children are materialized before their parent, so the resulting program
/// reads bottom up.
#[derive(Default)]
pub struct RowImplementor {
    program: RowProgram,
}

impl RowImplementor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> RowProgram {
        self.program
    }

    fn add<S: Into<String>>(&mut self, step: S) {
        self.program.steps.push(step.into());
    }
}

impl Implementor for RowImplementor {
    fn implement(&mut self, node: &PlanNodeRef) -> OptResult<()> {
        for (ordinal, child) in node.inputs().iter().enumerate() {
            self.visit_child(ordinal, child)?;
        }

        let step = match node.operator() {
            Operator::Scan(scan) => format!("scan {}", scan.table().name()),
            Operator::Filter(filter) => format!("filter {}", filter.predicate()),
            Operator::Projection(_) => {
                let columns = node
                    .row_type()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("project {}", columns)
            }
            Operator::Join(join) => {
                format!("hash join on {}", join.condition())
            }
            Operator::Limit(limit) => format!("limit {}", limit.fetch()),
            Operator::Sort(sort) => format!("sort {}", sort.collation()),
            Operator::Exchange(exchange) => {
                format!("exchange from {}", exchange.source())
            }
            Operator::Modify(modify) => {
                format!(
                    "{} into {}",
                    modify.kind().as_ref().to_lowercase(),
                    modify.table().name()
                )
            }
        };
        self.add(step);

        Ok(())
    }
}
