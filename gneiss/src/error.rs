use arrow_schema::{ArrowError, SchemaRef};
use thiserror::Error;

use crate::traits::TraitSet;

pub type OptResult<T> = Result<T, OptError>;

/// Terminal results of a planning session, plus the recoverable conditions
/// rules may report while the search is still running.
///
/// Only `NoPlanFound`, `BudgetExceeded` and `RowTypeMismatch` are returned to
/// callers of [`crate::planner::VolcanoOptimizer::optimize`]; the rest are
/// caught per rule firing and recorded as diagnostics.
#[derive(Debug, Error)]
pub enum OptError {
    /// The search finished without reaching a plan realizing the required
    /// trait set. Distinct from `BudgetExceeded` so that callers can tell "no
    /// plan exists" from "search was too expensive".
    #[error("no physical plan found for required traits [{required}]")]
    NoPlanFound { required: TraitSet },

    #[error("plan search exceeded budget after {fired} rule firings")]
    BudgetExceeded { fired: usize },

    /// A transformation changed the row type of a plan, which breaks logical
    /// equivalence. Fatal for the whole session.
    #[error("row type changed by transformation, expected {expected:?} but got {actual:?}")]
    RowTypeMismatch {
        expected: SchemaRef,
        actual: SchemaRef,
    },

    /// A rule or cost model met an operator kind it does not handle. Fatal
    /// for that rule firing only.
    #[error("unsupported operator {operator} in {context}")]
    UnsupportedOperator {
        operator: String,
        context: &'static str,
    },

    #[error(transparent)]
    Schema(#[from] ArrowError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OptError {
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        OptError::Internal(anyhow::anyhow!(msg.into()))
    }
}
