//! Relational operators such as join, projection, limit, etc.
//!
//! Operator kinds form a single closed enum; whether a node is abstract or
//! executable is not encoded here but in the convention trait it carries.
//! The same `Filter` payload can live as an abstract node (convention
//! `NONE`) and as any number of backend-specific alternatives, which is what
//! lets converter rules move a node between backends by copying it with a
//! new trait set.

mod table_scan;
pub use table_scan::*;
mod filter;
pub use filter::*;
mod projection;
pub use projection::*;
mod join;
pub use join::*;
mod limit;
pub use limit::*;
mod sort;
pub use sort::*;
mod exchange;
pub use exchange::*;
mod modify;
pub use modify::*;

use std::fmt::{Display, Formatter};

use arrow_schema::SchemaRef;
use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::AsRefStr;

use crate::error::OptResult;
use crate::stat::Statistics;
use crate::traits::{Collation, TraitSet};

/// Relational operator kind plus operator-specific payload.
#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner, AsRefStr)]
#[enum_dispatch]
pub enum Operator {
    Scan(TableScan),
    Filter(Filter),
    Projection(Projection),
    Join(Join),
    Limit(Limit),
    Sort(Sort),
    Exchange(Exchange),
    Modify(TableModify),
}

#[enum_dispatch(Operator)]
pub trait OperatorTrait {
    /// Row type of this operator given its inputs' row types.
    ///
    /// The result is a pure function of inputs and payload; it is computed
    /// once at registration and never changes afterwards.
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef>;

    /// Number of inputs this operator expects.
    fn arity(&self) -> usize;

    /// Output statistics given input statistics.
    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics;
}

/// Formats the operator-specific payload, appended after the operator name.
#[enum_dispatch(Operator)]
pub trait DisplayFields {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result;
}

impl Operator {
    /// Required trait sets of this operator's inputs, given the traits the
    /// operator itself carries.
    ///
    /// By default inputs must run in the same convention as the operator and
    /// carry no ordering guarantee; operators crossing backend boundaries
    /// override the convention part.
    pub fn required_input_traits(&self, traits: &TraitSet) -> Vec<TraitSet> {
        let base = traits.with_collation(Collation::default());
        match self {
            Operator::Scan(_) => vec![],
            Operator::Exchange(exchange) => {
                vec![base.with_convention(exchange.source())]
            }
            other => vec![base; other.arity()],
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}
