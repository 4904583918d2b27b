use std::fmt::Formatter;
use std::sync::Arc;

use arrow_schema::{Field, Schema, SchemaRef};
use strum_macros::AsRefStr;

use crate::error::{OptError, OptResult};
use crate::expr::ScalarExpr;
use crate::operator::{DisplayFields, OperatorTrait};
use crate::stat::{Statistics, DEFAULT_JOIN_SELECTIVITY};

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, AsRefStr)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

/// Join operator.
///
/// The output row type is the concatenation of the left and the right input
/// row types, in that order.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Join {
    join_type: JoinType,
    condition: ScalarExpr,
}

impl Join {
    pub fn new(join_type: JoinType, condition: ScalarExpr) -> Self {
        Self {
            join_type,
            condition,
        }
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn condition(&self) -> &ScalarExpr {
        &self.condition
    }
}

impl OperatorTrait for Join {
    fn derive_row_type(&self, inputs: &[SchemaRef]) -> OptResult<SchemaRef> {
        if inputs.len() != 2 {
            return Err(OptError::internal("join requires two inputs"));
        }
        let fields: Vec<Field> = inputs[0]
            .fields()
            .iter()
            .chain(inputs[1].fields().iter())
            .map(|f| f.as_ref().clone())
            .collect();

        let schema = Arc::new(Schema::new(fields));
        self.condition.validate(&schema)?;
        Ok(schema)
    }

    fn arity(&self) -> usize {
        2
    }

    fn derive_statistics(&self, input_stats: &[Statistics]) -> Statistics {
        let left = input_stats
            .first()
            .map(|s| s.row_count())
            .unwrap_or_default();
        let right = input_stats
            .get(1)
            .map(|s| s.row_count())
            .unwrap_or_default();
        Statistics::new(left * right * DEFAULT_JOIN_SELECTIVITY)
    }
}

impl DisplayFields for Join {
    fn display(&self, fmt: &mut Formatter) -> std::fmt::Result {
        fmt.debug_struct("")
            .field("join_type", &self.join_type)
            .field("condition", &format_args!("{}", self.condition))
            .finish()
    }
}
