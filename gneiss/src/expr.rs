//! Scalar expressions carried as operator payload.
//!
//! These are the row-level expressions referenced by filter conditions, join
//! conditions and projection lists. The optimizer never evaluates them; it
//! only needs structural equality/hashing for logical identity, and type
//! derivation against an input schema for row type checks.

use std::fmt::{Display, Formatter};

use arrow_schema::{DataType, Field, Schema};

use crate::error::{OptError, OptResult};

/// A constant embedded in an expression.
///
/// Only hashable value kinds appear here so that expressions can serve as
/// memo keys.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum ScalarValue {
    Boolean(bool),
    Int64(i64),
    Utf8(String),
    Null,
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Null => DataType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::Int64(v) => write!(f, "{}", v),
            ScalarValue::Utf8(v) => write!(f, "'{}'", v),
            ScalarValue::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    And,
    Or,
}

impl BinaryOp {
    /// Whether the result type is boolean rather than the operand type.
    fn is_predicate(&self) -> bool {
        !matches!(self, BinaryOp::Plus | BinaryOp::Minus)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{}", symbol)
    }
}

/// A scalar expression tree.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum ScalarExpr {
    /// Reference to an input column by name.
    Column(String),
    Literal(ScalarValue),
    BinaryExpr {
        left: Box<ScalarExpr>,
        op: BinaryOp,
        right: Box<ScalarExpr>,
    },
    Not(Box<ScalarExpr>),
    Alias(Box<ScalarExpr>, String),
}

pub fn col<S: Into<String>>(name: S) -> ScalarExpr {
    ScalarExpr::Column(name.into())
}

pub fn lit<V: Into<ScalarValue>>(value: V) -> ScalarExpr {
    ScalarExpr::Literal(value.into())
}

pub fn binary_expr(left: ScalarExpr, op: BinaryOp, right: ScalarExpr) -> ScalarExpr {
    ScalarExpr::BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

impl ScalarExpr {
    pub fn eq(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::Eq, other)
    }

    pub fn not_eq(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::NotEq, other)
    }

    pub fn gt(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::Gt, other)
    }

    pub fn lt(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::Lt, other)
    }

    pub fn and(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::And, other)
    }

    pub fn or(self, other: ScalarExpr) -> ScalarExpr {
        binary_expr(self, BinaryOp::Or, other)
    }

    pub fn alias<S: Into<String>>(self, name: S) -> ScalarExpr {
        ScalarExpr::Alias(Box::new(self), name.into())
    }

    /// Result type of this expression evaluated against `input`.
    pub fn data_type(&self, input: &Schema) -> OptResult<DataType> {
        match self {
            ScalarExpr::Column(name) => {
                Ok(input.field_with_name(name)?.data_type().clone())
            }
            ScalarExpr::Literal(value) => Ok(value.data_type()),
            ScalarExpr::BinaryExpr { left, op, .. } => {
                if op.is_predicate() {
                    Ok(DataType::Boolean)
                } else {
                    left.data_type(input)
                }
            }
            ScalarExpr::Not(_) => Ok(DataType::Boolean),
            ScalarExpr::Alias(inner, _) => inner.data_type(input),
        }
    }

    pub fn nullable(&self, input: &Schema) -> OptResult<bool> {
        match self {
            ScalarExpr::Column(name) => Ok(input.field_with_name(name)?.is_nullable()),
            ScalarExpr::Literal(value) => Ok(value.is_null()),
            ScalarExpr::BinaryExpr { left, right, .. } => {
                Ok(left.nullable(input)? || right.nullable(input)?)
            }
            ScalarExpr::Not(inner) => inner.nullable(input),
            ScalarExpr::Alias(inner, _) => inner.nullable(input),
        }
    }

    /// Field name this expression produces in a projection.
    pub fn output_name(&self) -> String {
        match self {
            ScalarExpr::Column(name) => name.clone(),
            ScalarExpr::Alias(_, name) => name.clone(),
            other => format!("{}", other),
        }
    }

    /// Output field of this expression against `input`.
    ///
    /// A bare column reference clones the input field so that projections
    /// keep name, type and nullability untouched.
    pub fn to_field(&self, input: &Schema) -> OptResult<Field> {
        match self {
            ScalarExpr::Column(name) => Ok(input.field_with_name(name)?.clone()),
            other => Ok(Field::new(
                other.output_name(),
                other.data_type(input)?,
                other.nullable(input)?,
            )),
        }
    }

    /// Splits a conjunctive predicate into its conjuncts.
    pub fn conjuncts(&self) -> Vec<&ScalarExpr> {
        match self {
            ScalarExpr::BinaryExpr {
                left,
                op: BinaryOp::And,
                right,
            } => {
                let mut ret = left.conjuncts();
                ret.extend(right.conjuncts());
                ret
            }
            other => vec![other],
        }
    }

    /// Column names referenced anywhere in this expression.
    pub fn referenced_columns(&self) -> Vec<&str> {
        match self {
            ScalarExpr::Column(name) => vec![name.as_str()],
            ScalarExpr::Literal(_) => vec![],
            ScalarExpr::BinaryExpr { left, right, .. } => {
                let mut ret = left.referenced_columns();
                ret.extend(right.referenced_columns());
                ret
            }
            ScalarExpr::Not(inner) => inner.referenced_columns(),
            ScalarExpr::Alias(inner, _) => inner.referenced_columns(),
        }
    }

    pub fn validate(&self, input: &Schema) -> OptResult<()> {
        for column in self.referenced_columns() {
            if input.field_with_name(column).is_err() {
                return Err(OptError::internal(format!(
                    "column {:?} not found in input schema",
                    column
                )));
            }
        }
        Ok(())
    }
}

impl Display for ScalarExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarExpr::Column(name) => write!(f, "{}", name),
            ScalarExpr::Literal(value) => write!(f, "{}", value),
            ScalarExpr::BinaryExpr { left, op, right } => {
                write!(f, "{} {} {}", left, op, right)
            }
            ScalarExpr::Not(inner) => write!(f, "NOT {}", inner),
            ScalarExpr::Alias(inner, name) => write!(f, "{} AS {}", inner, name),
        }
    }
}
