use std::fmt::{Display, Formatter};

/// Ordering of one column.
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct ColumnOrder {
    column: String,
    /// Ascending or descending.
    descending: bool,
    /// Should nulls be sorted first.
    nulls_first: bool,
}

impl ColumnOrder {
    pub fn asc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            descending: false,
            nulls_first: false,
        }
    }

    pub fn desc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            descending: true,
            nulls_first: false,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }
}

impl Display for ColumnOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.column,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

/// Sort order trait of a plan node.
///
/// An empty collation means no ordering guarantee. Satisfaction is a prefix
/// relation rather than equality: rows sorted by `(a, b)` also satisfy a
/// requirement for "sorted by `a`", so a stronger guarantee is reusable
/// wherever a weaker one is required.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub struct Collation {
    orders: Vec<ColumnOrder>,
}

impl Collation {
    pub fn new<I: IntoIterator<Item = ColumnOrder>>(orders: I) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn orders(&self) -> &[ColumnOrder] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn satisfies(&self, required: &Collation) -> bool {
        self.orders.len() >= required.orders.len()
            && self.orders[..required.orders.len()] == required.orders[..]
    }
}

impl Display for Collation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (idx, order) in self.orders.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", order)?;
        }
        write!(f, "]")
    }
}
