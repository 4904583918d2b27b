//! The partitioned columnar-store backend.

mod rules;
pub use rules::*;
mod implementor;
pub use implementor::*;

use gneiss::traits::Convention;

/// Convention of plan fragments executed inside the columnar store.
pub const COLUMNAR: Convention = Convention::new("COLUMNAR");

/// Provider tag of tables owned by the columnar store.
pub const COLUMNAR_PROVIDER: &str = "columnar";
