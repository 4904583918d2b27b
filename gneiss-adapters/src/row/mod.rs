//! The generic row-enumerator backend.

mod rules;
pub use rules::*;
mod implementor;
pub use implementor::*;

use gneiss::traits::Convention;

/// Convention of plans executed by the row enumerator.
pub const ROW: Convention = Convention::new("ROW");

/// Provider tag of tables served natively by the row engine.
pub const ROW_PROVIDER: &str = "row";
