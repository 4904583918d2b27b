//! Sample backend adapters for the gneiss optimizer.
//!
//! Two backends demonstrate how adapters plug into the optimizer core
//! without the core knowing about them:
//!
//! * [`row`]: a generic row enumerator able to execute every operator kind.
//!   It registers one converter rule lowering abstract nodes into its own
//!   convention, a sort enforcer, and an implementor emitting a linear
//!   execution program.
//! * [`columnar`]: a partitioned columnar store in the style of a key-value
//!   backed table engine. It can only scan and filter, and only filters it
//!   can evaluate natively (conjunctions of partition-key equalities) are
//!   accepted; everything else stays outside and reaches the store through
//!   an exchange bridge into the row convention.
//!
//! Registering both makes mixed plans come out of the optimizer: pushable
//! filters run inside the columnar store, the rest runs in the row engine
//! above an exchange.

pub mod columnar;
pub mod row;
