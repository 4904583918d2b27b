//! ## Background
//!
//! The query optimizer accepts an abstract relational plan and outputs the
//! cheapest physically executable plan realizing it. What makes this
//! optimizer different from a single-engine one is that "physically
//! executable" is an open set: every storage backend speaks its own
//! execution dialect (a *convention*), and the optimizer's job includes
//! deciding which parts of a query run inside which backend and inserting
//! the bridges between them.
//!
//! The search is cost based and rule driven. Rules fire off a work queue
//! against a memo of equivalence groups: each group collects all known
//! logically identical alternatives of one subplan, deduplicated by a
//! canonical digest, together with the best-known alternative per required
//! trait set. Rewrite rules enlarge the search space within one convention;
//! converter rules cross conventions while preserving row types; when the
//! queue drains (fixed point) or the budget trips, the cheapest alternative
//! satisfying the caller's required traits is extracted, or a structured
//! error is returned.
//!
//! Backends extend the optimizer without touching the engine: they register
//! converter rules and enforcers into an [`planner::OptimizerConfig`] at
//! startup and receive the finished plan through the
//! [`implementor::Implementor`] walk.
//!
//! ## Design
//!
//! * [`operator`] Relational operators.
//! * [`traits`] Physical traits: convention, collation, distribution.
//! * [`rules`] Optimization rule definition and implementation.
//! * [`planner`] The memo and the rule-driven search engine.
//! * [`plan`] Query plans entering and leaving the optimizer.
//! * [`cost`] Cost model.
//! * [`implementor`] Hand-off of finished plans to backends.
//!
//! ## Reference
//!
//! 1. Graefe, G. and McKenna, W.J., 1993. The Volcano optimizer generator:
//! Extensibility and efficient search. ICDE.
//! 2. Graefe, G., 1995. The cascades framework for query optimization. IEEE
//! Data Eng. Bull., 18(3), pp.19-29.
//! 3. Begoli, E., Camacho-Rodríguez, J., Hyde, J., Mior, M.J. and Lemire,
//! D., 2018. Apache Calcite: A foundational framework for optimized query
//! processing over heterogeneous data sources. SIGMOD.

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

pub mod cost;
pub mod error;
pub mod expr;
pub mod implementor;
pub mod operator;
pub mod plan;
pub mod planner;
pub mod rules;
pub mod stat;
pub mod test_utils;
pub mod traits;
pub mod utils;
