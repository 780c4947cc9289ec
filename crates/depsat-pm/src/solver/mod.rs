//! SAT-based dependency resolver.
//!
//! This module implements a CDCL (Conflict-Driven Clause Learning) SAT solver
//! specifically designed for package dependency resolution.
//!
//! # Architecture
//!
//! The solver consists of several key components:
//!
//! - [`Pool`]: Registry of all available packages with lookup by name/constraint
//! - [`Request`]: Jobs describing what needs to change
//! - [`Policy`]: Which candidate to try first, and which weak rules may be relaxed
//! - [`RuleSet`]: Collection of SAT clauses representing dependencies
//! - [`Solver`]: The main CDCL algorithm implementation
//! - [`Transaction`]: The ordered operations of a solution
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: Convert jobs, installed state and dependency graph to SAT clauses
//! 2. **Unit Propagation**: Force decisions from unit clauses through watched literals
//! 3. **Decision Making**: Choose package versions using the policy
//! 4. **Conflict Analysis**: Learn from conflicts to avoid repeating mistakes
//! 5. **Backtracking**: Revert to the appropriate level on conflict
//! 6. **Relaxation**: Disable a weak rule and restart when nothing else helps
//!
//! # Example
//!
//! ```
//! use depsat_pm::package::Package;
//! use depsat_pm::solver::{DefaultPolicy, Pool, Request, Solver};
//!
//! let mut pool = Pool::new();
//! pool.add_package(Package::new("vendor/a", "1.0.0"));
//!
//! let mut request = Request::new();
//! request.install("vendor/a", "^1.0");
//!
//! let policy = DefaultPolicy::new();
//! let solver = Solver::new(&pool, &policy);
//!
//! match solver.solve(&request) {
//!     Ok(transaction) => assert_eq!(transaction.len(), 1),
//!     Err(error) => panic!("No solution: {}", error),
//! }
//! ```

mod config;
mod decisions;
mod policy;
mod pool;
mod problem;
mod request;
mod rule;
mod rule_generator;
mod rule_set;
#[allow(clippy::module_inception)]
mod solver;
mod transaction;
mod watch_graph;

#[cfg(test)]
mod tests;

pub use config::SolverConfig;
pub use decisions::Decisions;
pub use policy::{DefaultPolicy, Policy};
pub use pool::{PackageId, Pool, PoolBuilder, PoolLink, Repository, DEFAULT_REPOSITORY, INSTALLED_REPOSITORY};
pub use problem::{Problem, ProblemRule};
pub use request::{Job, JobCommand, Request};
pub use rule::{Literal, Relaxation, Rule, RuleReason, RuleType};
pub use rule_generator::{GeneratedRules, RuleGenerator};
pub use rule_set::{RuleSet, RuleSetStats};
pub use solver::Solver;
pub use transaction::{Operation, OperationKind, Transaction};
pub use watch_graph::RuleWatchGraph;
