//! Package model and dependency resolution.
//!
//! The [`solver`] module turns a [`solver::Request`] against a frozen
//! [`solver::Pool`] into a [`solver::Transaction`], an ordered list of
//! install, update and uninstall operations. [`scenario`] loads pools and
//! requests from JSON documents.

pub mod error;
pub mod package;
pub mod scenario;
pub mod solver;

pub use error::{ConfigurationError, Result, SolverError, UnresolvableError};
