//! Version handling for the depsat resolver.
//!
//! Package metadata in the pool uses Composer-style version strings. This crate
//! normalizes them into a comparable form, compares them the way PHP's
//! `version_compare` does, and parses constraint expressions such as
//! `^1.2 || >=2.0,<3.0` into [`ConstraintInterface`] trait objects.

mod constraint;
mod version_parser;

pub use constraint::{
    compare_versions, php_version_compare, Constraint, ConstraintError, ConstraintInterface,
    MatchAllConstraint, MatchNoneConstraint, MultiConstraint, Operator,
};
pub use version_parser::{VersionError, VersionParser};
