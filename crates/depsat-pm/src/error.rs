//! Error types of the resolver.

use std::time::Duration;

use thiserror::Error;

use crate::solver::Problem;

/// Malformed pool or request input, detected before solving starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Package \"{name}\" is not available in any repository")]
    UnknownPackage { name: String },

    #[error("Invalid constraint \"{constraint}\" in {context}: {reason}")]
    InvalidConstraint {
        context: String,
        constraint: String,
        reason: String,
    },

    #[error("Invalid version \"{version}\" for package \"{name}\"")]
    InvalidVersion { name: String, version: String },

    #[error("Package entry {context} is missing its {field}")]
    MissingMetadata { context: String, field: &'static str },

    #[error("Cannot keep \"{name}\": no installed package matches")]
    NotInstalled { name: String },

    #[error("Repository name \"{name}\" is reserved")]
    ReservedRepository { name: String },
}

/// No assignment satisfies the request, even after relaxing every weak rule
/// the policy allows to be relaxed.
#[derive(Error, Debug, Clone)]
#[error("Your requirements could not be resolved to an installable set of packages.\n{problem}")]
pub struct UnresolvableError {
    pub problem: Problem,
}

#[derive(Error, Debug, Clone)]
pub enum SolverError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Unresolvable(#[from] UnresolvableError),

    #[error("Resolution aborted after {steps} steps ({elapsed:?})")]
    Timeout { steps: u64, elapsed: Duration },
}

pub type Result<T, E = SolverError> = std::result::Result<T, E>;
