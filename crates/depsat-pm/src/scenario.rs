//! JSON scenario documents.
//!
//! A scenario bundles everything a resolution needs: the repositories and
//! their packages, the installed packages, the jobs and the policy and solver
//! settings. Package entries use Composer-style keys.
//!
//! ```json
//! {
//!   "repositories": [{"name": "packagist", "priority": 0, "packages": [
//!     {"name": "vendor/a", "version": "1.0.0", "require": {"vendor/b": "^1.0"}}
//!   ]}],
//!   "installed": [],
//!   "request": [{"command": "install", "name": "vendor/a", "constraint": "^1.0"}],
//!   "policy": {"prefer_lowest": false},
//!   "solver": {"max_steps": 10000}
//! }
//! ```

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::package::{Dist, Package, Source};
use crate::solver::{
    DefaultPolicy, Job, JobCommand, Pool, Request, Solver, SolverConfig, Transaction, INSTALLED_REPOSITORY,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
    #[serde(default)]
    pub installed: Vec<PackageEntry>,
    #[serde(default)]
    pub request: Vec<JobEntry>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub solver: SolverSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

/// A package as it appears in a repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub require: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conflict: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub provide: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub replace: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub recommend: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub suggest: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<Dist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    pub command: JobCommand,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default)]
    pub allow_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub allow_uninstall: bool,
    pub allow_downgrade: bool,
    pub prefer_lowest: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_uninstall: true,
            allow_downgrade: true,
            prefer_lowest: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_steps: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl Scenario {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Register repositories in document order, then the installed packages.
    pub fn build_pool(&self) -> Result<Pool, ConfigurationError> {
        let mut pool = Pool::new();
        for repository in &self.repositories {
            if repository.name == INSTALLED_REPOSITORY {
                return Err(ConfigurationError::ReservedRepository {
                    name: repository.name.clone(),
                });
            }
            pool.set_priority(&repository.name, repository.priority);
            for entry in &repository.packages {
                pool.add_package_from_repo(Package::from(entry), &repository.name);
            }
        }
        for entry in &self.installed {
            pool.add_installed_package(Package::from(entry));
        }
        log::debug!(
            "Built pool with {} packages from {} repositories ({} installed)",
            pool.len(),
            self.repositories.len(),
            self.installed.len()
        );
        Ok(pool)
    }

    pub fn build_request(&self) -> Request {
        let mut request = Request::new();
        for entry in &self.request {
            let mut job = Job::new(entry.command, entry.name.as_str()).allowing_all(entry.allow_all);
            if let Some(constraint) = &entry.constraint {
                job = job.with_constraint(constraint.as_str());
            }
            request.add_job(job);
        }
        request
    }

    pub fn build_policy(&self) -> DefaultPolicy {
        DefaultPolicy::new()
            .allowing_uninstall(self.policy.allow_uninstall)
            .allowing_downgrade(self.policy.allow_downgrade)
            .prefer_lowest(self.policy.prefer_lowest)
    }

    pub fn solver_config(&self) -> SolverConfig {
        let mut config = SolverConfig::new();
        if let Some(max_steps) = self.solver.max_steps {
            config = config.with_max_steps(max_steps);
        }
        if let Some(timeout_ms) = self.solver.timeout_ms {
            config = config.with_timeout(Duration::from_millis(timeout_ms));
        }
        config
    }

    /// Build everything and solve.
    pub fn resolve(&self) -> Result<Transaction> {
        let pool = self.build_pool()?;
        let request = self.build_request();
        let policy = self.build_policy();
        Solver::new(&pool, &policy)
            .with_config(self.solver_config())
            .solve(&request)
    }

    /// Whether any job in the request uses the given command.
    pub fn has_command(&self, command: JobCommand) -> bool {
        self.request.iter().any(|job| job.command == command)
    }
}
