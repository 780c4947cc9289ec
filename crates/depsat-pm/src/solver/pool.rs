use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use depsat_semver::{Constraint, ConstraintInterface, Operator, VersionParser};

use crate::error::ConfigurationError;
use crate::package::{LinkType, Package};

/// Pool-assigned package identifier, starting at 1.
pub type PackageId = i32;

/// Name of the repository holding the currently installed packages.
pub const INSTALLED_REPOSITORY: &str = "installed";

/// Repository used by [`Pool::add_package`].
pub const DEFAULT_REPOSITORY: &str = "default";

/// A named package source with a priority. Higher priorities win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub priority: i32,
}

/// A link with its constraint parsed, as stored in the pool.
#[derive(Debug, Clone)]
pub struct PoolLink {
    pub link_type: LinkType,
    /// Target name, lowercase
    pub target: String,
    pub constraint: Box<dyn ConstraintInterface>,
}

impl PoolLink {
    /// The constraint as written in the package metadata.
    pub fn pretty_constraint(&self) -> String {
        self.constraint.pretty_string()
    }
}

#[derive(Debug)]
struct PoolEntry {
    package: Arc<Package>,
    name: String,
    normalized_version: String,
    repository: usize,
    links: Vec<PoolLink>,
}

/// Pool of all available packages for dependency resolution.
///
/// The pool owns every package and hands out ids strictly at insertion time
/// (1-based, ascending). Versions are normalized and link constraints parsed
/// when a package is added; problems found on the way are collected and
/// reported by [`Pool::check`].
#[derive(Debug)]
pub struct Pool {
    entries: Vec<PoolEntry>,

    /// Package IDs indexed by name (lowercase)
    packages_by_name: HashMap<String, Vec<PackageId>>,

    /// Package IDs indexed by the names they provide or replace (lowercase)
    providers: HashMap<String, Vec<PackageId>>,

    repositories: Vec<Repository>,

    installed: BTreeSet<PackageId>,

    errors: Vec<ConfigurationError>,

    parser: VersionParser,
}

impl Pool {
    /// Create a new empty pool
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            packages_by_name: HashMap::new(),
            providers: HashMap::new(),
            repositories: vec![
                Repository {
                    name: INSTALLED_REPOSITORY.to_string(),
                    priority: i32::MAX,
                },
                Repository {
                    name: DEFAULT_REPOSITORY.to_string(),
                    priority: 0,
                },
            ],
            installed: BTreeSet::new(),
            errors: Vec::new(),
            parser: VersionParser::new(),
        }
    }

    /// Create a pool builder for fluent construction
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Add a package to the default repository, returning its ID
    pub fn add_package(&mut self, package: Package) -> PackageId {
        self.add_package_from_repo(package, DEFAULT_REPOSITORY)
    }

    /// Add a package to the installed repository and mark it installed
    pub fn add_installed_package(&mut self, package: Package) -> PackageId {
        let id = self.add_package_from_repo(package, INSTALLED_REPOSITORY);
        self.installed.insert(id);
        id
    }

    /// Add a package from a named repository, returning its ID
    pub fn add_package_from_repo(&mut self, package: Package, repo_name: &str) -> PackageId {
        let id = self.entries.len() as PackageId + 1;
        let repository = self.repository_index(repo_name);
        let name = package.name.to_lowercase();
        let context = format!("#{} ({} {})", id, package.name, package.version);

        if package.name.trim().is_empty() {
            self.errors.push(ConfigurationError::MissingMetadata {
                context: context.clone(),
                field: "name",
            });
        }

        let normalized_version = if package.version.trim().is_empty() {
            self.errors.push(ConfigurationError::MissingMetadata {
                context: context.clone(),
                field: "version",
            });
            String::new()
        } else {
            match self.parser.normalize(&package.version) {
                Ok(version) => version,
                Err(_) => {
                    self.errors.push(ConfigurationError::InvalidVersion {
                        name: package.name.clone(),
                        version: package.version.clone(),
                    });
                    package.version.clone()
                }
            }
        };

        let mut links = Vec::new();
        for link_type in LinkType::resolvable() {
            for (target, constraint) in package.link_map(link_type) {
                match self.parse_link_constraint(constraint, &normalized_version) {
                    Ok(parsed) => links.push(PoolLink {
                        link_type,
                        target: target.to_lowercase(),
                        constraint: parsed,
                    }),
                    Err(reason) => self.errors.push(ConfigurationError::InvalidConstraint {
                        context: format!("{} {} {} {}", package.name, package.version, link_type, target),
                        constraint: constraint.clone(),
                        reason,
                    }),
                }
            }
        }

        // Index by name
        self.packages_by_name.entry(name.clone()).or_default().push(id);

        // Index by provides and replaces
        for link in &links {
            if matches!(link.link_type, LinkType::Provide | LinkType::Replace) {
                let ids = self.providers.entry(link.target.clone()).or_default();
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
        }

        self.entries.push(PoolEntry {
            package: Arc::new(package),
            name,
            normalized_version,
            repository,
            links,
        });
        id
    }

    fn parse_link_constraint(
        &self,
        constraint: &str,
        own_version: &str,
    ) -> Result<Box<dyn ConstraintInterface>, String> {
        if constraint.trim() == "self.version" {
            let mut parsed = Constraint::new(Operator::Equal, own_version.to_string());
            parsed.set_pretty_string(Some(constraint.to_string()));
            return Ok(Box::new(parsed));
        }
        self.parser.parse_constraints(constraint).map_err(|e| e.to_string())
    }

    fn repository_index(&mut self, repo_name: &str) -> usize {
        if let Some(index) = self.repositories.iter().position(|r| r.name == repo_name) {
            return index;
        }
        self.repositories.push(Repository {
            name: repo_name.to_string(),
            priority: 0,
        });
        self.repositories.len() - 1
    }

    /// Mark a package as currently installed. Returns false for unknown ids.
    pub fn mark_installed(&mut self, id: PackageId) -> bool {
        if self.entry(id).is_none() {
            return false;
        }
        self.installed.insert(id);
        true
    }

    /// Set repository priority (higher = preferred). The installed
    /// repository always ranks above every other repository.
    pub fn set_priority(&mut self, repo_name: &str, priority: i32) {
        if repo_name == INSTALLED_REPOSITORY {
            log::warn!("Ignoring priority for the installed repository");
            return;
        }
        let index = self.repository_index(repo_name);
        self.repositories[index].priority = priority;
    }

    fn entry(&self, id: PackageId) -> Option<&PoolEntry> {
        if id > 0 {
            self.entries.get(id as usize - 1)
        } else {
            None
        }
    }

    /// Get a package by its ID
    pub fn package(&self, id: PackageId) -> Option<&Arc<Package>> {
        self.entry(id).map(|e| &e.package)
    }

    /// Lowercase name of a package
    pub fn package_name(&self, id: PackageId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    /// Normalized version of a package
    pub fn normalized_version(&self, id: PackageId) -> Option<&str> {
        self.entry(id).map(|e| e.normalized_version.as_str())
    }

    /// Repository a package was registered from
    pub fn repository(&self, id: PackageId) -> Option<&Repository> {
        self.entry(id).map(|e| &self.repositories[e.repository])
    }

    /// Whether two packages come from the same repository
    pub fn same_repository(&self, a: PackageId, b: PackageId) -> bool {
        match (self.entry(a), self.entry(b)) {
            (Some(a), Some(b)) => a.repository == b.repository,
            _ => false,
        }
    }

    /// Priority of the repository a package was registered from
    pub fn priority(&self, id: PackageId) -> i32 {
        self.repository(id).map(|r| r.priority).unwrap_or(0)
    }

    pub fn is_installed(&self, id: PackageId) -> bool {
        self.installed.contains(&id)
    }

    /// Ids of every installed package, ascending
    pub fn installed_map(&self) -> &BTreeSet<PackageId> {
        &self.installed
    }

    /// Parsed links of a given type
    pub fn links(&self, id: PackageId, link_type: LinkType) -> impl Iterator<Item = &PoolLink> + '_ {
        self.entry(id)
            .into_iter()
            .flat_map(|e| e.links.iter())
            .filter(move |link| link.link_type == link_type)
    }

    /// Get all packages with a given name
    pub fn packages_by_name(&self, name: &str) -> Vec<PackageId> {
        self.packages_by_name
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any package has, provides or replaces `name`
    pub fn knows_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.packages_by_name.contains_key(&name) || self.providers.contains_key(&name)
    }

    /// Find all packages that provide a given name (including the name itself)
    ///
    /// `constraint` is parsed first; an unparseable constraint matches nothing.
    pub fn what_provides(&self, name: &str, constraint: Option<&str>) -> Vec<PackageId> {
        let parsed = match constraint {
            Some(constraint) => match self.parser.parse_constraints(constraint) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    log::warn!("{}", e);
                    return Vec::new();
                }
            },
            None => None,
        };
        self.what_provides_matching(name, parsed.as_deref())
    }

    /// Find all packages whose name, provides or replaces match `name` and
    /// intersect `constraint`, in ascending id order.
    pub fn what_provides_matching(
        &self,
        name: &str,
        constraint: Option<&dyn ConstraintInterface>,
    ) -> Vec<PackageId> {
        let name_lower = name.to_lowercase();
        let mut result = Vec::new();

        // Direct matches
        if let Some(ids) = self.packages_by_name.get(&name_lower) {
            for &id in ids {
                if self.version_matches(id, constraint) {
                    result.push(id);
                }
            }
        }

        // Providers and replacers
        if let Some(ids) = self.providers.get(&name_lower) {
            for &id in ids {
                let provided = self.links(id, LinkType::Provide).chain(self.links(id, LinkType::Replace));
                let matches = provided
                    .filter(|link| link.target == name_lower)
                    .any(|link| match constraint {
                        Some(required) => required.matches(link.constraint.as_ref()),
                        None => true,
                    });
                if matches {
                    result.push(id);
                }
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    fn version_matches(&self, id: PackageId, constraint: Option<&dyn ConstraintInterface>) -> bool {
        match (constraint, self.normalized_version(id)) {
            (None, _) => true,
            (Some(constraint), Some(version)) => constraint.satisfies(version),
            (Some(_), None) => false,
        }
    }

    /// Get the total number of packages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all package IDs
    pub fn all_package_ids(&self) -> impl Iterator<Item = PackageId> {
        1..=self.entries.len() as PackageId
    }

    /// Problems found while loading packages
    pub fn errors(&self) -> &[ConfigurationError] {
        &self.errors
    }

    /// Fail with the first problem found while loading packages
    pub fn check(&self) -> Result<(), ConfigurationError> {
        match self.errors.first() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a Pool with packages from multiple sources
pub struct PoolBuilder {
    pool: Pool,
}

impl PoolBuilder {
    /// Create a new pool builder
    pub fn new() -> Self {
        Self { pool: Pool::new() }
    }

    /// Add a package to the pool
    pub fn add_package(mut self, package: Package) -> Self {
        self.pool.add_package(package);
        self
    }

    /// Add a package from a specific repository
    pub fn add_package_from_repo(mut self, package: Package, repo_name: &str) -> Self {
        self.pool.add_package_from_repo(package, repo_name);
        self
    }

    /// Add multiple packages from a specific repository
    pub fn add_packages_from_repo(mut self, packages: impl IntoIterator<Item = Package>, repo_name: &str) -> Self {
        for package in packages {
            self.pool.add_package_from_repo(package, repo_name);
        }
        self
    }

    /// Add a package that is currently installed
    pub fn add_installed_package(mut self, package: Package) -> Self {
        self.pool.add_installed_package(package);
        self
    }

    /// Set repository priority
    pub fn set_priority(mut self, repo_name: &str, priority: i32) -> Self {
        self.pool.set_priority(repo_name, priority);
        self
    }

    /// Build the pool
    pub fn build(self) -> Pool {
        self.pool
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
