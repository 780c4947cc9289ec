use std::collections::{BTreeSet, HashSet, VecDeque};

use depsat_semver::{ConstraintInterface, Operator, VersionParser};

use super::policy::Policy;
use super::pool::{PackageId, Pool};
use super::request::{Job, JobCommand, Request};
use super::rule::{Literal, Relaxation, Rule, RuleReason, RuleType};
use super::rule_set::RuleSet;
use crate::error::ConfigurationError;
use crate::package::LinkType;

/// Output of rule generation.
#[derive(Debug)]
pub struct GeneratedRules {
    pub rules: RuleSet,
    /// Installed packages the policy should still prefer. Packages named by
    /// an update job are left out so newer candidates win.
    pub policy_installed: BTreeSet<PackageId>,
}

/// Generates SAT rules from the request, the installed state and the
/// dependency graph.
///
/// - Jobs: install alternatives, update alternatives, remove and keep assertions
/// - Installed state: weak keep rules and weak no-downgrade assertions
/// - Package requirements: if A is installed, then B|C|D must be installed
/// - Conflicts: A and B cannot both be installed
/// - Obsoletes: one version per name, and no package next to its replacer
pub struct RuleGenerator<'a> {
    pool: &'a Pool,
    policy: &'a dyn Policy,
    parser: VersionParser,
    rules: RuleSet,
    /// Packages we've already processed
    added_packages: HashSet<PackageId>,
    queue: VecDeque<PackageId>,
}

impl<'a> RuleGenerator<'a> {
    /// Create a new rule generator
    pub fn new(pool: &'a Pool, policy: &'a dyn Policy) -> Self {
        Self {
            pool,
            policy,
            parser: VersionParser::new(),
            rules: RuleSet::new(),
            added_packages: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Generate all rules for a request
    pub fn generate(mut self, request: &Request) -> Result<GeneratedRules, ConfigurationError> {
        let mut policy_installed = self.pool.installed_map().clone();
        let mut named: HashSet<String> = HashSet::new();

        for job in request.jobs() {
            named.insert(job.package_name.to_lowercase());
            let updated = self.add_job_rules(job)?;
            for id in updated {
                policy_installed.remove(&id);
            }
        }

        self.add_installed_rules(request, &named);

        let pool = self.pool;
        for &id in pool.installed_map() {
            self.enqueue(id);
        }
        while let Some(id) = self.queue.pop_front() {
            self.add_package_rules(id);
        }

        log::debug!("Generated rules: {:?}", self.rules.stats());

        Ok(GeneratedRules {
            rules: self.rules,
            policy_installed,
        })
    }

    fn parse_job_constraint(&self, job: &Job) -> Result<Option<Box<dyn ConstraintInterface>>, ConfigurationError> {
        match &job.constraint {
            None => Ok(None),
            Some(constraint) => self
                .parser
                .parse_constraints(constraint)
                .map(Some)
                .map_err(|e| ConfigurationError::InvalidConstraint {
                    context: format!("{} {}", job.command.as_str(), job.package_name),
                    constraint: constraint.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Add the rules for one job. Returns the installed packages the job
    /// updates.
    fn add_job_rules(&mut self, job: &Job) -> Result<Vec<PackageId>, ConfigurationError> {
        let name = job.package_name.as_str();
        if !self.pool.knows_name(name) {
            return Err(ConfigurationError::UnknownPackage { name: name.to_string() });
        }
        let constraint = self.parse_job_constraint(job)?;
        let installed: Vec<PackageId> = self
            .pool
            .packages_by_name(name)
            .into_iter()
            .filter(|&id| self.pool.is_installed(id))
            .collect();

        match job.command {
            JobCommand::Update if !installed.is_empty() => {
                let matching: HashSet<PackageId> = self
                    .pool
                    .what_provides_matching(name, constraint.as_deref())
                    .into_iter()
                    .collect();

                for &package in &installed {
                    let mut candidates = vec![package];
                    candidates.extend(
                        self.policy
                            .find_update_packages(self.pool, package, job.allow_all)
                            .into_iter()
                            .filter(|id| matching.contains(id)),
                    );
                    for &id in &candidates {
                        self.enqueue(id);
                    }
                    self.rules.add(Rule::alternatives(
                        &candidates,
                        RuleReason::JobUpdate { name: name.to_string() },
                    ));
                }
                Ok(installed)
            }
            JobCommand::Install | JobCommand::Update => {
                let candidates = self.pool.what_provides_matching(name, constraint.as_deref());
                for &id in &candidates {
                    self.enqueue(id);
                }
                // Nothing matching leaves an empty rule that can never hold
                self.rules.add(Rule::alternatives(
                    &candidates,
                    RuleReason::JobInstall {
                        name: name.to_string(),
                        constraint: job.constraint.clone(),
                    },
                ));
                Ok(Vec::new())
            }
            JobCommand::Remove => {
                for id in self.pool.packages_by_name(name) {
                    let matches = match (&constraint, self.pool.normalized_version(id)) {
                        (Some(constraint), Some(version)) => constraint.satisfies(version),
                        _ => true,
                    };
                    if matches {
                        self.rules.add(Rule::new(
                            vec![Literal::forbid(id)],
                            RuleType::Job,
                            RuleReason::JobRemove { name: name.to_string() },
                        ));
                    }
                }
                Ok(Vec::new())
            }
            JobCommand::Keep => {
                if installed.is_empty() {
                    return Err(ConfigurationError::NotInstalled { name: name.to_string() });
                }
                for &id in &installed {
                    self.enqueue(id);
                    self.rules.add(Rule::new(
                        vec![Literal::install(id)],
                        RuleType::Job,
                        RuleReason::JobKeep { name: name.to_string() },
                    ));
                }
                Ok(Vec::new())
            }
        }
    }

    /// Weak rules derived from the installed state.
    fn add_installed_rules(&mut self, request: &Request, named: &HashSet<String>) {
        let pool = self.pool;
        let installed: Vec<PackageId> = pool.installed_map().iter().copied().collect();

        for &package in &installed {
            let Some(name) = pool.package_name(package) else {
                continue;
            };
            if named.contains(name) {
                continue;
            }
            let mut candidates = vec![package];
            candidates.extend(self.policy.find_update_packages(pool, package, false));
            for &id in &candidates {
                self.enqueue(id);
            }
            self.rules.add(
                Rule::alternatives(&candidates, RuleReason::InstalledKeep { package }).weak(Relaxation::Uninstall),
            );
        }

        for &package in &installed {
            let Some(name) = pool.package_name(package) else {
                continue;
            };
            if request.allows_all_versions_of(name) {
                continue;
            }
            for candidate in pool.packages_by_name(name) {
                if candidate == package || pool.is_installed(candidate) {
                    continue;
                }
                if self.policy.version_compare(pool, package, candidate, Operator::GreaterThan) {
                    self.rules.add(
                        Rule::new(
                            vec![Literal::forbid(candidate)],
                            RuleType::Job,
                            RuleReason::NoDowngrade {
                                installed: package,
                                candidate,
                            },
                        )
                        .weak(Relaxation::Downgrade),
                    );
                }
            }
        }
    }

    fn enqueue(&mut self, package_id: PackageId) {
        if self.added_packages.insert(package_id) {
            self.queue.push_back(package_id);
        }
    }

    /// Add all rules for a package (requirements, conflicts, obsoletes)
    fn add_package_rules(&mut self, package_id: PackageId) {
        let pool = self.pool;

        for link in pool.links(package_id, LinkType::Require) {
            let providers = pool.what_provides_matching(&link.target, Some(link.constraint.as_ref()));

            // A package providing its own requirement needs nothing else
            if providers.contains(&package_id) {
                continue;
            }

            self.rules.add(Rule::requires(
                package_id,
                &providers,
                RuleReason::PackageRequires {
                    source: package_id,
                    target: link.target.clone(),
                    constraint: link.pretty_constraint(),
                },
            ));

            for id in providers {
                self.enqueue(id);
            }
        }

        for link in pool.links(package_id, LinkType::Conflict) {
            for conflict_id in pool.what_provides_matching(&link.target, Some(link.constraint.as_ref())) {
                if conflict_id == package_id {
                    continue;
                }
                self.rules.add(Rule::conflict(
                    package_id,
                    conflict_id,
                    RuleType::PackageConflict,
                    RuleReason::PackageConflict {
                        source: package_id,
                        target: link.target.clone(),
                        constraint: link.pretty_constraint(),
                    },
                ));
            }
        }

        // Replaced packages cannot be installed next to their replacer. Other
        // replacers of the same name are obsoleted as well; plain providers
        // are not.
        for link in pool.links(package_id, LinkType::Replace) {
            for replaced_id in pool.what_provides_matching(&link.target, Some(link.constraint.as_ref())) {
                if replaced_id == package_id {
                    continue;
                }
                let same_name = pool.package_name(replaced_id) == Some(link.target.as_str());
                let also_replaces = pool
                    .links(replaced_id, LinkType::Replace)
                    .any(|other| other.target == link.target);
                if !same_name && !also_replaces {
                    continue;
                }
                self.rules.add(Rule::conflict(
                    package_id,
                    replaced_id,
                    RuleType::PackageObsoletes,
                    RuleReason::PackageReplaces {
                        source: package_id,
                        target: link.target.clone(),
                    },
                ));
            }
        }

        // Only one version of a name can be installed
        if let Some(name) = pool.package_name(package_id) {
            for other in pool.packages_by_name(name) {
                if other == package_id {
                    continue;
                }
                self.rules.add(Rule::conflict(
                    package_id,
                    other,
                    RuleType::PackageObsoletes,
                    RuleReason::SameName { name: name.to_string() },
                ));
            }
        }
    }
}
