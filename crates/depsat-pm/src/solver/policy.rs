use std::cmp::Ordering;
use std::collections::BTreeSet;

use depsat_semver::{Constraint, Operator};
use indexmap::IndexMap;

use super::pool::{PackageId, Pool};
use super::rule::Literal;

/// Strategy for choosing between candidate packages.
///
/// The solver asks the policy which literal to try first whenever a rule
/// leaves it a choice, and whether weak rules may be relaxed.
pub trait Policy {
    /// Whether installed packages may be removed to find a solution
    fn allow_uninstall(&self) -> bool;

    /// Whether installed packages may be replaced by older versions
    fn allow_downgrade(&self) -> bool;

    /// Compare the versions of two packages: is `a <operator> b`?
    fn version_compare(&self, pool: &Pool, a: PackageId, b: PackageId, operator: Operator) -> bool {
        let (Some(version_a), Some(version_b)) = (pool.normalized_version(a), pool.normalized_version(b)) else {
            return false;
        };
        let constraint = Constraint::new(operator, version_b.to_string());
        let version = Constraint::new(Operator::Equal, version_a.to_string());
        constraint.match_specific(&version, true)
    }

    /// Same-name packages `package` may be updated to.
    fn find_update_packages(&self, pool: &Pool, package: PackageId, allow_all: bool) -> Vec<PackageId> {
        let Some(name) = pool.package_name(package) else {
            return Vec::new();
        };
        pool.packages_by_name(name)
            .into_iter()
            .filter(|&candidate| candidate != package)
            .filter(|&candidate| {
                allow_all || self.allow_downgrade() || !self.version_compare(pool, package, candidate, Operator::GreaterThan)
            })
            .collect()
    }

    /// Priority of the repository a package comes from
    fn priority(&self, pool: &Pool, package: PackageId) -> i32 {
        pool.priority(package)
    }

    /// Order candidate literals by preference, best first, dropping the ones
    /// that should never be tried first.
    fn select_preferred_packages(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        literals: &[Literal],
    ) -> Vec<Literal>;
}

/// The stock policy: newest version, installed first, highest priority
/// repository, then lowest package id.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    allow_uninstall: bool,
    allow_downgrade: bool,
    prefer_lowest: bool,
}

impl DefaultPolicy {
    /// Create a new policy with default settings
    pub fn new() -> Self {
        Self {
            allow_uninstall: true,
            allow_downgrade: true,
            prefer_lowest: false,
        }
    }

    /// Set whether weak keep rules may be relaxed
    pub fn allowing_uninstall(mut self, allow: bool) -> Self {
        self.allow_uninstall = allow;
        self
    }

    /// Set whether weak no-downgrade rules may be relaxed
    pub fn allowing_downgrade(mut self, allow: bool) -> Self {
        self.allow_downgrade = allow;
        self
    }

    /// Set preference for lowest versions (for testing)
    pub fn prefer_lowest(mut self, prefer: bool) -> Self {
        self.prefer_lowest = prefer;
        self
    }

    pub fn prefers_lowest(&self) -> bool {
        self.prefer_lowest
    }

    /// Ordering used to rank candidates. Installed packages come first, then
    /// higher priority repositories. Within one repository a package sorts
    /// after the package it replaces unless `ignore_replace` is set.
    pub fn compare_by_priority_prefer_installed(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        a: PackageId,
        b: PackageId,
        ignore_replace: bool,
    ) -> Ordering {
        if pool.same_repository(a, b) {
            if !ignore_replace {
                if self.replaces(pool, a, b) {
                    return Ordering::Greater;
                }
                if self.replaces(pool, b, a) {
                    return Ordering::Less;
                }
            }
            return a.cmp(&b);
        }

        if installed.contains(&a) {
            return Ordering::Less;
        }
        if installed.contains(&b) {
            return Ordering::Greater;
        }

        self.priority(pool, b)
            .cmp(&self.priority(pool, a))
            .then(a.cmp(&b))
    }

    /// Whether `source` replaces the name of `target`. The replace
    /// constraint is not consulted; this is for ordering only.
    fn replaces(&self, pool: &Pool, source: PackageId, target: PackageId) -> bool {
        match (pool.package(source), pool.package(target)) {
            (Some(source), Some(target)) => source.replaces_name(&target.name),
            _ => false,
        }
    }

    fn group_by_name_prefer_installed(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        literals: &[Literal],
    ) -> IndexMap<String, Vec<Literal>> {
        let mut groups: IndexMap<String, Vec<Literal>> = IndexMap::new();
        for &literal in literals {
            let name = pool.package_name(literal.package_id()).unwrap_or_default().to_string();
            let group = groups.entry(name).or_default();
            if installed.contains(&literal.package_id()) {
                group.insert(0, literal);
            } else {
                group.push(literal);
            }
        }
        groups
    }

    fn sort_literals(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        literals: &mut [Literal],
        ignore_replace: bool,
    ) {
        // Insertion sort: stable, and well defined even when replace
        // precedence makes the comparator non-transitive.
        for i in 1..literals.len() {
            let mut j = i;
            while j > 0
                && self.compare_by_priority_prefer_installed(
                    pool,
                    installed,
                    literals[j - 1].package_id(),
                    literals[j].package_id(),
                    ignore_replace,
                ) == Ordering::Greater
            {
                literals.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn prune_to_best_version(&self, pool: &Pool, literals: Vec<Literal>) -> Vec<Literal> {
        let Some(&first) = literals.first() else {
            return literals;
        };
        let better = if self.prefer_lowest {
            Operator::LessThan
        } else {
            Operator::GreaterThan
        };

        let mut best = first.package_id();
        let mut selected = vec![first];
        for &literal in &literals[1..] {
            let candidate = literal.package_id();
            if self.version_compare(pool, candidate, best, better) {
                best = candidate;
                selected = vec![literal];
            } else if self.version_compare(pool, candidate, best, Operator::Equal) {
                selected.push(literal);
            }
        }
        selected
    }

    /// Expects installed literals first, then literals by descending priority.
    fn prune_to_highest_priority_or_installed(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        literals: Vec<Literal>,
    ) -> Vec<Literal> {
        let mut selected = Vec::with_capacity(literals.len());
        let mut priority = None;

        for literal in literals {
            let package = literal.package_id();
            if installed.contains(&package) {
                selected.push(literal);
                continue;
            }

            let package_priority = self.priority(pool, package);
            match priority {
                None => priority = Some(package_priority),
                Some(p) if p != package_priority => break,
                Some(_) => {}
            }
            selected.push(literal);
        }

        selected
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for DefaultPolicy {
    fn allow_uninstall(&self) -> bool {
        self.allow_uninstall
    }

    fn allow_downgrade(&self) -> bool {
        self.allow_downgrade
    }

    fn select_preferred_packages(
        &self,
        pool: &Pool,
        installed: &BTreeSet<PackageId>,
        literals: &[Literal],
    ) -> Vec<Literal> {
        let groups = self.group_by_name_prefer_installed(pool, installed, literals);

        let mut selected = Vec::new();
        for (_, mut group) in groups {
            self.sort_literals(pool, installed, &mut group, true);
            let group = self.prune_to_best_version(pool, group);
            let group = self.prune_to_highest_priority_or_installed(pool, installed, group);
            selected.extend(group);
        }

        // Across names, a replacing package ranks after what it replaces
        self.sort_literals(pool, installed, &mut selected, false);
        selected
    }
}
