use std::fmt;

use super::pool::{PackageId, Pool};
use super::rule::{Rule, RuleReason, RuleType};
use crate::package::LinkType;

/// A problem encountered during dependency resolution.
///
/// Problems explain why a solution cannot be found. Rules are rendered
/// against the pool when they are added, so a problem can outlive the solver.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    /// Rules involved in this problem, in the order they were implicated
    pub rules: Vec<ProblemRule>,
}

/// A rule that contributes to a problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRule {
    /// The rule ID
    pub rule_id: u32,
    /// Rule type
    pub rule_type: RuleType,
    /// Whether the rule could have been relaxed
    pub weak: bool,
    pub disabled: bool,
    /// The clause, e.g. `(-a-1.0|b-2.0)`
    pub rendered: String,
    /// Human-readable explanation
    pub reason: String,
}

impl Problem {
    /// Create a new problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to this problem, resolving names from the pool. A rule is
    /// recorded once.
    pub fn add_rule(&mut self, rule: &Rule, pool: &Pool) {
        if self.rules.iter().any(|existing| existing.rule_id == rule.id()) {
            return;
        }
        self.rules.push(ProblemRule {
            rule_id: rule.id(),
            rule_type: rule.rule_type(),
            weak: rule.is_weak(),
            disabled: rule.is_disabled(),
            rendered: rule.display(pool),
            reason: describe_reason(pool, rule.reason()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Generate a human-readable description of this problem
    pub fn describe(&self) -> String {
        self.rules
            .iter()
            .map(|rule| format!("  - {}: {}", rule.reason, rule.rendered))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn package_string(pool: &Pool, id: PackageId) -> String {
    pool.package(id)
        .map(|p| p.pretty_string())
        .unwrap_or_else(|| format!("#{}", id))
}

/// Providers of a link as the pool parsed it, so `self.version` links
/// resolve against the declaring package
fn link_providers(pool: &Pool, source: PackageId, link_type: LinkType, target: &str) -> Vec<PackageId> {
    pool.links(source, link_type)
        .find(|link| link.target == target)
        .map(|link| pool.what_provides_matching(target, Some(link.constraint.as_ref())))
        .unwrap_or_default()
}

/// Versions available under a name, for "found x[...]" hints
fn available_versions(pool: &Pool, name: &str) -> Vec<String> {
    pool.packages_by_name(name)
        .into_iter()
        .filter_map(|id| pool.package(id))
        .map(|p| p.pretty_version().to_string())
        .take(5)
        .collect()
}

/// Describe a rule reason in human-readable form
fn describe_reason(pool: &Pool, reason: &RuleReason) -> String {
    match reason {
        RuleReason::JobInstall { name, constraint } => {
            let constraint = constraint.as_deref().unwrap_or("*");
            if !pool.what_provides(name, Some(constraint)).is_empty() {
                return format!("Root request requires {} {}", name, constraint);
            }
            let available = available_versions(pool, name);
            if available.is_empty() {
                format!(
                    "Root request requires {} {}, but no matching package was found",
                    name, constraint
                )
            } else {
                format!(
                    "Root request requires {} {} -> found {}[{}] but it does not match the constraint",
                    name,
                    constraint,
                    name,
                    available.join(", ")
                )
            }
        }
        RuleReason::JobUpdate { name } => format!("Update request for {}", name),
        RuleReason::JobRemove { name } => format!("Removal request for {}", name),
        RuleReason::JobKeep { name } => format!("{} is kept at its installed version", name),
        RuleReason::InstalledKeep { package } => format!(
            "{} is installed and must stay installed or be updated",
            package_string(pool, *package)
        ),
        RuleReason::NoDowngrade { installed, candidate } => format!(
            "{} would downgrade installed {}",
            package_string(pool, *candidate),
            package_string(pool, *installed)
        ),
        RuleReason::PackageRequires {
            source,
            target,
            constraint,
        } => {
            let has_provider = !link_providers(pool, *source, LinkType::Require, target).is_empty();
            let source = package_string(pool, *source);
            if has_provider {
                return format!("{} requires {} {}", source, target, constraint);
            }
            let available = available_versions(pool, target);
            if available.is_empty() {
                format!("{} requires {} {} -> no matching package found", source, target, constraint)
            } else {
                format!(
                    "{} requires {} {} -> found {}[{}] but it does not match the constraint",
                    source,
                    target,
                    constraint,
                    target,
                    available.join(", ")
                )
            }
        }
        RuleReason::PackageConflict {
            source,
            target,
            constraint,
        } => format!("{} conflicts with {} {}", package_string(pool, *source), target, constraint),
        RuleReason::PackageReplaces { source, target } => format!(
            "{} replaces {} and cannot be installed alongside it",
            package_string(pool, *source),
            target
        ),
        RuleReason::SameName { name } => format!("Only one version of {} can be installed", name),
        RuleReason::Learned => "Learned constraint from conflict analysis".to_string(),
    }
}
