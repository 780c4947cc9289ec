use std::collections::HashMap;

use super::pool::PackageId;
use super::rule::Literal;

/// A single decision record
#[derive(Debug, Clone, Copy)]
struct Decision {
    /// Whether the package is installed (true) or not (false)
    installed: bool,
    /// The decision level at which this was decided
    level: u32,
    /// Rule that forced the decision, `None` for branch choices
    rule: Option<u32>,
}

/// Tracks decisions made during SAT solving.
///
/// Each decision records:
/// - Whether a package is installed (+) or not installed (-)
/// - At what decision level it was decided
/// - Which rule caused the decision
#[derive(Debug, Default)]
pub struct Decisions {
    /// Maps package ID to decision
    decision_map: HashMap<PackageId, Decision>,

    /// Queue of decisions in order made [(literal, rule_id)]
    decision_queue: Vec<(Literal, Option<u32>)>,
}

impl Decisions {
    /// Create a new empty decisions tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision at `level`.
    ///
    /// Returns false if this conflicts with an existing decision
    pub fn decide(&mut self, literal: Literal, level: u32, rule_id: Option<u32>) -> bool {
        let package_id = literal.package_id();
        let install = literal.is_positive();

        if let Some(existing) = self.decision_map.get(&package_id) {
            return existing.installed == install;
        }

        self.decision_map.insert(
            package_id,
            Decision {
                installed: install,
                level,
                rule: rule_id,
            },
        );
        self.decision_queue.push((literal, rule_id));

        true
    }

    /// Check if a literal is satisfied by current decisions
    pub fn satisfied(&self, literal: Literal) -> bool {
        self.decision_map
            .get(&literal.package_id())
            .map(|decision| decision.installed == literal.is_positive())
            .unwrap_or(false)
    }

    /// Check if a literal conflicts with current decisions
    pub fn conflict(&self, literal: Literal) -> bool {
        self.decision_map
            .get(&literal.package_id())
            .map(|decision| decision.installed != literal.is_positive())
            .unwrap_or(false)
    }

    /// Check if a package has been decided (either way)
    pub fn decided(&self, package_id: PackageId) -> bool {
        self.decision_map.contains_key(&package_id)
    }

    /// Check if a package is undecided
    pub fn undecided(&self, package_id: PackageId) -> bool {
        !self.decided(package_id)
    }

    /// Check if a package was decided to be installed
    pub fn decided_install(&self, package_id: PackageId) -> bool {
        self.decision_map.get(&package_id).map(|d| d.installed).unwrap_or(false)
    }

    /// Get the decision level for a literal's package
    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        self.decision_map.get(&literal.package_id()).map(|d| d.level)
    }

    /// Get the rule that caused a decision
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        self.decision_map.get(&literal.package_id()).and_then(|d| d.rule)
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        self.decision_map.retain(|_, decision| decision.level <= target_level);

        let decision_map = &self.decision_map;
        self.decision_queue
            .retain(|(literal, _)| decision_map.contains_key(&literal.package_id()));
    }

    /// Get all packages decided to be installed, ascending
    pub fn installed_packages(&self) -> Vec<PackageId> {
        let mut ids: Vec<_> = self
            .decision_map
            .iter()
            .filter(|(_, d)| d.installed)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Get the decision queue
    pub fn queue(&self) -> &[(Literal, Option<u32>)] {
        &self.decision_queue
    }

    /// Get the number of decisions
    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    /// Check if no decisions have been made
    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }

    /// Reset all decisions
    pub fn reset(&mut self) {
        self.decision_map.clear();
        self.decision_queue.clear();
    }
}
