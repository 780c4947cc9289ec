use std::collections::HashMap;

use super::rule::{Rule, RuleType};

/// Rule counts per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSetStats {
    pub total: usize,
    pub job: usize,
    pub requires: usize,
    pub conflict: usize,
    pub obsoletes: usize,
    pub learned: usize,
}

/// Rules indexed by id and grouped by category.
///
/// Ids are positions in insertion order and stay stable for the lifetime of
/// the set. Equal rules of the same category and weakness are stored once.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    by_type: HashMap<RuleType, Vec<u32>>,
    by_hash: HashMap<String, Vec<u32>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning its id, or `None` if an equal rule exists.
    pub fn add(&mut self, rule: Rule) -> Option<u32> {
        if let Some(ids) = self.by_hash.get(rule.hash()) {
            let duplicate = ids.iter().any(|&id| {
                let existing = &self.rules[id as usize];
                existing.rule_type() == rule.rule_type()
                    && existing.relaxation() == rule.relaxation()
                    && *existing == rule
            });
            if duplicate {
                return None;
            }
        }
        Some(self.push(rule))
    }

    /// Add a learned rule without deduplication.
    pub fn add_learned(&mut self, rule: Rule) -> u32 {
        self.push(rule)
    }

    fn push(&mut self, mut rule: Rule) -> u32 {
        let id = self.rules.len() as u32;
        rule.set_id(id);
        self.by_type.entry(rule.rule_type()).or_default().push(id);
        self.by_hash.entry(rule.hash().to_string()).or_default().push(id);
        self.rules.push(rule);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Rule> {
        self.rules.get_mut(id as usize)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule ids of one category, ascending.
    pub fn ids_of_type(&self, rule_type: RuleType) -> &[u32] {
        self.by_type.get(&rule_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> + '_ {
        self.ids_of_type(rule_type).iter().map(move |&id| &self.rules[id as usize])
    }

    /// All rules in category order, ascending id within a category.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> + '_ {
        RuleType::ALL.iter().flat_map(move |&rule_type| self.rules_of_type(rule_type))
    }

    /// Ids of all rules in category order.
    pub fn ordered_ids(&self) -> Vec<u32> {
        self.iter().map(Rule::id).collect()
    }

    /// Drop every learned rule. Learned rules are always the most recently
    /// added, so ids of the remaining rules do not change.
    pub fn remove_learned(&mut self) {
        let Some(first) = self.ids_of_type(RuleType::Learned).first().copied() else {
            return;
        };
        self.rules.truncate(first as usize);
        self.by_type.remove(&RuleType::Learned);
        for ids in self.by_hash.values_mut() {
            ids.retain(|&id| id < first);
        }
        self.by_hash.retain(|_, ids| !ids.is_empty());
    }

    pub fn stats(&self) -> RuleSetStats {
        RuleSetStats {
            total: self.rules.len(),
            job: self.ids_of_type(RuleType::Job).len(),
            requires: self.ids_of_type(RuleType::PackageRequires).len(),
            conflict: self.ids_of_type(RuleType::PackageConflict).len(),
            obsoletes: self.ids_of_type(RuleType::PackageObsoletes).len(),
            learned: self.ids_of_type(RuleType::Learned).len(),
        }
    }
}
