use std::collections::HashMap;

use super::decisions::Decisions;
use super::rule::Literal;
use super::rule_set::RuleSet;

/// Index from literal to the rules currently watching it.
///
/// Every enabled rule with two or more literals watches two of them. When a
/// watched literal becomes false the rule is revisited: it either moves the
/// watch to another literal that is not false, forces its other watch, or
/// reports a conflict.
#[derive(Debug, Default)]
pub struct RuleWatchGraph {
    watches: HashMap<Literal, Vec<u32>>,
}

impl RuleWatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every enabled non-assertion rule.
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::new();
        for id in rules.ordered_ids() {
            graph.insert(rules, id);
        }
        graph
    }

    /// Start watching a rule on its two watch slots.
    pub fn insert(&mut self, rules: &RuleSet, rule_id: u32) {
        let Some(rule) = rules.get(rule_id) else {
            return;
        };
        if rule.is_disabled() || rule.literals().len() < 2 {
            return;
        }
        if let (Some(first), Some(second)) = rule.watches() {
            self.watch(first, rule_id);
            self.watch(second, rule_id);
        }
    }

    pub fn watch(&mut self, literal: Literal, rule_id: u32) {
        self.watches.entry(literal).or_default().push(rule_id);
    }

    pub fn unwatch(&mut self, literal: Literal, rule_id: u32) {
        if let Some(ids) = self.watches.get_mut(&literal) {
            ids.retain(|&id| id != rule_id);
        }
    }

    /// Rule ids watching a literal, in the order they started watching it.
    pub fn watchers(&self, literal: Literal) -> &[u32] {
        self.watches.get(&literal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Propagate the consequences of `decided` becoming true.
    ///
    /// Unit implications are recorded in `decisions` at `level`. Returns the id
    /// of a rule whose literals are all false, if one is found.
    pub fn propagate_literal(
        &mut self,
        decided: Literal,
        level: u32,
        rules: &mut RuleSet,
        decisions: &mut Decisions,
    ) -> Option<u32> {
        let falsified = decided.negate();
        let watchers = self.watchers(falsified).to_vec();

        for rule_id in watchers {
            let Some(rule) = rules.get(rule_id) else {
                continue;
            };
            if rule.is_disabled() {
                continue;
            }
            let Some(other) = rule.other_watch(falsified) else {
                continue;
            };
            if decisions.satisfied(other) {
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&literal| literal != falsified && literal != other && !decisions.conflict(literal));

            if let Some(replacement) = replacement {
                self.unwatch(falsified, rule_id);
                self.watch(replacement, rule_id);
                if let Some(rule) = rules.get_mut(rule_id) {
                    rule.move_watch(falsified, replacement);
                }
                continue;
            }

            if decisions.conflict(other) {
                return Some(rule_id);
            }

            decisions.decide(other, level, Some(rule_id));
        }

        None
    }
}
