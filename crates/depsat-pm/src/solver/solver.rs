use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use super::config::SolverConfig;
use super::decisions::Decisions;
use super::policy::Policy;
use super::pool::{PackageId, Pool};
use super::problem::Problem;
use super::request::Request;
use super::rule::{Literal, Relaxation, Rule, RuleReason, RuleType};
use super::rule_generator::RuleGenerator;
use super::rule_set::RuleSet;
use super::transaction::Transaction;
use super::watch_graph::RuleWatchGraph;
use crate::error::{Result, SolverError, UnresolvableError};

/// CDCL solver over the rules generated for a request.
///
/// The solver borrows a frozen pool and a policy; every call to
/// [`Solver::solve`] builds its own rules, decisions and watch graph.
pub struct Solver<'a> {
    pool: &'a Pool,
    policy: &'a dyn Policy,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    pub fn new(pool: &'a Pool, policy: &'a dyn Policy) -> Self {
        Self {
            pool,
            policy,
            config: SolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Resolve a request into an ordered transaction.
    pub fn solve(&self, request: &Request) -> Result<Transaction> {
        self.pool.check()?;

        let generated = RuleGenerator::new(self.pool, self.policy).generate(request)?;
        let mut state = SolverState {
            pool: self.pool,
            policy: self.policy,
            config: &self.config,
            rules: generated.rules,
            policy_installed: generated.policy_installed,
            decisions: Decisions::new(),
            watch_graph: RuleWatchGraph::new(),
            learned_why: HashMap::new(),
            level: 0,
            propagate_index: 0,
            steps: 0,
            started: Instant::now(),
        };

        let selected = state.run()?;
        Ok(Transaction::from_selection(self.pool, &selected))
    }
}

enum Outcome {
    Solved,
    /// Conflict at level 0, with the conflicting rule
    Unsolvable(u32),
}

/// Per-call search state.
struct SolverState<'a> {
    pool: &'a Pool,
    policy: &'a dyn Policy,
    config: &'a SolverConfig,
    rules: RuleSet,
    policy_installed: BTreeSet<PackageId>,
    decisions: Decisions,
    watch_graph: RuleWatchGraph,
    /// Rules each learned rule was derived from
    learned_why: HashMap<u32, Vec<u32>>,
    level: u32,
    propagate_index: usize,
    steps: u64,
    started: Instant,
}

impl<'a> SolverState<'a> {
    fn run(&mut self) -> Result<BTreeSet<PackageId>> {
        log::debug!(
            "Solving {} rules over {} packages",
            self.rules.len(),
            self.pool.len()
        );

        // Weak rules given up so far, reported ahead of the final conflict
        let mut relaxed = Vec::new();

        loop {
            self.reset();
            match self.search()? {
                Outcome::Solved => {
                    log::debug!(
                        "Solved after {} steps, {} learned rules",
                        self.steps,
                        self.rules.stats().learned
                    );
                    return Ok(self.decisions.installed_packages().into_iter().collect());
                }
                Outcome::Unsolvable(conflict) => {
                    let implicated = self.analyze_unsolvable(conflict);
                    if let Some(rule_id) = self.relaxable_rule(&implicated) {
                        if let Some(rule) = self.rules.get_mut(rule_id) {
                            rule.disable();
                        }
                        relaxed.push(rule_id);
                        log::debug!(
                            "Relaxing weak rule #{} {} and restarting",
                            rule_id,
                            self.rules.get(rule_id).map(|r| r.display(self.pool)).unwrap_or_default()
                        );
                        continue;
                    }

                    let mut problem = Problem::new();
                    for id in relaxed.iter().copied().chain(implicated) {
                        if let Some(rule) = self.rules.get(id) {
                            problem.add_rule(rule, self.pool);
                        }
                    }
                    return Err(UnresolvableError { problem }.into());
                }
            }
        }
    }

    /// Drop learned rules and every decision. Disabled flags survive.
    fn reset(&mut self) {
        self.rules.remove_learned();
        self.learned_why.clear();
        self.decisions.reset();
        self.watch_graph = RuleWatchGraph::from_rules(&self.rules);
        self.level = 0;
        self.propagate_index = 0;
    }

    fn search(&mut self) -> Result<Outcome> {
        if let Some(conflict) = self.make_assertion_decisions() {
            return Ok(Outcome::Unsolvable(conflict));
        }
        if let Some(conflict) = self.propagate() {
            return Ok(Outcome::Unsolvable(conflict));
        }

        loop {
            let Some(literal) = self.next_job_choice().or_else(|| self.next_rule_choice()) else {
                return Ok(Outcome::Solved);
            };
            self.tick()?;

            self.level += 1;
            log::trace!("Deciding {} at level {}", literal.display(self.pool), self.level);
            self.decisions.decide(literal, self.level, None);

            while let Some(conflict) = self.propagate() {
                if self.level == 0 {
                    return Ok(Outcome::Unsolvable(conflict));
                }
                if !self.learn(conflict) {
                    return Ok(Outcome::Unsolvable(conflict));
                }
            }
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        let elapsed = self.started.elapsed();
        let over_steps = self.config.max_steps.is_some_and(|max| self.steps > max);
        let over_time = self.config.timeout.is_some_and(|timeout| elapsed > timeout);
        if over_steps || over_time {
            return Err(SolverError::Timeout {
                steps: self.steps,
                elapsed,
            });
        }
        Ok(())
    }

    /// Decide every enabled assertion at level 0. Returns a rule that can
    /// never hold.
    fn make_assertion_decisions(&mut self) -> Option<u32> {
        for id in self.rules.ordered_ids() {
            let Some(rule) = self.rules.get(id) else {
                continue;
            };
            if rule.is_disabled() {
                continue;
            }
            match rule.literals() {
                [] => return Some(id),
                [literal] => {
                    let literal = *literal;
                    if self.decisions.conflict(literal) {
                        return Some(id);
                    }
                    self.decisions.decide(literal, 0, Some(id));
                }
                _ => {}
            }
        }
        None
    }

    /// Unit propagation for every decision not yet propagated. Returns the
    /// conflicting rule, if any.
    fn propagate(&mut self) -> Option<u32> {
        while self.propagate_index < self.decisions.len() {
            let literal = self.decisions.queue()[self.propagate_index].0;
            self.propagate_index += 1;

            let conflict =
                self.watch_graph
                    .propagate_literal(literal, self.level, &mut self.rules, &mut self.decisions);
            if conflict.is_some() {
                return conflict;
            }
        }
        None
    }

    /// The literal to branch on for the first unsatisfied job rule.
    fn next_job_choice(&self) -> Option<Literal> {
        for id in self.rules.ids_of_type(RuleType::Job) {
            let Some(rule) = self.rules.get(*id) else {
                continue;
            };
            if rule.is_disabled() || self.is_satisfied(rule) {
                continue;
            }

            // Installed packages stay put unless something forces them out
            if let RuleReason::InstalledKeep { package } = rule.reason() {
                if self.decisions.undecided(*package) {
                    return Some(Literal::install(*package));
                }
            }

            if let Some(literal) = self.preferred_literal(rule) {
                return Some(literal);
            }
        }
        None
    }

    /// The literal to branch on for the first rule whose negative literals
    /// all hold and that leaves at least two positive literals open.
    fn next_rule_choice(&self) -> Option<Literal> {
        for rule in self.rules.iter() {
            if rule.is_disabled() || self.is_satisfied(rule) {
                continue;
            }
            let mut open = 0;
            let mut blocked = false;
            for &literal in rule.literals() {
                if literal.is_positive() {
                    if self.decisions.undecided(literal.package_id()) {
                        open += 1;
                    }
                } else if !self.decisions.decided_install(literal.package_id()) {
                    blocked = true;
                    break;
                }
            }
            if blocked || open < 2 {
                continue;
            }
            if let Some(literal) = self.preferred_literal(rule) {
                return Some(literal);
            }
        }
        None
    }

    fn is_satisfied(&self, rule: &Rule) -> bool {
        rule.literals().iter().any(|&literal| self.decisions.satisfied(literal))
    }

    fn preferred_literal(&self, rule: &Rule) -> Option<Literal> {
        let candidates: Vec<Literal> = rule
            .literals()
            .iter()
            .copied()
            .filter(|literal| literal.is_positive() && self.decisions.undecided(literal.package_id()))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let preferred = self
            .policy
            .select_preferred_packages(self.pool, &self.policy_installed, &candidates);
        preferred.first().or(candidates.first()).copied()
    }

    /// First-UIP conflict analysis. Adds the learned rule, backjumps and
    /// asserts the learned literal. Returns false if no decision explains the
    /// conflict.
    fn learn(&mut self, conflict: u32) -> bool {
        let mut seen: HashSet<PackageId> = HashSet::new();
        let mut level_zero_seen: HashSet<PackageId> = HashSet::new();
        let mut other_literals: Vec<Literal> = Vec::new();
        let mut why = vec![conflict];
        let mut at_current_level = 0usize;
        let mut trail_index = self.decisions.len();
        let mut rule_id = conflict;

        let uip = loop {
            if let Some(rule) = self.rules.get(rule_id) {
                for &literal in rule.literals() {
                    // the literal this rule implied
                    if self.decisions.satisfied(literal) {
                        continue;
                    }
                    let package = literal.package_id();
                    if !seen.insert(package) {
                        continue;
                    }
                    match self.decisions.decision_level(literal) {
                        Some(0) => self.level_zero_reasons(package, &mut level_zero_seen, &mut why),
                        Some(level) if level == self.level => at_current_level += 1,
                        _ => other_literals.push(literal),
                    }
                }
            }

            // Walk back to the most recent seen decision
            let decided = loop {
                if trail_index == 0 {
                    break None;
                }
                trail_index -= 1;
                let (literal, _) = self.decisions.queue()[trail_index];
                if seen.contains(&literal.package_id()) {
                    break Some(literal);
                }
            };
            let Some(decided) = decided else {
                break None;
            };

            at_current_level = at_current_level.saturating_sub(1);
            if at_current_level == 0 {
                break Some(decided.negate());
            }
            match self.decisions.decision_rule(decided) {
                Some(reason) => {
                    why.push(reason);
                    rule_id = reason;
                }
                None => break Some(decided.negate()),
            }
        };

        let Some(uip) = uip else {
            return false;
        };

        // Backjump to the highest level among the other literals
        let mut backjump_level = 0;
        let mut second_watch = None;
        for &literal in &other_literals {
            let level = self.decisions.decision_level(literal).unwrap_or(0);
            if second_watch.is_none() || level > backjump_level {
                backjump_level = level;
                second_watch = Some(literal);
            }
        }

        let mut literals = vec![uip];
        literals.extend(other_literals);
        let mut rule = Rule::new(literals, RuleType::Learned, RuleReason::Learned);
        if let Some(second) = second_watch {
            rule.set_watches(uip, second);
        }

        self.decisions.revert_to_level(backjump_level);
        self.level = backjump_level;
        self.propagate_index = self.decisions.len();

        let id = self.rules.add_learned(rule);
        self.watch_graph.insert(&self.rules, id);
        log::debug!(
            "Learned rule #{} {}, backjumping to level {}",
            id,
            self.rules.get(id).map(|r| r.display(self.pool)).unwrap_or_default(),
            backjump_level
        );
        self.learned_why.insert(id, why);

        self.decisions.decide(uip, self.level, Some(id));
        log::trace!("Deciding {} at level {}", uip.display(self.pool), self.level);
        true
    }

    /// Collect the reasons of a level 0 decision and, transitively, of the
    /// level 0 decisions those reasons depend on.
    fn level_zero_reasons(&self, package: PackageId, visited: &mut HashSet<PackageId>, why: &mut Vec<u32>) {
        let mut stack = vec![package];
        while let Some(package) = stack.pop() {
            if !visited.insert(package) {
                continue;
            }
            let Some(reason) = self.decisions.decision_rule(Literal::install(package)) else {
                continue;
            };
            if !why.contains(&reason) {
                why.push(reason);
            }
            if let Some(rule) = self.rules.get(reason) {
                stack.extend(
                    rule.literals()
                        .iter()
                        .map(|literal| literal.package_id())
                        .filter(|&other| other != package),
                );
            }
        }
    }

    /// Rules responsible for a level 0 conflict, with learned rules replaced
    /// by the rules they were derived from.
    fn analyze_unsolvable(&self, conflict: u32) -> Vec<u32> {
        let mut implicated = Vec::new();
        self.expand_rule(conflict, &mut implicated, &mut HashSet::new());

        let mut seen: HashSet<PackageId> = HashSet::new();
        if let Some(rule) = self.rules.get(conflict) {
            seen.extend(rule.literals().iter().map(|literal| literal.package_id()));
        }

        for &(literal, reason) in self.decisions.queue().iter().rev() {
            if !seen.contains(&literal.package_id()) {
                continue;
            }
            let Some(reason) = reason else {
                continue;
            };
            self.expand_rule(reason, &mut implicated, &mut HashSet::new());
            if let Some(rule) = self.rules.get(reason) {
                seen.extend(rule.literals().iter().map(|literal| literal.package_id()));
            }
        }

        implicated
    }

    fn expand_rule(&self, rule_id: u32, out: &mut Vec<u32>, expanding: &mut HashSet<u32>) {
        match self.learned_why.get(&rule_id) {
            Some(sources) => {
                if !expanding.insert(rule_id) {
                    return;
                }
                for &source in sources {
                    self.expand_rule(source, out, expanding);
                }
            }
            None => {
                if !out.contains(&rule_id) {
                    out.push(rule_id);
                }
            }
        }
    }

    /// The most recently added weak rule among `implicated` whose
    /// relaxation the policy allows.
    fn relaxable_rule(&self, implicated: &[u32]) -> Option<u32> {
        implicated
            .iter()
            .copied()
            .filter(|&id| {
                self.rules.get(id).is_some_and(|rule| {
                    rule.is_enabled()
                        && match rule.relaxation() {
                            Some(Relaxation::Uninstall) => self.policy.allow_uninstall(),
                            Some(Relaxation::Downgrade) => self.policy.allow_downgrade(),
                            None => false,
                        }
                })
            })
            .max()
    }
}
