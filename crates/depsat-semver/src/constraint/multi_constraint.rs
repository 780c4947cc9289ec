//! Conjunctive and disjunctive constraint groups.

use std::fmt;

use super::ConstraintInterface;

/// A group of constraints joined by AND (`>=1.0 <2.0`) or OR (`^1.0 || ^2.0`).
#[derive(Debug, Clone)]
pub struct MultiConstraint {
    constraints: Vec<Box<dyn ConstraintInterface>>,
    conjunctive: bool,
    pretty_string: Option<String>,
}

impl MultiConstraint {
    pub fn new(constraints: Vec<Box<dyn ConstraintInterface>>, conjunctive: bool) -> Self {
        Self {
            constraints,
            conjunctive,
            pretty_string: None,
        }
    }

    pub fn constraints(&self) -> &[Box<dyn ConstraintInterface>] {
        &self.constraints
    }

    pub fn is_conjunctive(&self) -> bool {
        self.conjunctive
    }

    pub fn is_disjunctive(&self) -> bool {
        !self.conjunctive
    }
}

impl ConstraintInterface for MultiConstraint {
    fn matches(&self, provider: &dyn ConstraintInterface) -> bool {
        if !self.conjunctive {
            return self.constraints.iter().any(|c| provider.matches(c.as_ref()));
        }

        // A conjunction against a disjunction has to iterate the disjunction
        if let Some(multi) = provider.as_multi() {
            if multi.is_disjunctive() {
                return provider.matches(self);
            }
        }

        self.constraints.iter().all(|c| provider.matches(c.as_ref()))
    }

    fn pretty_string(&self) -> String {
        self.pretty_string.clone().unwrap_or_else(|| self.to_string())
    }

    fn set_pretty_string(&mut self, pretty: Option<String>) {
        self.pretty_string = pretty;
    }

    fn clone_box(&self) -> Box<dyn ConstraintInterface> {
        Box::new(self.clone())
    }

    fn as_multi(&self) -> Option<&MultiConstraint> {
        Some(self)
    }
}

impl fmt::Display for MultiConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.conjunctive { " " } else { " || " };
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join(separator))
    }
}
