//! Constraints that match every version or none.

use std::fmt;

use super::ConstraintInterface;

/// Matches any version (`*`).
#[derive(Debug, Clone, Default)]
pub struct MatchAllConstraint {
    pretty_string: Option<String>,
}

impl MatchAllConstraint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintInterface for MatchAllConstraint {
    fn matches(&self, provider: &dyn ConstraintInterface) -> bool {
        !provider.is_match_none()
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

    fn is_match_all(&self) -> bool {
        true
    }
}

impl fmt::Display for MatchAllConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*")
    }
}

/// Matches no version at all.
#[derive(Debug, Clone, Default)]
pub struct MatchNoneConstraint {
    pretty_string: Option<String>,
}

impl MatchNoneConstraint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintInterface for MatchNoneConstraint {
    fn matches(&self, _provider: &dyn ConstraintInterface) -> bool {
        false
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

    fn is_match_none(&self) -> bool {
        true
    }
}

impl fmt::Display for MatchNoneConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[]")
    }
}
