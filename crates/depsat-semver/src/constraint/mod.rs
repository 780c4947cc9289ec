//! Version constraints.

#[allow(clippy::module_inception)]
mod constraint;
mod match_all;
mod multi_constraint;

use std::fmt;
use std::str::FromStr;

pub use constraint::{compare_versions, php_version_compare, Constraint, ConstraintError};
pub use match_all::{MatchAllConstraint, MatchNoneConstraint};
pub use multi_constraint::MultiConstraint;

/// Relational operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }

    pub fn supported_operators() -> &'static [&'static str] {
        &["=", "==", "<", "<=", ">", ">=", "<>", "!="]
    }
}

/// Parses an operator, accepting the `=` and `<>` aliases.
impl FromStr for Operator {
    type Err = ConstraintError;

    fn from_str(operator: &str) -> Result<Self, Self::Err> {
        match operator {
            "==" | "=" => Ok(Operator::Equal),
            "!=" | "<>" => Ok(Operator::NotEqual),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEqual),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            _ => Err(ConstraintError::InvalidOperator {
                operator: operator.to_string(),
                expected: Operator::supported_operators().join(", "),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common interface of every constraint kind.
///
/// `matches` answers whether two constraints intersect, i.e. whether some
/// version could satisfy both. Matching a constraint against an `==` constraint
/// is therefore a plain "does this version satisfy it" check.
pub trait ConstraintInterface: fmt::Debug + fmt::Display + Send + Sync {
    fn matches(&self, provider: &dyn ConstraintInterface) -> bool;

    fn pretty_string(&self) -> String;

    fn set_pretty_string(&mut self, pretty: Option<String>);

    fn clone_box(&self) -> Box<dyn ConstraintInterface>;

    fn as_constraint(&self) -> Option<(&Operator, &str)> {
        None
    }

    fn as_multi(&self) -> Option<&MultiConstraint> {
        None
    }

    fn is_match_all(&self) -> bool {
        false
    }

    fn is_match_none(&self) -> bool {
        false
    }

    /// Whether a normalized version satisfies this constraint.
    fn satisfies(&self, normalized_version: &str) -> bool {
        let version = Constraint::new(Operator::Equal, normalized_version.to_string());
        self.matches(&version)
    }
}

impl Clone for Box<dyn ConstraintInterface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
