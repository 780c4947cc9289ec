//! Single version constraint implementation

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use super::{ConstraintInterface, Operator};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Invalid operator \"{operator}\", expected one of: {expected}")]
    InvalidOperator { operator: String, expected: String },
}

/// A single version constraint (e.g., ">= 1.0.0.0")
///
/// The version is expected in normalized form, see
/// [`VersionParser::normalize`](crate::VersionParser::normalize).
#[derive(Debug, Clone)]
pub struct Constraint {
    operator: Operator,
    version: String,
    pretty_string: Option<String>,
}

impl Constraint {
    pub fn new(operator: Operator, version: String) -> Self {
        Constraint {
            operator,
            version,
            pretty_string: None,
        }
    }

    /// Create a constraint from an operator string
    pub fn from_str(operator: &str, version: String) -> Result<Self, ConstraintError> {
        let op: Operator = operator.parse()?;
        Ok(Self::new(op, version))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Match against another single constraint.
    ///
    /// Returns true when some version can satisfy both `self` and `provider`.
    pub fn match_specific(&self, provider: &Constraint, compare_branches: bool) -> bool {
        let is_equal_op = self.operator == Operator::Equal;
        let is_non_equal_op = self.operator == Operator::NotEqual;
        let is_provider_equal_op = provider.operator == Operator::Equal;
        let is_provider_non_equal_op = provider.operator == Operator::NotEqual;

        if is_non_equal_op || is_provider_non_equal_op {
            if is_non_equal_op
                && !is_provider_non_equal_op
                && !is_provider_equal_op
                && provider.version.starts_with("dev-")
            {
                return false;
            }

            if is_provider_non_equal_op
                && !is_non_equal_op
                && !is_equal_op
                && self.version.starts_with("dev-")
            {
                return false;
            }

            if !is_equal_op && !is_provider_equal_op {
                return true;
            }

            return self.version_compare(&provider.version, &self.version, Operator::NotEqual, compare_branches);
        }

        let self_direction = direction(self.operator);
        let provider_direction = direction(provider.operator);

        // Two bounds pointing the same way always overlap
        if self_direction.is_some() && self_direction == provider_direction {
            return !(self.version.starts_with("dev-") || provider.version.starts_with("dev-"));
        }

        let (version1, version2, operator) = if is_equal_op {
            (&self.version, &provider.version, provider.operator)
        } else {
            (&provider.version, &self.version, self.operator)
        };

        if !self.version_compare(version1, version2, operator, compare_branches) {
            return false;
        }

        // require >= 2 and provide < 2 touch without overlapping
        if !is_equal_op
            && !is_provider_equal_op
            && self_direction.is_some()
            && provider_direction.is_some()
            && compare_versions(&provider.version, &self.version) == Ordering::Equal
        {
            let self_inclusive = matches!(self.operator, Operator::LessThanOrEqual | Operator::GreaterThanOrEqual);
            let provider_inclusive =
                matches!(provider.operator, Operator::LessThanOrEqual | Operator::GreaterThanOrEqual);
            return self_inclusive && provider_inclusive;
        }

        true
    }

    /// Compare two versions with an operator, treating `dev-*` branches as
    /// incomparable to numbered versions unless `compare_branches` is set.
    pub fn version_compare(&self, a: &str, b: &str, operator: Operator, compare_branches: bool) -> bool {
        let a_is_branch = a.starts_with("dev-");
        let b_is_branch = b.starts_with("dev-");

        if operator == Operator::NotEqual && (a_is_branch || b_is_branch) {
            return a != b;
        }

        if a_is_branch && b_is_branch {
            return operator == Operator::Equal && a == b;
        }

        if !compare_branches && (a_is_branch || b_is_branch) {
            return false;
        }

        php_version_compare(a, b, operator.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Less,
    Greater,
}

fn direction(operator: Operator) -> Option<Direction> {
    match operator {
        Operator::LessThan | Operator::LessThanOrEqual => Some(Direction::Less),
        Operator::GreaterThan | Operator::GreaterThanOrEqual => Some(Direction::Greater),
        _ => None,
    }
}

impl ConstraintInterface for Constraint {
    fn matches(&self, other: &dyn ConstraintInterface) -> bool {
        if let Some((op, ver)) = other.as_constraint() {
            let provider = Constraint::new(*op, ver.to_string());
            return self.match_specific(&provider, false);
        }

        if other.is_match_all() {
            return true;
        }

        if other.is_match_none() {
            return false;
        }

        // MultiConstraint knows how to match against a single constraint
        other.matches(self)
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

    fn as_constraint(&self) -> Option<(&Operator, &str)> {
        Some((&self.operator, &self.version))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

/// PHP-compatible version_compare
pub fn php_version_compare(a: &str, b: &str, operator: &str) -> bool {
    let cmp = compare_versions(a, b);

    match operator {
        "==" | "=" => cmp == Ordering::Equal,
        "!=" | "<>" => cmp != Ordering::Equal,
        "<" => cmp == Ordering::Less,
        "<=" => cmp != Ordering::Greater,
        ">" => cmp == Ordering::Greater,
        ">=" => cmp != Ordering::Less,
        _ => false,
    }
}

/// Rank of a plain number among the special forms.
const NUMBER_ORDER: i32 = 4;

/// Compare two version strings the way PHP's `version_compare` does.
///
/// Versions are split on separators and on digit/letter boundaries. When one
/// side runs out of parts, a remaining number makes it greater while a
/// remaining special form is ranked against a plain number, so `1.0-beta`
/// sorts before `1.0` and `1.0-patch1` after it.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = split_version(a);
    let b_parts = split_version(b);

    let mut i = 0;
    loop {
        let cmp = match (a_parts.get(i), b_parts.get(i)) {
            (Some(a_part), Some(b_part)) => compare_part(a_part, b_part),
            (Some(a_part), None) => {
                return if is_numeric(a_part) {
                    Ordering::Greater
                } else {
                    special_order(a_part).cmp(&NUMBER_ORDER)
                };
            }
            (None, Some(b_part)) => {
                return if is_numeric(b_part) {
                    Ordering::Less
                } else {
                    NUMBER_ORDER.cmp(&special_order(b_part))
                };
            }
            (None, None) => return Ordering::Equal,
        };

        if cmp != Ordering::Equal {
            return cmp;
        }
        i += 1;
    }
}

fn split_version(version: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_type: Option<CharType> = None;

    for c in version.chars() {
        let current_type = if c.is_ascii_digit() {
            CharType::Digit
        } else if c.is_alphabetic() {
            CharType::Alpha
        } else {
            CharType::Separator
        };

        if current_type == CharType::Separator {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_type = None;
            continue;
        }

        if prev_type.is_some() && prev_type != Some(current_type) && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }

        current.push(c);
        prev_type = Some(current_type);
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

#[derive(Clone, Copy, PartialEq)]
enum CharType {
    Digit,
    Alpha,
    Separator,
}

fn is_numeric(part: &str) -> bool {
    part.bytes().all(|b| b.is_ascii_digit())
}

fn compare_part(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => compare_numeric(a, b),
        (true, false) => NUMBER_ORDER.cmp(&special_order(b)),
        (false, true) => special_order(a).cmp(&NUMBER_ORDER),
        (false, false) => special_order(a).cmp(&special_order(b)),
    }
}

/// Numeric comparison that does not overflow on long digit runs.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn special_order(s: &str) -> i32 {
    const FORMS: [(&str, i32); 9] = [
        ("dev", 0),
        ("alpha", 1),
        ("a", 1),
        ("beta", 2),
        ("b", 2),
        ("rc", 3),
        ("#", NUMBER_ORDER),
        ("pl", 5),
        ("p", 5),
    ];

    let lower = s.to_lowercase();
    FORMS
        .iter()
        .find(|(form, _)| lower.starts_with(form))
        .map(|&(_, order)| order)
        .unwrap_or(-6)
}
