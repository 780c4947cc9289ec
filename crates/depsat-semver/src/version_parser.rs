//! Version string normalization and constraint parsing.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::constraint::{
    Constraint, ConstraintInterface, MatchAllConstraint, MultiConstraint, Operator,
};

/// Placeholder component for `x` in branch versions such as `1.0.x-dev`.
const BRANCH_WILDCARD: &str = "9999999";

lazy_static! {
    static ref CLASSICAL: Regex = Regex::new(
        r"(?i)^v?(\d{1,5})(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?(?:[._-]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?(?:[.-]?(dev))?$"
    )
    .unwrap();
    static ref BRANCH: Regex =
        Regex::new(r"(?i)^v?(\d+)(?:\.(\d+|[x*]))?(?:\.(\d+|[x*]))?(?:\.(\d+|[x*]))?[.-]?dev$").unwrap();
    static ref NAMED_BRANCH: Regex = Regex::new(r"(?i)^(master|main|trunk|default)$").unwrap();
    static ref STABILITY_FLAG: Regex = Regex::new(r"(?i)@(stable|rc|beta|alpha|dev)\b").unwrap();
    static ref OR_SPLIT: Regex = Regex::new(r"\s*\|\|?\s*").unwrap();
    static ref AND_SPLIT: Regex = Regex::new(r"\s*,\s*|\s+").unwrap();
    static ref OPERATOR_GAP: Regex = Regex::new(r"(<>|!=|>=?|<=?|==?|\^|~)\s+").unwrap();
    static ref HYPHEN_RANGE: Regex = Regex::new(r"^(\S+)\s+-\s+(\S+)$").unwrap();
    static ref WILDCARD: Regex = Regex::new(r"^v?[xX*](?:\.[xX*])*$").unwrap();
    static ref WILDCARD_VERSION: Regex =
        Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?\.[xX*]$").unwrap();
    static ref NUMERIC_PREFIX: Regex = Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?").unwrap();
    static ref OPERATOR_CONSTRAINT: Regex = Regex::new(r"^(<>|!=|>=?|<=?|==?)?\s*(.+)$").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{version}\"")]
    InvalidVersion { version: String },

    #[error("Could not parse version constraint \"{constraint}\": {reason}")]
    InvalidConstraint { constraint: String, reason: String },
}

/// Parses version strings and constraint expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionParser;

impl VersionParser {
    pub fn new() -> Self {
        VersionParser
    }

    /// Normalize a version string into its four-component comparable form.
    ///
    /// `1.2` becomes `1.2.0.0`, `v2.0.0-beta2` becomes `2.0.0.0-beta2`,
    /// `1.0.x-dev` becomes `1.0.9999999.9999999-dev` and named branches
    /// become `dev-<name>`.
    pub fn normalize(&self, version: &str) -> Result<String, VersionError> {
        let version = version.trim();
        let invalid = || VersionError::InvalidVersion {
            version: version.to_string(),
        };

        if version.is_empty() {
            return Err(invalid());
        }

        if let Some(branch) = version.strip_prefix("dev-") {
            if branch.is_empty() {
                return Err(invalid());
            }
            return Ok(version.to_string());
        }

        if NAMED_BRANCH.is_match(version) {
            return Ok(format!("dev-{}", version.to_lowercase()));
        }

        if let Some(caps) = CLASSICAL.captures(version) {
            let component = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("0");
            let mut normalized = format!("{}.{}.{}.{}", component(1), component(2), component(3), component(4));

            if let Some(stability) = caps.get(5) {
                let stability = expand_stability(stability.as_str());
                if stability != "stable" {
                    let number = caps
                        .get(6)
                        .map(|m| m.as_str().trim_start_matches(['.', '-']))
                        .unwrap_or("");
                    normalized.push('-');
                    normalized.push_str(stability);
                    normalized.push_str(number);
                }
            }

            if caps.get(7).is_some() {
                normalized.push_str("-dev");
            }

            return Ok(normalized);
        }

        if let Some(caps) = BRANCH.captures(version) {
            let component = |i: usize| match caps.get(i).map(|m| m.as_str()) {
                Some("x") | Some("X") | Some("*") | None => BRANCH_WILDCARD,
                Some(value) => value,
            };
            return Ok(format!(
                "{}.{}.{}.{}-dev",
                component(1),
                component(2),
                component(3),
                component(4)
            ));
        }

        Err(invalid())
    }

    /// Parse a constraint expression.
    ///
    /// Supports `*`, exact versions, the `== != < <= > >=` operators, `^` and
    /// `~` ranges, `1.0.*` wildcards, `a - b` hyphen ranges, AND via `,` or
    /// whitespace and OR via `||`. Stability flags like `@dev` are ignored.
    pub fn parse_constraints(&self, constraints: &str) -> Result<Box<dyn ConstraintInterface>, VersionError> {
        let pretty = constraints.trim();
        let stripped = STABILITY_FLAG.replace_all(pretty, "");
        let stripped = stripped.trim();

        let mut parsed = if stripped.is_empty() {
            Box::new(MatchAllConstraint::new()) as Box<dyn ConstraintInterface>
        } else {
            let mut or_groups = Vec::new();
            for group in OR_SPLIT.split(stripped) {
                or_groups.push(self.parse_and_group(group, pretty)?);
            }

            if or_groups.len() == 1 {
                or_groups.remove(0)
            } else {
                Box::new(MultiConstraint::new(or_groups, false))
            }
        };

        parsed.set_pretty_string(Some(pretty.to_string()));
        Ok(parsed)
    }

    fn parse_and_group(&self, group: &str, pretty: &str) -> Result<Box<dyn ConstraintInterface>, VersionError> {
        let group = group.trim();
        if group.is_empty() {
            return Err(VersionError::InvalidConstraint {
                constraint: pretty.to_string(),
                reason: "empty alternative".to_string(),
            });
        }

        let mut constraints = Vec::new();

        if let Some(caps) = HYPHEN_RANGE.captures(group) {
            let lower = self.normalize_in(&caps[1], pretty)?;
            constraints.push(single(Operator::GreaterThanOrEqual, lower));
            constraints.push(self.hyphen_upper_bound(&caps[2], pretty)?);
        } else {
            let joined = OPERATOR_GAP.replace_all(group, "$1");
            for part in AND_SPLIT.split(&joined).filter(|p| !p.is_empty()) {
                constraints.extend(self.parse_single(part, pretty)?);
            }
        }

        Ok(match constraints.len() {
            0 => Box::new(MatchAllConstraint::new()),
            1 => constraints.remove(0),
            _ => Box::new(MultiConstraint::new(constraints, true)),
        })
    }

    fn parse_single(&self, constraint: &str, pretty: &str) -> Result<Vec<Box<dyn ConstraintInterface>>, VersionError> {
        if WILDCARD.is_match(constraint) {
            return Ok(vec![Box::new(MatchAllConstraint::new())]);
        }

        if let Some(rest) = constraint.strip_prefix('^') {
            let parts = self.numeric_parts(rest, pretty)?;
            let position = if parts.values[0] != 0 || parts.count == 1 {
                1
            } else if parts.values[1] != 0 || parts.count < 3 {
                2
            } else {
                3
            };
            let lower = self.normalize_in(rest, pretty)?;
            return Ok(vec![
                single(Operator::GreaterThanOrEqual, lower),
                single(Operator::LessThan, bump(parts.values, position)),
            ]);
        }

        if let Some(rest) = constraint.strip_prefix('~') {
            let rest = rest.strip_prefix('>').unwrap_or(rest);
            let parts = self.numeric_parts(rest, pretty)?;
            let position = if parts.count == 1 { 1 } else { parts.count - 1 };
            let lower = self.normalize_in(rest, pretty)?;
            return Ok(vec![
                single(Operator::GreaterThanOrEqual, lower),
                single(Operator::LessThan, bump(parts.values, position)),
            ]);
        }

        if let Some(caps) = WILDCARD_VERSION.captures(constraint) {
            let mut values = [0u64; 4];
            let mut count = 0;
            for i in 1..=3 {
                if let Some(m) = caps.get(i) {
                    values[i - 1] = parse_component(m.as_str(), pretty)?;
                    count = i;
                }
            }
            let lower = format!("{}.{}.{}.{}", values[0], values[1], values[2], values[3]);
            return Ok(vec![
                single(Operator::GreaterThanOrEqual, lower),
                single(Operator::LessThan, bump(values, count)),
            ]);
        }

        let caps = OPERATOR_CONSTRAINT
            .captures(constraint)
            .ok_or_else(|| VersionError::InvalidConstraint {
                constraint: pretty.to_string(),
                reason: format!("unrecognized constraint \"{}\"", constraint),
            })?;

        let operator: Operator = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or("==")
            .parse()
            .map_err(|e: crate::ConstraintError| VersionError::InvalidConstraint {
                constraint: pretty.to_string(),
                reason: e.to_string(),
            })?;
        let mut version = self.normalize_in(&caps[2], pretty)?;

        // `<2.0` should not admit 2.0 pre-releases
        if operator == Operator::LessThan && !version.starts_with("dev-") && !version.contains('-') {
            version.push_str("-dev");
        }

        Ok(vec![single(operator, version)])
    }

    fn normalize_in(&self, version: &str, pretty: &str) -> Result<String, VersionError> {
        self.normalize(version).map_err(|_| VersionError::InvalidConstraint {
            constraint: pretty.to_string(),
            reason: format!("invalid version \"{}\"", version),
        })
    }

    /// A partial upper bound acts as a wildcard: `1.0 - 2.0` allows every
    /// `2.0.x`. Only a full version or one with a stability suffix is inclusive.
    fn hyphen_upper_bound(&self, upper: &str, pretty: &str) -> Result<Box<dyn ConstraintInterface>, VersionError> {
        let parts = self.numeric_parts(upper, pretty)?;
        let numeric_len = NUMERIC_PREFIX.find(upper).map_or(0, |m| m.end());
        if parts.count >= 3 || numeric_len < upper.len() {
            return Ok(single(Operator::LessThanOrEqual, self.normalize_in(upper, pretty)?));
        }
        Ok(single(Operator::LessThan, bump(parts.values, parts.count)))
    }

    fn numeric_parts(&self, version: &str, pretty: &str) -> Result<NumericParts, VersionError> {
        let caps = NUMERIC_PREFIX
            .captures(version)
            .ok_or_else(|| VersionError::InvalidConstraint {
                constraint: pretty.to_string(),
                reason: format!("expected a numeric version after range operator, got \"{}\"", version),
            })?;

        let mut parts = NumericParts {
            values: [0; 4],
            count: 0,
        };
        for i in 1..=4 {
            if let Some(m) = caps.get(i) {
                parts.values[i - 1] = parse_component(m.as_str(), pretty)?;
                parts.count = i;
            }
        }
        Ok(parts)
    }
}

struct NumericParts {
    values: [u64; 4],
    count: usize,
}

fn single(operator: Operator, version: String) -> Box<dyn ConstraintInterface> {
    Box::new(Constraint::new(operator, version))
}

fn parse_component(value: &str, pretty: &str) -> Result<u64, VersionError> {
    value.parse().map_err(|_| VersionError::InvalidConstraint {
        constraint: pretty.to_string(),
        reason: format!("version component \"{}\" is out of range", value),
    })
}

/// Increment the 1-based `position` component, zero the rest and mark the
/// result as the lowest possible pre-release of that version.
fn bump(mut values: [u64; 4], position: usize) -> String {
    let index = position.clamp(1, 4) - 1;
    values[index] += 1;
    for value in values.iter_mut().skip(index + 1) {
        *value = 0;
    }
    format!("{}.{}.{}.{}-dev", values[0], values[1], values[2], values[3])
}

fn expand_stability(stability: &str) -> &'static str {
    match stability.to_lowercase().as_str() {
        "a" | "alpha" => "alpha",
        "b" | "beta" => "beta",
        "p" | "pl" | "patch" => "patch",
        "rc" => "RC",
        _ => "stable",
    }
}
