use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of relationship a link expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Require,
    Conflict,
    Provide,
    Replace,
    Recommend,
    Suggest,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Require => "requires",
            LinkType::Conflict => "conflicts",
            LinkType::Provide => "provides",
            LinkType::Replace => "replaces",
            LinkType::Recommend => "recommends",
            LinkType::Suggest => "suggests",
        }
    }

    /// Link types that take part in resolution.
    pub fn resolvable() -> [LinkType; 4] {
        [LinkType::Require, LinkType::Conflict, LinkType::Provide, LinkType::Replace]
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link from one package to another package name, with a constraint string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub constraint: String,
    pub link_type: LinkType,
}

impl Link {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        constraint: impl Into<String>,
        link_type: LinkType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            constraint: constraint.into(),
            link_type,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.source, self.link_type, self.target, self.constraint)
    }
}
