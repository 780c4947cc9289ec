use std::fmt;

use indexmap::IndexMap;

use super::{Dist, Link, LinkType, Source};

/// A package version that can take part in resolution.
///
/// `version` holds the version string as published; the pool normalizes it
/// when the package is added. `pretty_version` is what gets shown to users and
/// falls back to `version` when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub pretty_version: Option<String>,
    pub package_type: String,

    pub require: IndexMap<String, String>,
    pub conflict: IndexMap<String, String>,
    pub provide: IndexMap<String, String>,
    pub replace: IndexMap<String, String>,
    pub recommend: IndexMap<String, String>,
    pub suggest: IndexMap<String, String>,

    pub source: Option<Source>,
    pub dist: Option<Dist>,
}

impl Package {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            pretty_version: None,
            package_type: "library".to_string(),
            require: IndexMap::new(),
            conflict: IndexMap::new(),
            provide: IndexMap::new(),
            replace: IndexMap::new(),
            recommend: IndexMap::new(),
            suggest: IndexMap::new(),
            source: None,
            dist: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn pretty_version(&self) -> &str {
        self.pretty_version.as_deref().unwrap_or(&self.version)
    }

    /// `name version`, as shown in operation listings.
    pub fn pretty_string(&self) -> String {
        format!("{} {}", self.name, self.pretty_version())
    }

    /// Raw link map for a link type.
    pub fn link_map(&self, link_type: LinkType) -> &IndexMap<String, String> {
        match link_type {
            LinkType::Require => &self.require,
            LinkType::Conflict => &self.conflict,
            LinkType::Provide => &self.provide,
            LinkType::Replace => &self.replace,
            LinkType::Recommend => &self.recommend,
            LinkType::Suggest => &self.suggest,
        }
    }

    pub fn links(&self, link_type: LinkType) -> Vec<Link> {
        self.link_map(link_type)
            .iter()
            .map(|(target, constraint)| Link::new(&self.name, target, constraint, link_type))
            .collect()
    }

    /// Whether this package replaces a package called `name`, ignoring the
    /// version constraint of the replace link.
    pub fn replaces_name(&self, name: &str) -> bool {
        self.replace.keys().any(|target| target.eq_ignore_ascii_case(name))
    }

    /// Whether two packages point at the same source or dist artifact.
    pub fn same_artifact(&self, other: &Package) -> bool {
        match (&self.source, &other.source, &self.dist, &other.dist) {
            (Some(a), Some(b), _, _) => a.reference == b.reference && a.url == b.url,
            (_, _, Some(a), Some(b)) => a.url == b.url && a.reference == b.reference,
            _ => false,
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.pretty_version())
    }
}
