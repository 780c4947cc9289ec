use serde::{Deserialize, Serialize};

/// Where a package's sources can be checked out from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: String,
    pub url: String,
    pub reference: String,
}

impl Source {
    pub fn new(source_type: &str, url: &str, reference: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            url: url.to_string(),
            reference: reference.to_string(),
        }
    }
}

/// A distributable archive of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    #[serde(rename = "type")]
    pub dist_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
}

impl Dist {
    pub fn new(dist_type: &str, url: &str) -> Self {
        Self {
            dist_type: dist_type.to_string(),
            url: url.to_string(),
            reference: None,
            shasum: None,
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn with_shasum(mut self, shasum: &str) -> Self {
        self.shasum = Some(shasum.to_string());
        self
    }
}
