use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one participant site.
///
/// Results are keyed by this identity during aggregation, so two sites must
/// never share a name within one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for SiteId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
