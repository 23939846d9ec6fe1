//! Version selection over published versions
//!
//! The registry publishes versions as strings; anything that does not parse
//! as semver is ignored. Selection always picks the highest version under
//! semver precedence that the range accepts.

use std::collections::BTreeMap;

use pouch_core::types::{Version, VersionReq};

/// Version selector for finding best matching versions
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    /// Parsed version to the key it was published under
    available_versions: BTreeMap<Version, String>,
}

impl VersionSelector {
    pub fn new(versions: Vec<Version>) -> Self {
        let available_versions = versions
            .into_iter()
            .map(|version| {
                let key = version.to_string();
                (version, key)
            })
            .collect();
        Self { available_versions }
    }

    /// Build from registry version keys, skipping keys that are not semver
    pub fn from_published<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut available_versions = BTreeMap::new();
        for key in keys {
            match key.parse::<Version>() {
                Ok(version) => {
                    available_versions.insert(version, key.to_string());
                },
                Err(e) => tracing::debug!("Ignoring unparseable published version '{}': {}", key, e),
            }
        }
        Self { available_versions }
    }

    /// Highest version satisfying `req`
    pub fn select_best(&self, req: &VersionReq) -> Option<&Version> {
        self.available_versions
            .keys()
            .rev()
            .find(|version| req.matches(version))
    }

    /// The exact key `version` was published under
    pub fn published_key(&self, version: &Version) -> Option<&str> {
        self.available_versions.get(version).map(String::as_str)
    }

    /// All versions matching `req`, ascending
    pub fn find_matching(&self, req: &VersionReq) -> Vec<&Version> {
        self.available_versions
            .keys()
            .filter(|version| req.matches(version))
            .collect()
    }

    pub fn highest_version(&self) -> Option<&Version> {
        self.available_versions.keys().next_back()
    }

    pub fn len(&self) -> usize {
        self.available_versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }
}
