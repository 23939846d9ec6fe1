//! Package identity types shared by the resolver, scheduler and caches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform shims that never install outside their own OS; skipped unless
/// the skip list is overridden
pub const DEFAULT_SKIP_PACKAGES: &[&str] = &["fsevents"];

/// A dependency edge waiting to be resolved: `(name, range)` plus an
/// optional tarball URL that is already known
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRequest {
    pub name: String,
    pub range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball_url: Option<String>,
}

impl PackageRequest {
    /// Create a request for `name` constrained by `range`
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
            tarball_url: None,
        }
    }

    /// Request the `latest` dist-tag of `name`
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, "latest")
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.range)
    }
}

/// A package pinned to one published version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    pub tarball_url: String,
    /// Declared runtime dependencies, in manifest order
    pub dependencies: Vec<(String, String)>,
}

impl ResolvedPackage {
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(&self.name, &self.version, &self.tarball_url)
    }

    /// Declared dependencies as requests for the next round of analysis
    pub fn dependency_requests(&self) -> Vec<PackageRequest> {
        self.dependencies
            .iter()
            .map(|(name, range)| PackageRequest::new(name, range))
            .collect()
    }
}

/// `(name, version, tarball)` triple; persisted as a three-element JSON array
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
    pub tarball_url: String,
}

impl PackageIdentity {
    pub fn new(name: &str, version: &str, tarball_url: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            tarball_url: tarball_url.to_string(),
        }
    }

    /// Install request that reuses the already known tarball URL
    pub fn to_request(&self) -> PackageRequest {
        PackageRequest {
            name: self.name.clone(),
            range: self.version.clone(),
            tarball_url: Some(self.tarball_url.clone()).filter(|url| !url.is_empty()),
        }
    }
}

impl From<(String, String, String)> for PackageIdentity {
    fn from((name, version, tarball_url): (String, String, String)) -> Self {
        Self {
            name,
            version,
            tarball_url,
        }
    }
}

impl From<PackageIdentity> for (String, String, String) {
    fn from(identity: PackageIdentity) -> Self {
        (identity.name, identity.version, identity.tarball_url)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Result of analysing one package: what it resolved to and what it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub package: ResolvedPackage,
}

impl Analysis {
    pub fn identity(&self) -> PackageIdentity {
        self.package.identity()
    }

    pub fn edges(&self) -> Vec<PackageRequest> {
        self.package.dependency_requests()
    }
}

/// What an install call ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Archive fetched and written; `files` entries landed on storage
    Installed { files: usize },
    /// Already installed earlier in this run
    AlreadyInstalled,
    /// Matched the exclusion list
    Excluded,
}

impl InstallOutcome {
    /// Whether the package is present on storage after this call
    pub fn is_present(&self) -> bool {
        !matches!(self, InstallOutcome::Excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_as_triple() {
        let identity = PackageIdentity::new(
            "lodash",
            "4.17.21",
            "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
        );
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(
            json,
            r#"["lodash","4.17.21","https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz"]"#
        );

        let back: PackageIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn test_identity_to_request_keeps_tarball() {
        let identity = PackageIdentity::new("a", "1.0.0", "http://r/a-1.0.0.tgz");
        let request = identity.to_request();
        assert_eq!(request.range, "1.0.0");
        assert_eq!(request.tarball_url.as_deref(), Some("http://r/a-1.0.0.tgz"));

        let bare = PackageIdentity::new("a", "1.0.0", "").to_request();
        assert_eq!(bare.tarball_url, None);
    }

    #[test]
    fn test_dependency_requests_preserve_order() {
        let package = ResolvedPackage {
            name: "app".to_string(),
            version: "1.0.0".to_string(),
            tarball_url: String::new(),
            dependencies: vec![
                ("zeta".to_string(), "^1.0.0".to_string()),
                ("alpha".to_string(), "~2.1.0".to_string()),
            ],
        };
        let names: Vec<_> = package
            .dependency_requests()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
