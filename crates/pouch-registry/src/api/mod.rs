//! npm registry API response types
//!
//! Only the fields the resolver reads are modelled; everything else in the
//! registry documents is ignored during deserialization.

use std::collections::HashMap;

use indexmap::IndexMap;
use pouch_core::types::ResolvedPackage;
use serde::{Deserialize, Serialize};

/// Full package document (`GET {registry}/{name}`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageMetadataResponse {
    /// Package name
    pub name: String,
    /// Tag name to version, e.g. `latest -> 4.17.21`
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// Every published version, keyed by version string
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

impl PackageMetadataResponse {
    pub fn version(&self, version: &str) -> Option<&VersionMetadata> {
        self.versions.get(version)
    }

    /// Version strings in no particular order
    pub fn version_keys(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }
}

/// Metadata for a specific package version
/// (`GET {registry}/{name}/{version}` or one entry of `versions`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionMetadata {
    /// Package name; absent in some mirrors' abbreviated documents
    #[serde(default)]
    pub name: Option<String>,
    /// Version string
    pub version: String,
    /// Runtime dependencies in declaration order
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    /// Distribution information
    pub dist: DistInfo,
}

impl VersionMetadata {
    /// Pin this document to a [`ResolvedPackage`] for `name`
    pub fn into_resolved(self, name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: self.name.unwrap_or_else(|| name.to_string()),
            version: self.version,
            tarball_url: self.dist.tarball,
            dependencies: self.dependencies.into_iter().collect(),
        }
    }
}

/// Distribution information for package tarball
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// SHA-1 checksum (legacy)
    #[serde(default)]
    pub shasum: Option<String>,
    /// Subresource integrity hash
    #[serde(default)]
    pub integrity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_document_keeps_dependency_order() {
        let doc: VersionMetadata = serde_json::from_str(
            r#"{
                "name": "express",
                "version": "4.18.2",
                "description": "ignored",
                "dependencies": { "body-parser": "1.20.1", "accepts": "~1.3.8", "cookie": "0.5.0" },
                "dist": { "tarball": "https://r/express/-/express-4.18.2.tgz", "shasum": "abc" }
            }"#,
        )
        .unwrap();

        let resolved = doc.into_resolved("express");
        assert_eq!(resolved.version, "4.18.2");
        assert_eq!(resolved.tarball_url, "https://r/express/-/express-4.18.2.tgz");
        let names: Vec<&str> = resolved.dependencies.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["body-parser", "accepts", "cookie"]);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let doc: PackageMetadataResponse = serde_json::from_value(serde_json::json!({
            "name": "tiny",
            "versions": {
                "1.0.0": { "version": "1.0.0", "dist": { "tarball": "t" } }
            }
        }))
        .unwrap();

        assert!(doc.dist_tags.is_empty());
        let v = doc.version("1.0.0").unwrap();
        assert!(v.dependencies.is_empty());
        assert!(v.dist.shasum.is_none());
        assert_eq!(v.clone().into_resolved("tiny").name, "tiny");
    }
}
