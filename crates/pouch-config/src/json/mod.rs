//! package.json manifest parsing

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use pouch_cache::Storage;
use pouch_core::error::PouchError;
use pouch_core::types::PackageRequest;
use pouch_core::utils::safe_join;

use crate::ConfigResult;

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// The parts of package.json an install reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Runtime dependencies, in manifest order
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    /// Development dependencies; listed but never installed
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,
}

impl PackageJson {
    /// Direct dependencies as seed requests for analysis
    pub fn dependency_requests(&self) -> Vec<PackageRequest> {
        self.dependencies
            .iter()
            .map(|(name, range)| PackageRequest::new(name, range))
            .collect()
    }
}

/// Parse package.json content
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| PouchError::JsonParse {
        message: format!("package.json: {}", e),
    })
}

/// Serialize a manifest as pretty-printed JSON
pub fn serialize_package_json(manifest: &PackageJson) -> ConfigResult<String> {
    serde_json::to_string_pretty(manifest).map_err(|e| PouchError::JsonParse {
        message: e.to_string(),
    })
}

/// Read `<root>/package.json`
pub async fn load_from_storage(storage: &dyn Storage, root: &str) -> ConfigResult<PackageJson> {
    let path = safe_join(root, MANIFEST_FILE)?;
    if !storage.exists(&path).await? {
        return Err(PouchError::ConfigValidation {
            field: MANIFEST_FILE.to_string(),
            reason: format!("no {} found at '{}'", MANIFEST_FILE, path),
        });
    }

    let content = storage.read_to_string(&path).await?;
    let manifest = parse_package_json(&content)?;
    tracing::debug!(
        "Loaded {} with {} dependencies",
        path,
        manifest.dependencies.len()
    );
    Ok(manifest)
}
