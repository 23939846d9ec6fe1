//! pouch.toml parsing
//!
//! The only table Pouch reads is `[install]`. Every key is optional; a key
//! that is absent leaves the lower-precedence value in place.

use serde::{Deserialize, Serialize};
use url::Url;

use pouch_cache::Storage;
use pouch_core::error::PouchError;
use pouch_core::utils::safe_join;

use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "pouch.toml";

/// Complete pouch.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PouchToml {
    /// Install settings
    #[serde(default)]
    pub install: InstallSection,
}

/// A partial install configuration
///
/// Used for the `[install]` table as well as for environment and command
/// line overrides, which are layered on top of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    /// Registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<Url>,

    /// Workers per phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,

    /// Name fragments that exclude a package from installation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_packages: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_capacity: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Bearer token sent to the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl InstallSection {
    /// Overlay `other` on `self`; keys set in `other` win
    pub fn merge(mut self, other: InstallSection) -> Self {
        self.registry = other.registry.or(self.registry);
        self.max_workers = other.max_workers.or(self.max_workers);
        self.continue_on_error = other.continue_on_error.or(self.continue_on_error);
        self.skip_packages = other.skip_packages.or(self.skip_packages);
        self.membership_capacity = other.membership_capacity.or(self.membership_capacity);
        self.request_timeout_secs = other.request_timeout_secs.or(self.request_timeout_secs);
        self.max_retries = other.max_retries.or(self.max_retries);
        self.auth_token = other.auth_token.or(self.auth_token);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == InstallSection::default()
    }
}

/// Parse pouch.toml content, reporting the position of the first error
pub fn parse_pouch_toml(content: &str) -> ConfigResult<PouchToml> {
    toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_column(content, span.start))
            .unwrap_or((1, 1));
        PouchError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })
}

/// Serialize configuration back to TOML
pub fn serialize_pouch_toml(config: &PouchToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| PouchError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Read `<root>/pouch.toml`; `None` when the project has none
pub async fn load_from_storage(storage: &dyn Storage, root: &str) -> ConfigResult<Option<PouchToml>> {
    let path = safe_join(root, CONFIG_FILE)?;
    if !storage.exists(&path).await? {
        return Ok(None);
    }

    let content = storage.read_to_string(&path).await?;
    let config = parse_pouch_toml(&content)?;
    tracing::debug!("Loaded {}", path);
    Ok(Some(config))
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
