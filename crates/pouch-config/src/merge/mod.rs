//! Configuration layering and environment overrides
//!
//! Precedence, lowest to highest: built-in defaults, the `[install]` table of
//! `<root>/pouch.toml`, `POUCH_*` environment variables, command line flags.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use pouch_cache::Storage;
use pouch_core::error::PouchError;
use pouch_core::types::DEFAULT_SKIP_PACKAGES;

use crate::json::PackageJson;
use crate::toml::InstallSection;
use crate::ConfigResult;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_MEMBERSHIP_CAPACITY: usize = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "POUCH_";

/// Fully resolved install settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub registry: Url,
    /// `None` uses the host's available parallelism
    pub max_workers: Option<usize>,
    pub continue_on_error: bool,
    pub skip_packages: Vec<String>,
    pub membership_capacity: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub auth_token: Option<String>,
}

impl InstallConfig {
    /// Built-in defaults with `layer` applied on top
    pub fn from_layer(layer: InstallSection) -> ConfigResult<Self> {
        let registry = match layer.registry {
            Some(url) => url,
            None => Url::parse(DEFAULT_REGISTRY_URL).map_err(|e| PouchError::ConfigValidation {
                field: "registry".to_string(),
                reason: e.to_string(),
            })?,
        };

        let config = Self {
            registry,
            max_workers: layer.max_workers,
            continue_on_error: layer.continue_on_error.unwrap_or(true),
            skip_packages: layer
                .skip_packages
                .unwrap_or_else(|| DEFAULT_SKIP_PACKAGES.iter().map(|s| s.to_string()).collect()),
            membership_capacity: layer
                .membership_capacity
                .unwrap_or(DEFAULT_MEMBERSHIP_CAPACITY),
            request_timeout_secs: layer.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_retries: layer.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            auth_token: layer.auth_token.filter(|token| !token.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Workers per phase
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !matches!(self.registry.scheme(), "http" | "https") {
            return Err(invalid(
                "registry",
                format!("unsupported scheme '{}'", self.registry.scheme()),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(invalid("max_workers", "must be at least 1"));
        }
        if self.membership_capacity < 2 {
            return Err(invalid("membership_capacity", "must be at least 2"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> PouchError {
    PouchError::ConfigValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Collects the partial layers and folds them into an [`InstallConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConfigLayering {
    file: InstallSection,
    env: InstallSection,
    cli: InstallSection,
}

impl ConfigLayering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: InstallSection) -> Self {
        self.file = file;
        self
    }

    pub fn with_env(mut self, env: InstallSection) -> Self {
        self.env = env;
        self
    }

    pub fn with_cli(mut self, cli: InstallSection) -> Self {
        self.cli = cli;
        self
    }

    pub fn resolve(self) -> ConfigResult<InstallConfig> {
        InstallConfig::from_layer(self.file.merge(self.env).merge(self.cli))
    }

    /// Parse `POUCH_*` variables into an override layer
    ///
    /// Empty values count as unset; unknown `POUCH_*` names are ignored.
    pub fn env_overrides<I>(vars: I) -> ConfigResult<InstallSection>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = InstallSection::default();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match name {
                "REGISTRY" => {
                    layer.registry = Some(Url::parse(value).map_err(|e| invalid(&key, e.to_string()))?);
                },
                "MAX_WORKERS" => layer.max_workers = Some(parse_env(&key, value)?),
                "CONTINUE_ON_ERROR" => layer.continue_on_error = Some(parse_bool(&key, value)?),
                "SKIP_PACKAGES" => {
                    layer.skip_packages = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect(),
                    );
                },
                "MEMBERSHIP_CAPACITY" => layer.membership_capacity = Some(parse_env(&key, value)?),
                "REQUEST_TIMEOUT_SECS" => layer.request_timeout_secs = Some(parse_env(&key, value)?),
                "MAX_RETRIES" => layer.max_retries = Some(parse_env(&key, value)?),
                "AUTH_TOKEN" => layer.auth_token = Some(value.to_string()),
                _ => tracing::debug!("Ignoring unknown environment override {}", key),
            }
        }

        Ok(layer)
    }

    /// Read overrides from the process environment
    pub fn collect_env_overrides() -> ConfigResult<InstallSection> {
        Self::env_overrides(std::env::vars())
    }
}

fn parse_env<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, format!("'{}': {}", value, e)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("'{}' is not a boolean", value))),
    }
}

/// Loads the manifest and configuration of one project root
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    storage: Arc<dyn Storage>,
    root: String,
}

impl ConfigLoader {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub async fn load_manifest(&self) -> ConfigResult<PackageJson> {
        crate::json::load_from_storage(self.storage.as_ref(), &self.root).await
    }

    /// The `[install]` table of pouch.toml, empty when there is no file
    pub async fn load_file_layer(&self) -> ConfigResult<InstallSection> {
        Ok(crate::toml::load_from_storage(self.storage.as_ref(), &self.root)
            .await?
            .map(|config| config.install)
            .unwrap_or_default())
    }

    /// Resolve the full configuration from every layer
    pub async fn load(&self, env: InstallSection, cli: InstallSection) -> ConfigResult<InstallConfig> {
        let file = self.load_file_layer().await?;
        ConfigLayering::new()
            .with_file(file)
            .with_env(env)
            .with_cli(cli)
            .resolve()
    }
}

#[cfg(test)]
mod tests;
