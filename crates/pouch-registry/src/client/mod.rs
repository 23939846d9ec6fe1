//! HTTP client implementation with connection pooling and retry logic

use std::time::Duration;

use pouch_core::error::PouchError;
use reqwest::{Client, ClientBuilder, StatusCode};
use url::Url;

use crate::api::{PackageMetadataResponse, VersionMetadata};
use crate::{RegistryResult, DEFAULT_REGISTRY};

/// Abbreviated package document, enough for version selection
const INSTALL_ACCEPT: &str = "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8";

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
}

/// Everything needed to build a [`RegistryClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub registry: Url,
    pub auth: AuthConfig,
    pub retry: RetryConfig,
    pub timeout: Duration,
}

impl ClientOptions {
    /// Default retry, auth and timeout settings against `registry`
    pub fn new(registry: Url) -> Self {
        Self {
            registry,
            auth: AuthConfig::default(),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Main HTTP client for npm registry operations
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Registry URL without a trailing slash
    base_url: String,
}

impl RegistryClient {
    /// Client for the public registry with default settings
    pub fn new() -> RegistryResult<Self> {
        let registry = Url::parse(DEFAULT_REGISTRY).map_err(|e| PouchError::ConfigValidation {
            field: "registry".to_string(),
            reason: e.to_string(),
        })?;
        Self::with_options(ClientOptions::new(registry))
    }

    pub fn with_options(options: ClientOptions) -> RegistryResult<Self> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout)
            .gzip(true)
            .user_agent(concat!("pouch/", env!("CARGO_PKG_VERSION")));

        if let Some(token) = options.auth.token {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token).parse().map_err(|e| {
                    PouchError::network(format!("Invalid auth token: {}", e), e)
                })?,
            );
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| PouchError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config: options.retry,
            base_url: options.registry.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a request with exponential backoff, retrying only transient
    /// failures
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if attempt == self.retry_config.max_retries || !error.is_recoverable() {
                        return Err(error);
                    }
                    attempt += 1;
                    tracing::debug!(
                        "Retrying registry request (attempt {}/{}): {}",
                        attempt,
                        self.retry_config.max_retries,
                        error
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }
    }

    /// Fetch the full package document (`GET {registry}/{name}`)
    pub async fn fetch_packument(&self, package_name: &str) -> RegistryResult<PackageMetadataResponse> {
        let url = format!("{}/{}", self.base_url, encode_package_name(package_name));
        tracing::debug!("Fetching package document {}", url);
        self.with_retry(|| self.get_json(&url, package_name, INSTALL_ACCEPT))
            .await
    }

    /// Fetch one version document by exact version or dist-tag
    /// (`GET {registry}/{name}/{version}`)
    pub async fn fetch_version(
        &self,
        package_name: &str,
        version_or_tag: &str,
    ) -> RegistryResult<VersionMetadata> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            encode_package_name(package_name),
            version_or_tag
        );
        tracing::debug!("Fetching version document {}", url);
        self.with_retry(|| self.get_json(&url, package_name, "application/json"))
            .await
    }

    async fn get_json<T>(&self, url: &str, package_name: &str, accept: &str) -> RegistryResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| PouchError::RegistryUnavailable {
                package: package_name.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PouchError::RegistryUnavailable {
                package: package_name.to_string(),
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PouchError::RegistryUnavailable {
                package: package_name.to_string(),
                status: Some(status.as_u16()),
                message: format!("Failed to read response body: {}", e),
            })?;

        serde_json::from_slice(&body).map_err(|e| PouchError::JsonParse {
            message: format!("registry document for '{}': {}", package_name, e),
        })
    }

    /// Download a tarball body
    ///
    /// Connection failures, throttling and server errors are retried; any
    /// other non-success status fails immediately.
    pub async fn download_tarball(&self, url: &str) -> RegistryResult<Vec<u8>> {
        self.with_retry(|| self.download_once(url))
            .await
            .map_err(|error| match error {
                PouchError::Network { message, source } => PouchError::FetchError {
                    url: url.to_string(),
                    message,
                    source,
                },
                other => other,
            })
    }

    async fn download_once(&self, url: &str) -> RegistryResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PouchError::network(format!("Failed to download tarball: {}", e), e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(PouchError::Network {
                message: format!("Failed to download tarball: {}", status),
                source: None,
            });
        }
        if !status.is_success() {
            return Err(PouchError::FetchError {
                url: url.to_string(),
                message: format!("server responded with {}", status),
                source: None,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PouchError::network(format!("Failed to read tarball: {}", e), e))?;
        Ok(bytes.to_vec())
    }
}

/// Encode a package name for a registry URL path (`@scope/pkg -> @scope%2fpkg`)
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}
