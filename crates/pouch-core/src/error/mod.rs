//! Error types and result aliases for Pouch operations.
//!
//! Provides a unified error type that covers every failure an install run can
//! hit, from registry lookups down to storage writes, with actionable messages.

use crate::types::VersionError;
use thiserror::Error;

/// Unified error type for all Pouch operations
#[derive(Error, Debug)]
pub enum PouchError {
    // Registry errors
    #[error("Registry request for '{package}' failed{}: {message}", status_suffix(.status))]
    RegistryUnavailable {
        package: String,
        status: Option<u16>,
        message: String,
    },

    #[error("No published version of '{package}' satisfies '{range}'")]
    UnsatisfiableRange { package: String, range: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Archive errors
    #[error("Failed to fetch archive {url}: {message}")]
    FetchError {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to extract archive: {message}")]
    ExtractError {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Storage errors
    #[error("Storage operation failed on {path}: {message}")]
    StorageError {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Membership set is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    // Version errors
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    // Config errors
    #[error("Failed to parse pouch.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse JSON: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Scheduler errors
    #[error("Worker {slot} is unavailable: {reason}")]
    WorkerUnavailable { slot: usize, reason: String },

    #[error("{phase} task panicked: {message}")]
    TaskPanicked { phase: String, message: String },

    #[error("{phase} phase aborted after {failures} failed task(s)")]
    PhaseAborted {
        phase: String,
        failures: usize,
        #[source]
        source: Box<PouchError>,
    },

    /// Wraps an error with the package that was being processed
    #[error("{package}@{version}: {source}")]
    Package {
        package: String,
        version: String,
        #[source]
        source: Box<PouchError>,
    },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

/// Result type alias for Pouch operations
pub type PouchResult<T> = Result<T, PouchError>;

impl PouchError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a storage error for `path`
    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageError {
            path: path.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an extraction error without an underlying IO cause
    pub fn extract(message: impl Into<String>) -> Self {
        Self::ExtractError {
            message: message.into(),
            source: None,
        }
    }

    /// Attach `name@version` context, unless it is already attached
    pub fn with_package(self, package: &str, version: &str) -> Self {
        match self {
            already @ PouchError::Package { .. } => already,
            other => PouchError::Package {
                package: package.to_string(),
                version: version.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Strip package context and return the underlying error
    pub fn root_cause(&self) -> &PouchError {
        match self {
            PouchError::Package { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this error is transient and worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self.root_cause() {
            PouchError::Network { .. } | PouchError::Io { .. } => true,
            PouchError::RegistryUnavailable { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.root_cause() {
            PouchError::RegistryUnavailable {
                status: Some(404), ..
            } => Some("Check the package name spelling or the configured registry URL"),
            PouchError::RegistryUnavailable { .. } | PouchError::Network { .. } => {
                Some("Check your internet connection and the registry URL, then try again")
            },
            PouchError::UnsatisfiableRange { .. } => {
                Some("Relax the version range in package.json or check the published versions")
            },
            PouchError::CapacityExceeded { .. } => {
                Some("Raise `membership_capacity` in pouch.toml for large dependency graphs")
            },
            PouchError::PhaseAborted { .. } => {
                Some("Set `continue_on_error = true` to finish the run despite failed packages")
            },
            PouchError::StorageError { .. } => {
                Some("Check that the project directory is writable, or run 'pouch clean'")
            },
            _ => None,
        }
    }
}

impl From<VersionError> for PouchError {
    fn from(err: VersionError) -> Self {
        let input = match &err {
            VersionError::InvalidFormat { input } => input.clone(),
            VersionError::InvalidNumber { component } => component.clone(),
            VersionError::InvalidPrerelease { prerelease } => prerelease.clone(),
            VersionError::InvalidBuild { build } => build.clone(),
            VersionError::InvalidRange { input, .. } => input.clone(),
        };
        PouchError::InvalidVersion {
            input,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_context_is_applied_once() {
        let err = PouchError::UnsatisfiableRange {
            package: "lodash".to_string(),
            range: "^9.0.0".to_string(),
        }
        .with_package("lodash", "^9.0.0")
        .with_package("outer", "1.0.0");

        let message = err.to_string();
        assert!(message.starts_with("lodash@^9.0.0: "));
        assert!(!message.contains("outer"));
        assert!(matches!(
            err.root_cause(),
            PouchError::UnsatisfiableRange { .. }
        ));
    }

    #[test]
    fn test_registry_status_in_message() {
        let err = PouchError::RegistryUnavailable {
            package: "left-pad".to_string(),
            status: Some(503),
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Registry request for 'left-pad' failed with status 503: Service Unavailable"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        let not_found = PouchError::RegistryUnavailable {
            package: "x".to_string(),
            status: Some(404),
            message: "Not Found".to_string(),
        };
        let throttled = PouchError::RegistryUnavailable {
            package: "x".to_string(),
            status: Some(429),
            message: "Too Many Requests".to_string(),
        };
        assert!(!not_found.is_recoverable());
        assert!(throttled.is_recoverable());
        assert!(!PouchError::CapacityExceeded { capacity: 4 }.is_recoverable());
        assert!(not_found.suggestion().is_some());
    }
}
