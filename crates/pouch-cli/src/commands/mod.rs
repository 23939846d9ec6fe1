//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes a [`CommandContext`].

use camino::Utf8PathBuf;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use pouch_cache::{FsStorage, RunCache, Storage};
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::PackageRequest;

pub mod clean;
pub mod install;


use crate::output::OutputHandler;
use crate::{Commands, LogFormat};

/// Storage path of the project root; `FsStorage` maps it onto `CommandContext::root`
pub const PROJECT_ROOT: &str = "/";

/// Shared context for all commands
pub struct CommandContext {
    pub root: Utf8PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Context for the project at `root`, relative to the current directory
    pub fn new(root: &Path, format: LogFormat) -> PouchResult<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|e| PouchError::Io {
                message: "Failed to get current directory".to_string(),
                source: e,
            })?;
            cwd.join(root)
        };

        let root = Utf8PathBuf::from_path_buf(root).map_err(|path| PouchError::ConfigValidation {
            field: "root".to_string(),
            reason: format!("'{}' is not valid UTF-8", path.display()),
        })?;

        Ok(Self {
            root,
            output: OutputHandler::new(format),
        })
    }

    /// Project storage rooted at the project directory
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::new(FsStorage::new(self.root.clone()))
    }

    pub fn run_cache(&self) -> RunCache {
        RunCache::new(self.storage(), PROJECT_ROOT)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Commands::Install(args) => {
            info!("Installing dependencies in {}", ctx.root);
            install::execute(args, install::Mode::Install, ctx).await
        },
        Commands::Analyze(args) => {
            info!("Analyzing dependencies in {}", ctx.root);
            install::execute(args, install::Mode::Analyze, ctx).await
        },
        Commands::Clean => {
            info!("Cleaning run caches in {}", ctx.root);
            clean::execute(ctx).await
        },
    }
}

/// Parse `name`, `name@range` or `@scope/name@range`
pub fn parse_package_spec(spec: &str) -> PouchResult<PackageRequest> {
    let spec = spec.trim();
    // A leading `@` belongs to the scope, not the range separator
    let split_at = match spec.strip_prefix('@') {
        Some(rest) => rest.find('@').map(|i| i + 1),
        None => spec.find('@'),
    };

    let (name, range) = match split_at {
        Some(i) => (&spec[..i], &spec[i + 1..]),
        None => (spec, ""),
    };

    if name.is_empty() || name == "@" || (name.starts_with('@') && !name.contains('/')) {
        return Err(PouchError::ConfigValidation {
            field: "package".to_string(),
            reason: format!("'{}' is not a valid package name", spec),
        });
    }

    Ok(if range.is_empty() {
        PackageRequest::latest(name)
    } else {
        PackageRequest::new(name, range)
    })
}
