//! # pouch-cli
//!
//! Command line front end of the Pouch package installer.
//!
//! Parses the command line, sets up logging and panic reporting, and
//! dispatches to the command handlers.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use pouch_config::InstallSection;
use pouch_core::error::PouchError;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Parallel npm package installer
#[derive(Parser, Debug)]
#[command(name = "pouch", version, about = "Parallel npm package installer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root containing package.json
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Format of log output
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve and install dependencies into node_modules
    Install(InstallArgs),
    /// Resolve the dependency graph without installing
    Analyze(InstallArgs),
    /// Delete the run caches so the next install starts fresh
    Clean,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Extra packages, e.g. `react@^18.2.0`; package.json dependencies are always included
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Registry base URL
    #[arg(long)]
    pub registry: Option<Url>,

    /// Workers per phase
    #[arg(short = 'j', long)]
    pub max_workers: Option<usize>,

    /// Keep going when a package fails
    #[arg(long, conflicts_with = "fail_fast")]
    pub continue_on_error: bool,

    /// Stop dispatching at the first failed package
    #[arg(long)]
    pub fail_fast: bool,

    /// Name fragments of packages to skip (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Bearer token for the registry
    #[arg(long)]
    pub token: Option<String>,
}

impl InstallArgs {
    /// Command line layer of the install configuration
    pub fn overrides(&self) -> InstallSection {
        let continue_on_error = if self.fail_fast {
            Some(false)
        } else if self.continue_on_error {
            Some(true)
        } else {
            None
        };

        InstallSection {
            registry: self.registry.clone(),
            max_workers: self.max_workers,
            continue_on_error,
            skip_packages: (!self.skip.is_empty()).then(|| self.skip.clone()),
            auth_token: self.token.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_format);
    setup_panic_handler();

    info!("Starting Pouch CLI v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| PouchError::Io {
        message: "Failed to create async runtime".to_string(),
        source: e,
    })?;

    rt.block_on(async {
        let ctx = CommandContext::new(&cli.root, cli.log_format)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn report_error(err: &anyhow::Error) {
    let formatter = ErrorFormatter::new();
    match err.downcast_ref::<PouchError>() {
        Some(pouch_error) => eprintln!("{}", formatter.format_error(pouch_error)),
        None => eprintln!("{}", formatter.format_simple(&format!("{:#}", err))),
    }
}

/// Progress events reach the terminal through the output handler, so their
/// `tracing` mirror is filtered out unless `RUST_LOG` says otherwise.
fn setup_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pouch={},pouch_core::events=off", level)));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Pouch encountered an unexpected error: {}", panic_info);
        eprintln!("Pouch crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/pouch-pm/pouch/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
