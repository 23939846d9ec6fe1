//! Terminal output formatting and utilities.
//!
//! This module provides consistent output formatting across all commands,
//! including colors, progress events and error messages.

pub mod colors;
pub mod errors;

use pouch_core::events::{LogEvent, LogLevel};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::LogFormat;

/// Output handler for consistent terminal formatting
#[derive(Debug, Clone)]
pub struct OutputHandler {
    colors: colors::ColorSupport,
    format: LogFormat,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new(format: LogFormat) -> Self {
        let colors = match format {
            LogFormat::Text => colors::ColorSupport::detect(),
            LogFormat::Json => colors::ColorSupport::disabled(),
        };
        Self { colors, format }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("✗"), message);
    }

    /// Print a step message
    pub fn step(&self, marker: &str, message: &str) {
        println!("{} {}", marker, message);
    }

    /// Render one progress event; JSON mode prints it as one line of JSON
    pub fn event(&self, event: &LogEvent) {
        if self.format == LogFormat::Json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize log event: {}", e),
            }
            return;
        }

        match event.level {
            LogLevel::Info => self.info(&event.message),
            LogLevel::Warn => self.warn(&event.message),
            LogLevel::Error => self.error(&event.message),
        }
    }

    /// Print events until every sender is dropped
    pub fn forward_events(&self, mut receiver: UnboundedReceiver<LogEvent>) -> JoinHandle<()> {
        let output = self.clone();
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                output.event(&event);
            }
        })
    }
}
