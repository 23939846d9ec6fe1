//! Progress events for hosts that render the install log.
//!
//! Every event is mirrored to `tracing`, so a sink without a receiver still
//! leaves a trail in the regular logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the install log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
}

/// Cloneable handle that publishes [`LogEvent`]s
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<LogEvent>>,
}

impl EventSink {
    /// Create a sink together with the receiving end
    pub fn channel() -> (Self, UnboundedReceiver<LogEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Sink that only forwards to `tracing`
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into());
    }

    fn emit(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        if let Some(sender) = &self.sender {
            // A dropped receiver just means nobody is watching anymore
            let _ = sender.send(LogEvent {
                timestamp: Utc::now(),
                level,
                message,
            });
        }
    }
}
