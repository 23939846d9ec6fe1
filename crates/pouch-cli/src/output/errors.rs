//! Error message formatting with actionable suggestions.

use pouch_core::error::PouchError;
use super::colors::ColorSupport;
use std::error::Error;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its location, suggestion and source chain
    pub fn format_error(&self, error: &PouchError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let PouchError::TomlParse { line, column, .. } = error.root_cause() {
            if *line > 0 {
                output.push_str(&self.format_location(pouch_config::CONFIG_FILE, *line, *column));
                output.push('\n');
            }
        }

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("{} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
