//! Message formatting and display.
//!
//! Turns log lines into terminal text, honouring quiet and verbose modes.
//!
//! # Examples
//!
//! ```
//! use pdfpair::output::formatter::{MessageLevel, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(false, false).with_color(false);
//! assert_eq!(
//!     formatter.format(MessageLevel::Success, "Saved 'a.pdf'."),
//!     Some("✓ Saved 'a.pdf'.".to_string())
//! );
//! ```

use crate::events::Severity;
use std::io;

/// Level of output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Section banner.
    Heading,
    /// Informational message.
    Info,
    /// Success message.
    Success,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
    /// Debug/verbose message.
    Debug,
}

impl From<Severity> for MessageLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Heading => Self::Heading,
            Severity::Info => Self::Info,
            Severity::Success => Self::Success,
            Severity::Warning => Self::Warning,
            Severity::Error => Self::Error,
        }
    }
}

/// Output formatter with configurable verbosity.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    /// Whether to suppress non-error output.
    quiet: bool,
    /// Whether to show verbose output.
    verbose: bool,
    /// Whether to use colored output.
    colored: bool,
}

impl OutputFormatter {
    /// Create a new output formatter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - Suppress everything but warnings and errors
    /// * `verbose` - Show debug output
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: Self::should_use_color(),
        }
    }

    /// Create a quiet formatter (warnings and errors only).
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self::new(false, true)
    }

    /// Force color on or off.
    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Detect if colored output should be used.
    ///
    /// Returns true if stdout is a TTY and TERM is set.
    fn should_use_color() -> bool {
        use std::io::IsTerminal;
        io::stdout().is_terminal() && std::env::var("TERM").is_ok()
    }

    /// Format a message, or `None` if the current mode hides it.
    pub fn format(&self, level: MessageLevel, message: &str) -> Option<String> {
        let visible = match level {
            MessageLevel::Warning | MessageLevel::Error => true,
            MessageLevel::Debug => self.verbose,
            MessageLevel::Heading | MessageLevel::Info | MessageLevel::Success => !self.quiet,
        };
        if !visible {
            return None;
        }

        let (prefix, color_code) = match level {
            MessageLevel::Heading => ("\n", "\x1b[1m"), // Bold
            MessageLevel::Info => ("", ""),
            MessageLevel::Success => ("✓ ", "\x1b[32m"), // Green
            MessageLevel::Warning => ("⚠ ", "\x1b[33m"), // Yellow
            MessageLevel::Error => ("✗ ", "\x1b[31m"),   // Red
            MessageLevel::Debug => ("→ ", "\x1b[36m"),   // Cyan
        };

        if self.colored && !color_code.is_empty() {
            Some(format!("{prefix}{color_code}{message}\x1b[0m"))
        } else {
            Some(format!("{prefix}{message}"))
        }
    }

    /// Print a log line from a run.
    pub fn log(&self, severity: Severity, message: &str) {
        self.print_message(severity.into(), message);
    }

    /// Print an informational message. Suppressed in quiet mode.
    pub fn info(&self, message: &str) {
        self.print_message(MessageLevel::Info, message);
    }

    /// Print a success message. Suppressed in quiet mode.
    pub fn success(&self, message: &str) {
        self.print_message(MessageLevel::Success, message);
    }

    /// Print a warning message. Always displayed.
    pub fn warning(&self, message: &str) {
        self.print_message(MessageLevel::Warning, message);
    }

    /// Print an error message. Always displayed.
    pub fn error(&self, message: &str) {
        self.print_message(MessageLevel::Error, message);
    }

    /// Print a debug message. Only displayed in verbose mode.
    pub fn debug(&self, message: &str) {
        self.print_message(MessageLevel::Debug, message);
    }

    /// Print a section header. Suppressed in quiet mode.
    pub fn section(&self, title: &str) {
        self.print_message(MessageLevel::Heading, title);
    }

    /// Print a labelled value. Only shown in verbose mode.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    fn print_message(&self, level: MessageLevel, message: &str) {
        if let Some(line) = self.format(level, message) {
            println!("{line}");
        }
    }

    /// Check if output should be shown.
    pub fn should_print(&self) -> bool {
        !self.quiet
    }

    /// Check if verbose output should be shown.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
