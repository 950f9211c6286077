//! One-way notifications from a run to whatever presents it.
//!
//! The worker never waits on the consumer: events go into an unbounded
//! channel and a dropped receiver is ignored. Delivery is in order from the
//! single producer.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// How a log line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Phase banner.
    Heading,
    /// Informational message.
    Info,
    /// Something completed successfully.
    Success,
    /// A file or group was skipped.
    Warning,
    /// A failure.
    Error,
}

/// A notification emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// Overall completion, 0 through 100.
    Progress {
        /// Percentage of groups processed.
        percent: u8,
    },
    /// Short description of what the worker is doing now.
    Status {
        /// Status text.
        text: String,
    },
    /// A log line.
    Log {
        /// Message text.
        text: String,
        /// Presentation hint.
        severity: Severity,
    },
    /// Terminal outcome; always the last event of a run.
    Finished {
        /// Whether the run completed its work.
        success: bool,
        /// Summary message.
        message: String,
        /// Output folder, when one was used.
        output_dir: Option<PathBuf>,
    },
}

/// Producer side of the event channel.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    tx: Option<UnboundedSender<RunEvent>>,
}

impl EventEmitter {
    /// An emitter paired with the receiver the presentation layer reads.
    pub fn channel() -> (Self, UnboundedReceiver<RunEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// An emitter that drops everything.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    /// Send an event without waiting.
    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Emit a progress update.
    pub fn progress(&self, percent: u8) {
        self.emit(RunEvent::Progress {
            percent: percent.min(100),
        });
    }

    /// Emit a status line.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(RunEvent::Status { text: text.into() });
    }

    /// Emit a log line.
    pub fn log(&self, severity: Severity, text: impl Into<String>) {
        self.emit(RunEvent::Log {
            text: text.into(),
            severity,
        });
    }

    /// Emit a phase banner.
    pub fn heading(&self, text: impl Into<String>) {
        self.log(Severity::Heading, text);
    }

    /// Emit an informational line.
    pub fn info(&self, text: impl Into<String>) {
        self.log(Severity::Info, text);
    }

    /// Emit a success line.
    pub fn success(&self, text: impl Into<String>) {
        self.log(Severity::Success, text);
    }

    /// Emit a warning line.
    pub fn warning(&self, text: impl Into<String>) {
        self.log(Severity::Warning, text);
    }

    /// Emit an error line.
    pub fn error(&self, text: impl Into<String>) {
        self.log(Severity::Error, text);
    }

    /// Emit the terminal event.
    pub fn finished(&self, success: bool, message: impl Into<String>, output_dir: Option<PathBuf>) {
        self.emit(RunEvent::Finished {
            success,
            message: message.into(),
            output_dir,
        });
    }
}
