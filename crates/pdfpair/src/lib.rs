//! pdfpair - Pair PDF files across two directory trees and merge each pair.
//!
//! Files are matched by a key derived from their file name: a trailing
//! `(n)`, `_n` or ` n` is a sequence number and the rest is the prefix. Every
//! primary file whose prefix also occurs in the secondary tree becomes the
//! first document of a merge group, followed by the matching secondary files
//! in sequence order. Each group is written to one output file named after
//! its primary.
//!
//! Runs are strictly sequential. A run reports what it does through a
//! stream of [`RunEvent`]s and returns a [`RunSummary`].
//!
//! # Examples
//!
//! ## Blocking
//!
//! ```no_run
//! use pdfpair::{Config, LopdfBackend, MergeOrchestrator};
//! use std::path::PathBuf;
//!
//! # fn example() -> pdfpair::Result<()> {
//! let config = Config::new("scans/contracts", Some(PathBuf::from("scans/appendices")));
//! let summary = MergeOrchestrator::new(config, LopdfBackend::new()).run()?;
//! println!("{}", summary.message());
//! # Ok(())
//! # }
//! ```
//!
//! ## On a worker with events
//!
//! ```no_run
//! use pdfpair::{Config, spawn_run};
//! use std::path::PathBuf;
//!
//! # async fn example() -> pdfpair::Result<()> {
//! let config = Config::new("scans/contracts", Some(PathBuf::from("scans/appendices")));
//! let mut handle = spawn_run(config);
//! while let Some(event) = handle.next_event().await {
//!     println!("{event:?}");
//! }
//! let summary = handle.wait().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod io;
pub mod key;
pub mod lock;
pub mod matcher;
pub mod orchestrator;
pub mod output;
pub mod scan;

// Re-export commonly used types
pub use backend::{CommandBackend, LopdfBackend, PdfBackend};
pub use cancel::CancellationToken;
pub use config::{BackendKind, Config, SecondaryMode};
pub use error::{PdfPairError, Result, RootRole};
pub use events::{EventEmitter, RunEvent, Severity};
pub use key::{FileKey, extract};
pub use matcher::{MatchResult, MergeGroup, match_scans};
pub use orchestrator::{MergeOrchestrator, RunCounters, RunOutcome, RunSummary};
pub use scan::{FileRecord, ScanResult, TreeScanner};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Run with the backend named in `config`, on the calling thread.
///
/// # Errors
///
/// Returns run-fatal errors; see [`MergeOrchestrator::run`].
pub fn run_blocking(
    config: Config,
    events: EventEmitter,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    match config.backend.clone() {
        BackendKind::Lopdf => MergeOrchestrator::new(config, LopdfBackend::new())
            .with_events(events)
            .with_cancellation(cancel)
            .run(),
        BackendKind::Command { program } => {
            let backend = CommandBackend::new(program).with_timeout(config.tool_timeout);
            MergeOrchestrator::new(config, backend)
                .with_events(events)
                .with_cancellation(cancel)
                .run()
        }
    }
}

/// A run executing on a blocking worker thread.
#[derive(Debug)]
pub struct RunHandle {
    events: UnboundedReceiver<RunEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<RunSummary>>,
}

impl RunHandle {
    /// Next event, or `None` once the run has ended and every event has been
    /// delivered.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Token that cancels this run between groups.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end. Undelivered events are dropped.
    ///
    /// # Errors
    ///
    /// Returns the run's fatal error, or [`PdfPairError::Unexpected`] if the
    /// worker itself died.
    pub async fn wait(self) -> Result<RunSummary> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(PdfPairError::unexpected(format!("worker failed: {err}"))),
        }
    }
}

/// Start a run on tokio's blocking pool and return immediately.
///
/// Must be called from within a tokio runtime.
pub fn spawn_run(config: Config) -> RunHandle {
    let (emitter, events) = EventEmitter::channel();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    let task = tokio::task::spawn_blocking(move || run_blocking(config, emitter, worker_cancel));

    RunHandle {
        events,
        cancel,
        task,
    }
}
