//! PDF merge backends.
//!
//! The orchestrator only needs three capabilities: open a document, append one
//! document's pages onto another, and persist the result. Two implementations
//! exist and one is chosen from [`BackendKind`](crate::config::BackendKind) at
//! startup:
//!
//! - [`LopdfBackend`] merges in-process with `lopdf`.
//! - [`CommandBackend`] defers to an external tool invoked as
//!   `tool <primary> <member...> cat output <output>` (pdftk syntax).

pub mod command;
pub mod native;

pub use self::command::{CommandBackend, PendingMerge};
pub use self::native::LopdfBackend;

use std::path::Path;

use crate::error::Result;

/// Capability to open, combine, and save PDF documents.
pub trait PdfBackend {
    /// An opened document, or whatever the backend accumulates in its place.
    type Document;

    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Check that the backend can run at all.
    ///
    /// Called once before scanning; failure is run-fatal.
    fn probe(&self) -> Result<()> {
        Ok(())
    }

    /// Open the PDF at `path`.
    ///
    /// Fails with [`FileNotFound`](crate::PdfPairError::FileNotFound) or
    /// [`ParseError`](crate::PdfPairError::ParseError).
    fn open(&self, path: &Path) -> Result<Self::Document>;

    /// Copy every page of `source` onto the end of `target`.
    fn append(&self, target: &mut Self::Document, source: Self::Document) -> Result<()>;

    /// Write `document` to `path`, replacing any existing file.
    fn save(&self, document: Self::Document, path: &Path) -> Result<()>;
}
