//! Loading PDF documents from disk.

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{PdfPairError, Result};

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,
}

/// PDF reader. Documents without pages are rejected.
#[derive(Debug, Clone)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new PDF reader.
    pub fn new() -> Self {
        Self
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File does not exist
    /// - File is not a valid PDF
    /// - PDF is encrypted
    /// - PDF has no pages
    pub fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();

        if !path.is_file() {
            return Err(PdfPairError::file_not_found(path_buf));
        }

        let start = Instant::now();

        let document = Document::load(path).map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("encrypt") || err_msg.contains("password") {
                PdfPairError::parse_error(path_buf.clone(), "document is encrypted")
            } else {
                PdfPairError::parse_error(path_buf.clone(), err_msg)
            }
        })?;

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfPairError::parse_error(path_buf, "document has no pages"));
        }

        Ok(LoadedPdf {
            document,
            path: path_buf,
            page_count,
            load_time: start.elapsed(),
        })
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}
