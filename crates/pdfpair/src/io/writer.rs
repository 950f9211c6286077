//! PDF writing and saving operations.
//!
//! Writes go to a sibling temporary file first and are renamed into place,
//! so a failed save never leaves a truncated output behind. An existing file
//! at the destination is replaced.

use lopdf::Document;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{PdfPairError, Result};

/// Buffer size for writing (in bytes).
const BUFFER_SIZE: usize = 8192;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

/// PDF writer. Streams are compressed before writing.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter;

impl PdfWriter {
    /// Create a new PDF writer.
    pub fn new() -> Self {
        Self
    }

    /// Save a PDF document to a file, returning write statistics.
    ///
    /// # Errors
    ///
    /// Returns [`PdfPairError::SaveFailed`] if the file cannot be created,
    /// serialized, flushed, or renamed into place.
    pub fn save(&self, doc: &mut Document, path: &Path) -> Result<WriteStatistics> {
        let start = Instant::now();

        doc.compress();

        let write_path = temp_path_for(path);
        if let Err(err) = Self::write_to(doc, &write_path) {
            let _ = std::fs::remove_file(&write_path);
            return Err(err);
        }

        std::fs::rename(&write_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&write_path);
            PdfPairError::SaveFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Ok(WriteStatistics {
            write_time: start.elapsed(),
            file_size,
            output_path: path.to_path_buf(),
        })
    }

    fn write_to(doc: &mut Document, write_path: &Path) -> Result<()> {
        let save_failed = |source: std::io::Error| PdfPairError::SaveFailed {
            path: write_path.to_path_buf(),
            source,
        };

        let file = std::fs::File::create(write_path).map_err(save_failed)?;
        let mut writer = std::io::BufWriter::with_capacity(BUFFER_SIZE, file);

        doc.save_to(&mut writer)
            .map_err(|e| save_failed(std::io::Error::other(e)))?;
        writer.flush().map_err(save_failed)?;

        Ok(())
    }
}

/// `out/A.pdf` becomes `out/.A.pdf.tmp`.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
