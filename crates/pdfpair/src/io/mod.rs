//! I/O operations for pdfpair.
//!
//! This module handles loading PDF documents from disk and writing merged
//! documents back atomically.

pub mod reader;
pub mod writer;

pub use reader::{LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteStatistics, format_file_size};
