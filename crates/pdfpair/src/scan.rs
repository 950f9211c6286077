//! Recursive discovery of PDF files under one root directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{PdfPairError, Result, RootRole};
use crate::key::{self, FileKey};

/// One PDF found during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Filename without its extension, original case.
    pub stem: String,
    /// Grouping key derived from the filename.
    pub key: FileKey,
}

impl FileRecord {
    /// Build a record for `path`, deriving its key from the filename.
    pub fn from_path(path: PathBuf) -> Self {
        let file_name = file_name_of(&path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        let key = key::extract(&file_name);

        Self { path, stem, key }
    }

    /// The bare filename, original case.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All PDFs found under one root, in sorted walk order.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Which root was scanned.
    pub role: RootRole,
    /// Root that was walked; `None` for a tolerated missing root.
    pub root: Option<PathBuf>,
    /// Records in the order they were found.
    pub records: Vec<FileRecord>,
}

impl ScanResult {
    /// A scan of an optional root that does not exist.
    pub fn empty(role: RootRole) -> Self {
        Self {
            role,
            root: None,
            records: Vec::new(),
        }
    }

    /// Number of PDFs found.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no PDFs were found.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Walks a directory tree collecting PDF files.
#[derive(Debug, Clone, Default)]
pub struct TreeScanner {
    /// Directories never descended into (e.g. the output folder).
    excluded: Vec<PathBuf>,
}

impl TreeScanner {
    /// Create a scanner with no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip `dir` and everything beneath it.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = dir
            .canonicalize()
            .or_else(|_| std::path::absolute(&dir))
            .unwrap_or(dir);
        self.excluded.push(dir);
        self
    }

    /// Recursively collect every `.pdf` (any case) under `root`.
    ///
    /// `on_found` is called once per record as it is discovered.
    ///
    /// # Errors
    ///
    /// Returns [`PdfPairError::DirectoryNotFound`] if `root` is missing or not
    /// a directory. Unreadable entries below the root are logged and skipped.
    pub fn scan<F>(&self, root: &Path, role: RootRole, mut on_found: F) -> Result<ScanResult>
    where
        F: FnMut(&FileRecord),
    {
        if !root.is_dir() {
            return Err(PdfPairError::directory_not_found(role, root.to_path_buf()));
        }
        let root = std::path::absolute(root)?;

        let mut records = Vec::new();
        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && self.is_excluded(entry.path())));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_pdf(entry.path()) {
                continue;
            }

            let record = FileRecord::from_path(entry.into_path());
            debug!(
                role = %role,
                prefix = %record.key.prefix,
                sequence = ?record.key.sequence,
                "found {}",
                record.path.display()
            );
            on_found(&record);
            records.push(record);
        }

        Ok(ScanResult {
            role,
            root: Some(root),
            records,
        })
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        self.excluded.iter().any(|excluded| dir == *excluded)
    }
}

/// Whether the path's extension is `pdf`, compared case-insensitively.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
