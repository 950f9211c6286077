//! Error types for pdfpair.
//!
//! Errors fall into three propagation classes. [`PdfPairError::is_fatal`]
//! separates the first and last from the group-level ones:
//!
//! - **Run-fatal**: missing roots, an output directory that cannot be created
//!   or is locked by another run, an absent merge backend.
//! - **Group-level / file-level**: a PDF that cannot be opened, a save that
//!   fails, a backend invocation that exits non-zero. These are skipped,
//!   counted, and logged; the run continues.
//! - **Configuration**: invalid combinations of options, rejected up front.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for pdfpair operations.
pub type Result<T> = std::result::Result<T, PdfPairError>;

/// Which of the two input trees a path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RootRole {
    /// The mandatory tree whose files become group representatives.
    Primary,
    /// The tree whose files are appended after the representative.
    Secondary,
}

impl fmt::Display for RootRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Main error type for pdfpair operations.
#[derive(Debug)]
pub enum PdfPairError {
    /// An input root is missing or is not a directory.
    DirectoryNotFound {
        /// Which root failed validation.
        role: RootRole,
        /// The offending path.
        path: PathBuf,
    },

    /// The output directory could not be created.
    OutputCreationFailed {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Another run currently holds the output directory.
    OutputLocked {
        /// Path of the lock file that already exists.
        lock_path: PathBuf,
    },

    /// A PDF file does not exist.
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A PDF could not be opened or parsed.
    ParseError {
        /// Path to the PDF.
        path: PathBuf,
        /// Reason reported by the backend.
        reason: String,
    },

    /// The merged document could not be persisted.
    SaveFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The external merge tool cannot be found or started.
    BackendUnavailable {
        /// Program that was looked up.
        program: PathBuf,
        /// Why it is unavailable.
        reason: String,
    },

    /// A single invocation of the external merge tool failed.
    BackendInvocation {
        /// Program that was run.
        program: PathBuf,
        /// Exit status, if the process ran to completion.
        status: Option<i32>,
        /// Captured standard error text.
        stderr: String,
    },

    /// Anything else that went wrong while processing one group.
    Unexpected {
        /// Description of the failure.
        message: String,
    },

    /// Invalid configuration.
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Generic I/O error.
    Io {
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for PdfPairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound { role, path } => {
                write!(
                    f,
                    "{} folder not found or not a directory: {}",
                    capitalize(&role.to_string()),
                    path.display()
                )
            }
            Self::OutputCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create output folder: {}\n  Reason: {}",
                    path.display(),
                    source
                )
            }
            Self::OutputLocked { lock_path } => {
                write!(
                    f,
                    "Output folder is in use by another run: {}\n  \
                     Hint: if no other run is active, delete the lock file and retry",
                    lock_path.display()
                )
            }
            Self::FileNotFound { path } => {
                write!(f, "File not found: {}", path.display())
            }
            Self::ParseError { path, reason } => {
                write!(
                    f,
                    "Cannot read PDF: {}\n  Reason: {}",
                    path.display(),
                    reason
                )
            }
            Self::SaveFailed { path, source } => {
                write!(
                    f,
                    "Failed to save merged PDF: {}\n  Reason: {}",
                    path.display(),
                    source
                )
            }
            Self::BackendUnavailable { program, reason } => {
                write!(
                    f,
                    "Merge tool is not available: {}\n  Reason: {}",
                    program.display(),
                    reason
                )
            }
            Self::BackendInvocation {
                program,
                status,
                stderr,
            } => {
                let status = status.map_or_else(|| "signal".to_string(), |c| c.to_string());
                write!(
                    f,
                    "Merge tool {} failed (exit status {})",
                    program.display(),
                    status
                )?;
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, "\n  Output: {stderr}")?;
                }
                Ok(())
            }
            Self::Unexpected { message } => {
                write!(f, "Unexpected error: {message}")
            }
            Self::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {message}")
            }
            Self::Io { source } => {
                write!(f, "I/O error: {source}")
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl std::error::Error for PdfPairError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OutputCreationFailed { source, .. } => Some(source),
            Self::SaveFailed { source, .. } => Some(source),
            Self::Io { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for PdfPairError {
    fn from(err: io::Error) -> Self {
        Self::Io { source: err }
    }
}

impl From<anyhow::Error> for PdfPairError {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl PdfPairError {
    /// Create a DirectoryNotFound error.
    pub fn directory_not_found(role: RootRole, path: PathBuf) -> Self {
        Self::DirectoryNotFound { role, path }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a ParseError error.
    pub fn parse_error(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::ParseError {
            path,
            reason: reason.into(),
        }
    }

    /// Create a BackendUnavailable error.
    pub fn backend_unavailable(program: PathBuf, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            program,
            reason: reason.into(),
        }
    }

    /// Create an Unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error must abort the whole run.
    ///
    /// Everything else is absorbed at file or group level: the orchestrator
    /// skips and counts it instead of aborting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound { .. }
                | Self::OutputCreationFailed { .. }
                | Self::OutputLocked { .. }
                | Self::BackendUnavailable { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DirectoryNotFound { .. } => 2,
            Self::FileNotFound { .. } => 2,
            Self::ParseError { .. } => 3,
            Self::OutputCreationFailed { .. } => 5,
            Self::SaveFailed { .. } => 5,
            Self::OutputLocked { .. } => 4,
            Self::BackendUnavailable { .. } => 6,
            Self::BackendInvocation { .. } => 6,
            Self::Unexpected { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::Io { .. } => 5,
        }
    }
}
