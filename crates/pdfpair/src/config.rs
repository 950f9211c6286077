//! Configuration module for pdfpair.
//!
//! A [`Config`] describes one run: the two input roots, whether the
//! secondary root is required, where the output folder goes, and which merge
//! backend to use. Front ends build it from their own arguments and call
//! [`Config::validate`] before starting a run.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::PdfPairError;

/// Default name of the folder that receives merged documents.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "Merged PDFs";

/// Default limit on a single invocation of an external merge tool.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Whether the run may proceed without a secondary root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryMode {
    /// A missing secondary root is run-fatal.
    #[default]
    Required,
    /// A missing secondary root is a warning; it scans as empty.
    Optional,
}

impl FromStr for SecondaryMode {
    type Err = PdfPairError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "optional" => Ok(Self::Optional),
            _ => Err(PdfPairError::invalid_config(format!(
                "Invalid secondary mode: {s}. Must be one of: required, optional"
            ))),
        }
    }
}

/// Which merge engine performs open/append/save.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process merging with lopdf.
    #[default]
    Lopdf,
    /// An external pdftk-compatible executable.
    Command {
        /// Executable path or name on `PATH`.
        program: PathBuf,
    },
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root whose files become group representatives.
    pub primary_root: PathBuf,

    /// Root whose files are appended to matching representatives.
    pub secondary_root: Option<PathBuf>,

    /// Whether the secondary root must exist.
    pub secondary_mode: SecondaryMode,

    /// Folder in which the output folder is created.
    ///
    /// `None` selects the default for the backend, see
    /// [`Config::output_dir`].
    pub output_parent: Option<PathBuf>,

    /// Name of the output folder.
    pub output_dir_name: String,

    /// Merge engine.
    pub backend: BackendKind,

    /// How long an external merge tool may run for one group before it is
    /// killed and the group abandoned.
    pub tool_timeout: Duration,

    /// Stop after matching without writing anything.
    pub dry_run: bool,
}

impl Config {
    /// A configuration with defaults for everything but the roots.
    pub fn new(primary_root: impl Into<PathBuf>, secondary_root: Option<PathBuf>) -> Self {
        Self {
            primary_root: primary_root.into(),
            secondary_root,
            secondary_mode: SecondaryMode::default(),
            output_parent: None,
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            backend: BackendKind::default(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            dry_run: false,
        }
    }

    /// Validate the configuration.
    ///
    /// Checks for logical inconsistencies only; whether the roots exist is
    /// decided when the run starts.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The secondary root is required but not given
    /// - The output folder name is empty or contains a path separator
    /// - The command backend has an empty program
    /// - The tool timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.primary_root.as_os_str().is_empty() {
            bail!("No primary folder specified");
        }

        if self.secondary_mode == SecondaryMode::Required && self.secondary_root.is_none() {
            bail!("A secondary folder is required in this mode");
        }

        let name = self.output_dir_name.trim();
        if name.is_empty() || name == "." || name == ".." {
            bail!("Output folder name cannot be empty");
        }
        if Path::new(name).components().count() != 1 {
            bail!("Output folder name must not contain path separators: {name}");
        }

        if let BackendKind::Command { program } = &self.backend
            && program.as_os_str().is_empty()
        {
            bail!("Merge tool program cannot be empty");
        }

        if self.tool_timeout.is_zero() {
            bail!("Merge tool timeout must be greater than zero");
        }

        Ok(())
    }

    /// Resolve the output folder.
    ///
    /// An explicit `output_parent` wins. Otherwise the folder is placed next
    /// to the primary root for the lopdf backend, and next to the running
    /// executable for the command backend.
    pub fn output_dir(&self) -> crate::Result<PathBuf> {
        let parent = match (&self.output_parent, &self.backend) {
            (Some(parent), _) => parent.clone(),
            (None, BackendKind::Lopdf) => {
                let primary = std::path::absolute(&self.primary_root)?;
                primary.parent().map(Path::to_path_buf).ok_or_else(|| {
                    PdfPairError::invalid_config(format!(
                        "Primary folder has no parent to hold the output folder: {}",
                        primary.display()
                    ))
                })?
            }
            (None, BackendKind::Command { .. }) => {
                let exe = std::env::current_exe()?;
                exe.parent().map(Path::to_path_buf).ok_or_else(|| {
                    PdfPairError::invalid_config("Cannot locate the executable's folder")
                })?
            }
        };

        Ok(parent.join(self.output_dir_name.trim()))
    }
}
