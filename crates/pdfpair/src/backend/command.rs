//! Merging through an external command-line tool.
//!
//! Nothing is parsed in-process. `open` only checks that the file exists and
//! starts with a PDF header; the tool does the real work when the group is
//! saved, so a damaged member surfaces as a failure of the whole group.
//!
//! Each invocation runs under a deadline. A tool that hangs is killed once
//! the deadline passes and only its group is abandoned.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::PdfBackend;
use crate::config::DEFAULT_TOOL_TIMEOUT;
use crate::error::{PdfPairError, Result};
use crate::io::writer::temp_path_for;

/// How often a running tool is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Files accumulated for one invocation of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMerge {
    /// Input paths in merge order.
    pub inputs: Vec<PathBuf>,
}

/// Backend that shells out to a pdftk-compatible executable.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    timeout: Duration,
}

impl CommandBackend {
    /// Use `program`, either a path or a name looked up on `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Limit how long one invocation may run before it is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for merging `inputs` into `output`.
    pub fn arguments(inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = inputs.iter().map(|p| p.as_os_str().to_owned()).collect();
        args.push("cat".into());
        args.push("output".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    fn resolve(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 || self.program.is_absolute() {
            return self.program.is_file().then(|| self.program.clone());
        }

        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            let candidate = dir.join(&self.program);
            if candidate.is_file() {
                return Some(candidate);
            }
            if cfg!(windows) {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }

    fn spawn(&self, args: &[OsString]) -> Result<Child> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    PdfPairError::backend_unavailable(self.program.clone(), e.to_string())
                }
                _ => PdfPairError::unexpected(format!(
                    "Failed to start {}: {e}",
                    self.program.display()
                )),
            })
    }

    /// Run the tool once, writing the merge of `inputs` to `output`.
    fn invoke(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let args = Self::arguments(inputs, output);
        debug!(program = %self.program.display(), ?args, "invoking merge tool");

        let mut child = self.spawn(&args)?;

        // Drained on its own thread so a chatty tool cannot stall on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let Some(status) = self.wait_with_deadline(&mut child)? else {
            // Anything the tool started may still hold the pipe, so the
            // reader thread is left to finish on its own.
            return Err(PdfPairError::BackendInvocation {
                program: self.program.clone(),
                status: None,
                stderr: format!("timed out after {}s", self.timeout.as_secs_f32()),
            });
        };

        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(PdfPairError::BackendInvocation {
                program: self.program.clone(),
                status: status.code(),
                stderr,
            })
        }
    }

    /// Wait for `child` to exit. Returns `None` after killing it at the
    /// deadline.
    fn wait_with_deadline(&self, child: &mut Child) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(
                        program = %self.program.display(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "merge tool timed out, killing it"
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(None);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PdfPairError::unexpected(format!(
                        "Failed to wait for {}: {err}",
                        self.program.display()
                    )));
                }
            }
        }
    }
}

impl PdfBackend for CommandBackend {
    type Document = PendingMerge;

    fn name(&self) -> &str {
        "command"
    }

    fn probe(&self) -> Result<()> {
        match self.resolve() {
            Some(found) => {
                debug!("merge tool resolved to {}", found.display());
                Ok(())
            }
            None => Err(PdfPairError::backend_unavailable(
                self.program.clone(),
                "executable not found",
            )),
        }
    }

    fn open(&self, path: &Path) -> Result<PendingMerge> {
        if !path.is_file() {
            return Err(PdfPairError::file_not_found(path.to_path_buf()));
        }
        check_header(path)?;
        Ok(PendingMerge {
            inputs: vec![path.to_path_buf()],
        })
    }

    fn append(&self, target: &mut PendingMerge, source: PendingMerge) -> Result<()> {
        target.inputs.extend(source.inputs);
        Ok(())
    }

    fn save(&self, document: PendingMerge, path: &Path) -> Result<()> {
        // The tool writes a sibling temp file that is renamed into place, so
        // a failed or killed run never leaves a partial output behind.
        let temp = temp_path_for(path);
        let result = self.invoke(&document.inputs, &temp).and_then(|()| {
            fs::rename(&temp, path).map_err(|source| PdfPairError::SaveFailed {
                path: path.to_path_buf(),
                source,
            })
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }
}

/// Reject files that do not start with `%PDF-`.
fn check_header(path: &Path) -> Result<()> {
    let mut header = [0u8; 5];
    let read = File::open(path)
        .and_then(|mut f| f.read(&mut header))
        .map_err(|e| PdfPairError::parse_error(path.to_path_buf(), e.to_string()))?;

    if read < header.len() || &header != b"%PDF-" {
        return Err(PdfPairError::parse_error(
            path.to_path_buf(),
            "missing %PDF- header",
        ));
    }
    Ok(())
}
