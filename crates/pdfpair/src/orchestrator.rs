//! Sequential merge pipeline.
//!
//! One run moves through
//! `Validating → Scanning → Matching → PreparingOutput → Merging →
//! Summarizing → Done`, or stops in `Failed` on a run-fatal error. Groups are
//! merged strictly one at a time in prefix order, and every event for group
//! *N* is emitted before any event for group *N + 1*.
//!
//! Failures inside a group never end the run:
//!
//! - a member that cannot be opened is skipped and the rest of the group is
//!   still merged;
//! - a primary that cannot be opened abandons its group;
//! - a failed save, a failed backend invocation, or a panic inside the backend
//!   abandons the group as well.
//!
//! Only missing roots, an unusable output folder, and an absent backend are
//! fatal.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::PdfBackend;
use crate::cancel::CancellationToken;
use crate::config::{Config, SecondaryMode};
use crate::error::{PdfPairError, Result, RootRole};
use crate::events::EventEmitter;
use crate::lock::OutputLock;
use crate::matcher::{MatchResult, MergeGroup, UnusedFile, UnusedReason, match_scans};
use crate::scan::{ScanResult, TreeScanner, file_name_of};

/// Pipeline stage, used for tracing and status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Checking roots and backend.
    Validating,
    /// Walking the input trees.
    Scanning,
    /// Forming merge groups.
    Matching,
    /// Creating and locking the output folder.
    PreparingOutput,
    /// Merging groups one at a time.
    Merging,
    /// Reporting counters and unused files.
    Summarizing,
    /// Finished normally.
    Done,
    /// Stopped by a run-fatal error.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Scanning => "scanning",
            Self::Matching => "matching",
            Self::PreparingOutput => "preparing output",
            Self::Merging => "merging",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Groups whose merged output was saved.
    pub merged_groups: usize,
    /// Primary files with no partner in the secondary root.
    pub skipped_primary_no_pair: usize,
    /// Primary files that lost the representative election for their prefix.
    pub skipped_primary_duplicate: usize,
    /// Groups abandoned at group level (unreadable primary, failed save,
    /// unexpected error).
    pub skipped_primary_corrupt: usize,
    /// Secondary files with no partner in the primary root.
    pub skipped_secondary_no_pair: usize,
    /// Members left out of their group because they could not be opened.
    pub skipped_secondary_corrupt: usize,
}

/// How a run ended, short of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every group was attempted.
    Completed,
    /// No group could be formed; nothing was written.
    NoPairs,
    /// Cancellation stopped the run between groups.
    Cancelled,
    /// Matching ran but nothing was merged, by request.
    DryRun,
}

/// Result of one group's merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Whether the output was saved.
    pub success: bool,
    /// Saved output, on success.
    pub output_path: Option<PathBuf>,
    /// Why the group was abandoned, on failure.
    pub error: Option<String>,
}

impl MergeOutcome {
    fn saved(path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(path),
            error: None,
        }
    }

    fn abandoned(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            error: Some(error.into()),
        }
    }
}

/// A file that was part of a group but could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Root it came from.
    pub role: RootRole,
    /// Error description.
    pub reason: String,
}

/// Everything a run produced, for display or serialization.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Final counters.
    pub counters: RunCounters,
    /// Output folder, if it was prepared.
    pub output_dir: Option<PathBuf>,
    /// Number of groups formed.
    pub groups_total: usize,
    /// Number of groups attempted.
    pub groups_processed: usize,
    /// Groups in processing order.
    pub groups: Vec<MergeGroup>,
    /// Saved output files, in processing order.
    pub outputs: Vec<PathBuf>,
    /// Primary files that were never grouped.
    pub unused_primary: Vec<UnusedFile>,
    /// Secondary files that were never grouped.
    pub unused_secondary: Vec<UnusedFile>,
    /// Primaries whose group was abandoned.
    pub failed_primary: Vec<FailedFile>,
    /// Members left out of their group.
    pub failed_secondary: Vec<FailedFile>,
}

impl RunSummary {
    fn from_match(matched: MatchResult, outcome: RunOutcome) -> Self {
        let count = |unused: &[UnusedFile], reason: UnusedReason| {
            unused.iter().filter(|u| u.reason == reason).count()
        };

        let counters = RunCounters {
            skipped_primary_no_pair: count(&matched.unused_primary, UnusedReason::NoPair),
            skipped_primary_duplicate: count(&matched.unused_primary, UnusedReason::DuplicatePrefix),
            skipped_secondary_no_pair: matched.unused_secondary.len(),
            ..RunCounters::default()
        };

        Self {
            outcome,
            counters,
            output_dir: None,
            groups_total: matched.groups.len(),
            groups_processed: 0,
            groups: matched.groups,
            outputs: Vec::new(),
            unused_primary: matched.unused_primary,
            unused_secondary: matched.unused_secondary,
            failed_primary: Vec::new(),
            failed_secondary: Vec::new(),
        }
    }

    /// Whether the run should be reported as successful.
    ///
    /// Partial failures inside groups do not make a run unsuccessful; finding
    /// nothing to merge or being cancelled does.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed | RunOutcome::DryRun)
    }

    /// One-line description of the outcome.
    pub fn message(&self) -> String {
        match self.outcome {
            RunOutcome::Completed => format!(
                "Merged {} of {} group(s)",
                self.counters.merged_groups, self.groups_total
            ),
            RunOutcome::NoPairs => "No matching file pairs were found to merge".to_string(),
            RunOutcome::Cancelled => format!(
                "Cancelled after {} of {} group(s); {} merged",
                self.groups_processed, self.groups_total, self.counters.merged_groups
            ),
            RunOutcome::DryRun => format!("Dry run: {} group(s) would be merged", self.groups_total),
        }
    }
}

/// Drives one run from validation to summary.
pub struct MergeOrchestrator<B: PdfBackend> {
    config: Config,
    backend: B,
    events: EventEmitter,
    cancel: CancellationToken,
}

impl<B: PdfBackend> MergeOrchestrator<B> {
    /// Create an orchestrator that emits no events and cannot be cancelled.
    pub fn new(config: Config, backend: B) -> Self {
        Self {
            config,
            backend,
            events: EventEmitter::silent(),
            cancel: CancellationToken::new(),
        }
    }

    /// Send events to `events`.
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Observe `cancel` between groups.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the whole pipeline.
    ///
    /// Emits a `Finished` event as the last event in every case.
    ///
    /// # Errors
    ///
    /// Returns run-fatal errors only: missing roots, invalid configuration,
    /// an output folder that cannot be created or is locked, or a backend that
    /// is unavailable.
    pub fn run(&self) -> Result<RunSummary> {
        self.events.heading("--- Starting PDF merge ---");

        match self.execute() {
            Ok(summary) => {
                self.enter(Phase::Done);
                self.events.finished(
                    summary.is_success(),
                    summary.message(),
                    summary.output_dir.clone(),
                );
                Ok(summary)
            }
            Err(err) => {
                self.enter(Phase::Failed);
                error!("run failed: {}", err);
                self.events
                    .error(format!("--- Fatal error during the run: {err} ---"));
                self.events.finished(false, err.to_string(), None);
                Err(err)
            }
        }
    }

    fn enter(&self, phase: Phase) {
        info!(%phase, "entering phase");
    }

    fn execute(&self) -> Result<RunSummary> {
        self.enter(Phase::Validating);
        self.events.status("Validating folders and looking for PDF files...");
        let secondary_root = self.validate()?;
        let output_dir = self.config.output_dir()?;

        self.enter(Phase::Scanning);
        let (primary, secondary) = self.scan(secondary_root.as_deref(), &output_dir)?;

        self.enter(Phase::Matching);
        let matched = self.match_files(&primary, &secondary);

        if self.config.dry_run {
            let summary = RunSummary::from_match(matched, RunOutcome::DryRun);
            self.enter(Phase::Summarizing);
            self.report_unused(&summary);
            self.report_counters(&summary);
            return Ok(summary);
        }

        if matched.is_empty() {
            self.events.warning("No matching PDF pairs were found.");
            self.events.info(
                "Make sure files in the primary folder share a base name with files in the secondary folder.",
            );
            let summary = RunSummary::from_match(matched, RunOutcome::NoPairs);
            self.enter(Phase::Summarizing);
            self.report_unused(&summary);
            self.report_counters(&summary);
            return Ok(summary);
        }

        self.enter(Phase::PreparingOutput);
        let _lock = self.prepare_output(&output_dir)?;

        let mut summary = RunSummary::from_match(matched, RunOutcome::Completed);
        summary.output_dir = Some(output_dir.clone());

        self.enter(Phase::Merging);
        self.merge_all(&output_dir, &mut summary)?;

        self.enter(Phase::Summarizing);
        self.report_unused(&summary);
        self.report_counters(&summary);

        Ok(summary)
    }

    /// Returns the secondary root to scan, or `None` when it is optional and
    /// absent.
    fn validate(&self) -> Result<Option<PathBuf>> {
        self.config.validate()?;

        let primary = &self.config.primary_root;
        if !primary.is_dir() {
            self.events.error(format!(
                "Error: primary folder '{}' not found or not a directory.",
                primary.display()
            ));
            return Err(PdfPairError::directory_not_found(
                RootRole::Primary,
                primary.clone(),
            ));
        }

        let secondary = match &self.config.secondary_root {
            Some(root) if root.is_dir() => Some(root.clone()),
            Some(root) => match self.config.secondary_mode {
                SecondaryMode::Required => {
                    self.events.error(format!(
                        "Error: secondary folder '{}' not found or not a directory.",
                        root.display()
                    ));
                    return Err(PdfPairError::directory_not_found(
                        RootRole::Secondary,
                        root.clone(),
                    ));
                }
                SecondaryMode::Optional => {
                    warn!("optional secondary root missing: {}", root.display());
                    self.events.warning(format!(
                        "Warning: secondary folder '{}' not found or not a directory. Continuing without it.",
                        root.display()
                    ));
                    None
                }
            },
            None => {
                self.events
                    .info("No secondary folder selected; only the primary folder will be scanned.");
                None
            }
        };

        if !self.config.dry_run {
            debug!("probing {} backend", self.backend.name());
            self.backend.probe()?;
        }

        Ok(secondary)
    }

    fn scan(&self, secondary_root: Option<&Path>, output_dir: &Path) -> Result<(ScanResult, ScanResult)> {
        let scanner = TreeScanner::new().exclude(output_dir);
        let events = &self.events;

        let primary_root = &self.config.primary_root;
        events.info(format!(
            "Searching for PDF files in primary folder '{}'...",
            primary_root.display()
        ));
        let primary = scanner.scan(primary_root, RootRole::Primary, |record| {
            events.info(format!("Found primary: '{}'", record.file_name()));
        })?;

        let secondary = match secondary_root {
            Some(root) => {
                events.info(format!(
                    "Searching for PDF files in secondary folder '{}'...",
                    root.display()
                ));
                scanner.scan(root, RootRole::Secondary, |record| {
                    events.info(format!("Found secondary: '{}'", record.file_name()));
                })?
            }
            None => ScanResult::empty(RootRole::Secondary),
        };

        debug!(
            primary = primary.len(),
            secondary = secondary.len(),
            "scan complete"
        );
        Ok((primary, secondary))
    }

    fn match_files(&self, primary: &ScanResult, secondary: &ScanResult) -> MatchResult {
        self.events.heading("--- Analyzing file pairs ---");
        let matched = match_scans(primary, secondary);

        for group in &matched.groups {
            let members: Vec<String> = group
                .members
                .iter()
                .map(|m| format!("'{}'", file_name_of(m)))
                .collect();
            self.events.info(format!(
                "Pair found: '{}' with {}",
                file_name_of(&group.primary_path),
                members.join(", ")
            ));
        }

        for unused in matched.unused_primary.iter().chain(&matched.unused_secondary) {
            self.events.warning(format!(
                "Skipping {} file '{}': {}.",
                unused.role,
                file_name_of(&unused.path),
                unused.reason.describe()
            ));
        }

        info!(groups = matched.groups.len(), "matching complete");
        matched
    }

    fn prepare_output(&self, output_dir: &Path) -> Result<OutputLock> {
        std::fs::create_dir_all(output_dir).map_err(|source| PdfPairError::OutputCreationFailed {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let lock = OutputLock::acquire(output_dir)?;

        self.events.heading(format!(
            "--- Output folder: '{}' ---",
            output_dir.display()
        ));
        self.events.status(format!(
            "Using output folder '{}'",
            file_name_of(output_dir)
        ));
        Ok(lock)
    }

    fn merge_all(&self, output_dir: &Path, summary: &mut RunSummary) -> Result<()> {
        self.events.heading("--- Merging file groups ---");
        let total = summary.groups_total;
        let groups = summary.groups.clone();

        for (index, group) in groups.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(remaining = total - index, "cancellation requested");
                self.events.warning(format!(
                    "Cancellation requested; {} group(s) were not started.",
                    total - index
                ));
                summary.outcome = RunOutcome::Cancelled;
                break;
            }

            // A panicking group is counted once, as abandoned, so anything
            // it recorded before the panic is rolled back.
            let counters = summary.counters;
            let failed_secondary = summary.failed_secondary.len();
            let outputs = summary.outputs.len();

            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                self.merge_group(group, output_dir, summary)
            }));

            let outcome = match attempt {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => return Err(err),
                Err(payload) => {
                    summary.counters = counters;
                    summary.failed_secondary.truncate(failed_secondary);
                    summary.outputs.truncate(outputs);
                    let err = PdfPairError::unexpected(panic_message(payload.as_ref()));
                    self.abandon_group(group, &err, summary)
                }
            };
            debug!(prefix = %group.prefix, ?outcome, "group finished");

            let processed = index + 1;
            summary.groups_processed = processed;
            self.events.progress((processed * 100 / total) as u8);
            self.events.status(format!(
                "Processed {processed}/{total}: '{}'",
                group.output_name
            ));
        }

        self.events.heading("--- Merging finished ---");
        Ok(())
    }

    /// Merge one group. Returns `Err` only for run-fatal errors.
    fn merge_group(
        &self,
        group: &MergeGroup,
        output_dir: &Path,
        summary: &mut RunSummary,
    ) -> Result<MergeOutcome> {
        let primary_name = file_name_of(&group.primary_path);
        self.events.info(format!(
            "Merging '{}' with {} file(s).",
            primary_name,
            group.members.len()
        ));

        let mut document = match self.backend.open(&group.primary_path) {
            Ok(document) => document,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => return Ok(self.abandon_group(group, &err, summary)),
        };

        for member in &group.members {
            let appended = self
                .backend
                .open(member)
                .and_then(|source| self.backend.append(&mut document, source));

            match appended {
                Ok(()) => debug!("appended {}", member.display()),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("skipping member {}: {}", member.display(), err);
                    summary.counters.skipped_secondary_corrupt += 1;
                    self.events.warning(format!(
                        "Cannot read '{}': {}. Skipping this file.",
                        file_name_of(member),
                        err
                    ));
                    summary.failed_secondary.push(FailedFile {
                        path: member.clone(),
                        role: RootRole::Secondary,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let output_path = output_dir.join(&group.output_name);
        match self.backend.save(document, &output_path) {
            Ok(()) => {
                summary.counters.merged_groups += 1;
                summary.outputs.push(output_path.clone());
                self.events
                    .success(format!("Saved '{}'.", group.output_name));
                Ok(MergeOutcome::saved(output_path))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => Ok(self.abandon_group(group, &err, summary)),
        }
    }

    fn abandon_group(
        &self,
        group: &MergeGroup,
        err: &PdfPairError,
        summary: &mut RunSummary,
    ) -> MergeOutcome {
        warn!("abandoning group {}: {}", group.prefix, err);
        summary.counters.skipped_primary_corrupt += 1;
        self.events.error(format!(
            "Failed to merge '{}': {}. Skipping this group.",
            file_name_of(&group.primary_path),
            err
        ));
        summary.failed_primary.push(FailedFile {
            path: group.primary_path.clone(),
            role: RootRole::Primary,
            reason: err.to_string(),
        });
        MergeOutcome::abandoned(err.to_string())
    }

    fn report_unused(&self, summary: &RunSummary) {
        let sections = [
            ("primary", &summary.unused_primary),
            ("secondary", &summary.unused_secondary),
        ];

        for (role, unused) in sections {
            if unused.is_empty() {
                self.events
                    .info(format!("No {role} files were skipped for lack of a pair."));
                continue;
            }
            self.events
                .heading(format!("--- Skipped {role} files (no pair) ---"));
            for file in unused {
                self.events.warning(format!("- {}", file_name_of(&file.path)));
            }
        }
    }

    fn report_counters(&self, summary: &RunSummary) {
        let c = &summary.counters;

        if !summary.failed_primary.is_empty() {
            self.events.heading("--- Groups that could not be merged ---");
            for file in &summary.failed_primary {
                self.events
                    .error(format!("- {}: {}", file_name_of(&file.path), file.reason));
            }
        }
        if !summary.failed_secondary.is_empty() {
            self.events.heading("--- Files left out of their group ---");
            for file in &summary.failed_secondary {
                self.events
                    .warning(format!("- {}: {}", file_name_of(&file.path), file.reason));
            }
        }

        self.events.info(format!(
            "Merged groups: {}; primary skipped (no pair / duplicate / unreadable): {} / {} / {}; \
             secondary skipped (no pair / unreadable): {} / {}",
            c.merged_groups,
            c.skipped_primary_no_pair,
            c.skipped_primary_duplicate,
            c.skipped_primary_corrupt,
            c.skipped_secondary_no_pair,
            c.skipped_secondary_corrupt,
        ));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with unknown payload".to_string()
    }
}
