//! Terminal presentation of a run.
//!
//! [`EventRenderer`] consumes [`RunEvent`]s as they arrive and turns them into
//! log lines plus a progress bar. [`display_summary`] prints the final
//! counters once the run returns.
//!
//! ```no_run
//! use pdfpair::events::RunEvent;
//! use pdfpair::output::{EventRenderer, OutputFormatter, ProgressBar};
//!
//! let mut renderer = EventRenderer::new(OutputFormatter::default(), ProgressBar::new());
//! renderer.handle(&RunEvent::Progress { percent: 50 });
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::ProgressBar;

use progress::format_duration;
use crate::events::RunEvent;
use crate::orchestrator::{RunOutcome, RunSummary};

/// Presents events on the terminal.
#[derive(Debug)]
pub struct EventRenderer {
    formatter: OutputFormatter,
    progress: ProgressBar,
}

impl EventRenderer {
    /// Pair a formatter with a progress bar.
    pub fn new(formatter: OutputFormatter, progress: ProgressBar) -> Self {
        Self {
            formatter,
            progress,
        }
    }

    /// Present one event.
    pub fn handle(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Progress { percent } => self.progress.update(*percent),
            RunEvent::Status { text } => self.progress.set_message(text.clone()),
            RunEvent::Log { text, severity } => {
                self.progress.clear();
                self.formatter.log(*severity, text);
            }
            RunEvent::Finished {
                success,
                message,
                output_dir,
            } => {
                self.progress.finish();
                self.formatter
                    .detail("Elapsed", &format_duration(self.progress.elapsed()));
                if *success {
                    self.formatter.success(message);
                } else {
                    self.formatter.warning(message);
                }
                if let Some(dir) = output_dir {
                    self.formatter
                        .info(&format!("Results are in '{}'", dir.display()));
                }
            }
        }
    }

    /// The formatter used for log lines.
    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }
}

/// Print the counters of a finished run.
pub fn display_summary(formatter: &OutputFormatter, summary: &RunSummary) {
    let c = &summary.counters;

    formatter.section("Summary");
    match summary.outcome {
        RunOutcome::DryRun => {
            for group in &summary.groups {
                let members: Vec<String> = group
                    .members
                    .iter()
                    .map(|m| crate::scan::file_name_of(m))
                    .collect();
                formatter.info(&format!(
                    "  {} <- {}",
                    group.output_name,
                    members.join(", ")
                ));
            }
        }
        _ => formatter.info(&format!(
            "  Groups merged:               {} of {}",
            c.merged_groups, summary.groups_total
        )),
    }

    formatter.info(&format!(
        "  Primary skipped (no pair):   {}",
        c.skipped_primary_no_pair
    ));
    if c.skipped_primary_duplicate > 0 {
        formatter.info(&format!(
            "  Primary skipped (duplicate): {}",
            c.skipped_primary_duplicate
        ));
    }
    formatter.info(&format!(
        "  Primary skipped (unreadable): {}",
        c.skipped_primary_corrupt
    ));
    formatter.info(&format!(
        "  Secondary skipped (no pair): {}",
        c.skipped_secondary_no_pair
    ));
    formatter.info(&format!(
        "  Secondary skipped (unreadable): {}",
        c.skipped_secondary_corrupt
    ));

    if formatter.is_verbose() {
        for failed in summary.failed_primary.iter().chain(&summary.failed_secondary) {
            formatter.detail(&failed.path.display().to_string(), &failed.reason);
        }
    }
}
