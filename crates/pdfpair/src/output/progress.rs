//! Terminal progress bar driven by percentage updates.
//!
//! ```
//! use pdfpair::output::progress::ProgressBar;
//!
//! let mut progress = ProgressBar::disabled();
//! progress.set_message("Merging");
//! progress.update(40);
//! progress.update(25); // ignored, progress never goes back
//! assert_eq!(progress.percent(), 40);
//! progress.finish();
//! ```

use std::io::{self, Write};
use std::time::{Duration, Instant};

const WIDTH: usize = 40;

/// Progress bar for visual feedback during a run.
#[derive(Debug)]
pub struct ProgressBar {
    /// Last percentage shown, 0 through 100.
    percent: u8,
    /// Optional message to display.
    message: Option<String>,
    /// Start time of the operation.
    start_time: Instant,
    /// Whether the progress bar is enabled.
    enabled: bool,
    /// Whether anything has been drawn on the current line.
    drawn: bool,
}

impl ProgressBar {
    /// Create a progress bar that draws when stdout is a terminal.
    pub fn new() -> Self {
        Self {
            percent: 0,
            message: None,
            start_time: Instant::now(),
            enabled: Self::is_terminal(),
            drawn: false,
        }
    }

    /// Create a disabled progress bar (no output).
    pub fn disabled() -> Self {
        let mut pb = Self::new();
        pb.enabled = false;
        pb
    }

    fn is_terminal() -> bool {
        use std::io::IsTerminal;
        io::stdout().is_terminal()
    }

    /// Set the message shown before the bar.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.render();
    }

    /// Move the bar to `percent`. Lower values than the current one are
    /// ignored.
    pub fn update(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent < self.percent {
            return;
        }
        self.percent = percent;
        self.render();
    }

    /// Erase the bar so a log line can be printed; the next update redraws it.
    pub fn clear(&mut self) {
        if self.enabled && self.drawn {
            print!("\r\x1b[K");
            io::stdout().flush().ok();
            self.drawn = false;
        }
    }

    /// Finish the bar and move to a new line.
    pub fn finish(&mut self) {
        if self.enabled && self.drawn {
            self.render();
            println!();
            self.drawn = false;
        }
    }

    /// Current percentage.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Get the elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn render(&mut self) {
        if !self.enabled {
            return;
        }
        print!("\r\x1b[K{}", self.render_bar());
        io::stdout().flush().ok();
        self.drawn = true;
    }

    /// Render the bar as text.
    fn render_bar(&self) -> String {
        let filled = WIDTH * usize::from(self.percent) / 100;
        let empty = WIDTH - filled;

        let bar = format!(
            "[{}{}]",
            "=".repeat(filled.saturating_sub(1)) + if filled > 0 { ">" } else { "" },
            " ".repeat(empty)
        );

        let mut parts = vec![
            bar,
            format!("{}%", self.percent),
            format_duration(self.start_time.elapsed()),
        ];
        if let Some(ref msg) = self.message {
            parts.insert(0, msg.clone());
        }

        parts.join(" ")
    }
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration as a human-readable string.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
