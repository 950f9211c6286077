//! CLI argument parsing for pdfpair.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pdfpair::config::{
    BackendKind, Config, DEFAULT_OUTPUT_DIR_NAME, DEFAULT_TOOL_TIMEOUT, SecondaryMode,
};
use pdfpair::error::Result;

/// Pair PDF files across two folders by name and merge each pair.
///
/// Every PDF under PRIMARY is matched with the PDFs under SECONDARY that
/// share its base name. A trailing "(n)", "_n" or " n" is treated as a
/// sequence number, so "Report.pdf" pairs with "Report (1).pdf" and
/// "report_2.pdf". Each primary is written, followed by its partners in
/// sequence order, to a file of the same name in the output folder.
#[derive(Parser, Debug)]
#[command(name = "pdfpair")]
#[command(version)]
#[command(about = "Pair PDF files across two folders by name and merge each pair", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Folder with the primary PDFs (searched recursively)
    #[arg(value_name = "PRIMARY")]
    pub primary: PathBuf,

    /// Folder with the PDFs appended to matching primaries
    ///
    /// May be the same folder as PRIMARY; a file is never appended to
    /// itself.
    #[arg(value_name = "SECONDARY")]
    pub secondary: Option<PathBuf>,

    /// Continue with a warning when SECONDARY is missing or not given
    #[arg(long)]
    pub secondary_optional: bool,

    /// Folder in which the output folder is created
    ///
    /// Defaults to the parent of PRIMARY, or to the folder of this executable
    /// when an external merge tool is used.
    #[arg(short = 'p', long, value_name = "DIR")]
    pub output_parent: Option<PathBuf>,

    /// Name of the output folder
    #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_DIR_NAME)]
    pub output_name: String,

    /// Merge with an external pdftk-compatible tool instead of in-process
    ///
    /// The tool is invoked as `PROGRAM <primary> <files...> cat output <out>`.
    #[arg(long, value_name = "PROGRAM", env = "PDFPAIR_BACKEND")]
    pub backend_cmd: Option<PathBuf>,

    /// Seconds one invocation of the merge tool may run before it is killed
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TOOL_TIMEOUT.as_secs())]
    pub tool_timeout: u64,

    /// Show the groups that would be merged without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output - include debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print events and the final summary as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Convert CLI arguments to a validated configuration.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = Config::new(self.primary.clone(), self.secondary.clone());

        if self.secondary_optional {
            config.secondary_mode = SecondaryMode::Optional;
        }
        config.output_parent = self.output_parent.clone();
        config.output_dir_name = self.output_name.clone();
        if let Some(program) = &self.backend_cmd {
            config.backend = BackendKind::Command {
                program: program.clone(),
            };
        }
        config.tool_timeout = Duration::from_secs(self.tool_timeout);
        config.dry_run = self.dry_run;

        config.validate()?;
        Ok(config)
    }
}
