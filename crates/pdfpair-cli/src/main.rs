//! pdfpair - Pair PDF files across two folders by name and merge each pair.

mod cli;
mod error;
mod logging;

use clap::Parser;
use std::process;
use tracing::warn;

use crate::cli::Cli;
use crate::error::CliError;
use pdfpair::output::{EventRenderer, OutputFormatter, ProgressBar, display_summary};
use pdfpair::{RunOutcome, RunSummary, spawn_run};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(err.exit_code());
        }
    }
}

/// Main application logic. Returns the process exit code.
async fn run(cli: Cli) -> Result<i32, CliError> {
    let config = cli.to_config()?;

    let formatter = if cli.quiet || cli.json {
        OutputFormatter::quiet()
    } else if cli.verbose {
        OutputFormatter::verbose()
    } else {
        OutputFormatter::default()
    };
    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfpair::NAME, pdfpair::VERSION));
    }

    let mut handle = spawn_run(config);

    // First interrupt stops between groups; a second one exits at once.
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, stopping after the current group (press Ctrl-C again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted");
            process::exit(130);
        }
    });

    let progress = if cli.quiet || cli.json {
        ProgressBar::disabled()
    } else {
        ProgressBar::new()
    };
    let mut renderer = EventRenderer::new(formatter.clone(), progress);

    while let Some(event) = handle.next_event().await {
        if cli.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            renderer.handle(&event);
        }
    }

    let summary = handle.wait().await?;

    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        display_summary(&formatter, &summary);
    }

    Ok(exit_code(&summary))
}

/// Exit code for a run that did not fail fatally.
fn exit_code(summary: &RunSummary) -> i32 {
    match summary.outcome {
        RunOutcome::Completed | RunOutcome::DryRun => 0,
        RunOutcome::NoPairs => 3,
        RunOutcome::Cancelled => 130,
    }
}
