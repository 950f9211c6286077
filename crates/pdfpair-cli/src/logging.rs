use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that overrides the diagnostic filter.
pub const LOG_ENV: &str = "PDFPAIR_LOG";

/// Install the diagnostics subscriber on stderr.
///
/// User-facing progress goes to stdout through the event stream; this only
/// carries tracing output, `warn` and above unless `verbose` or
/// `PDFPAIR_LOG` asks for more.
pub fn init_logger(verbose: bool) {
    let default = if verbose { "pdfpair=debug,warn" } else { "warn" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default.to_string());

    // A second initialisation (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(EnvFilter::new(filter))
        .try_init();
}
