//! Errors surfaced by the command-line front end.

use pdfpair::PdfPairError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Run(#[from] PdfPairError),

    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Run(err) => err.exit_code(),
            Self::Json(_) => 1,
        }
    }
}
