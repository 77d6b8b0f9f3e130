pub mod error;
pub mod grading;
pub mod http_server;
pub mod papers;
pub mod settings;
pub mod utils;

pub use error::GradeError;
pub use grading::{BatchOutcome, EvidenceGrader, EvidenceLevel, GradeResponse, GradingResult};
pub use papers::{extract, extract_text_from_pdf, extract_with_id, PaperRecord};

/// Install the tracing subscriber used by the binaries (`RUST_LOG`, default `info`).
/// Logs go to stderr so CLI `--json` output stays clean.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
