//! Evigrade Server — HTTP API for paper extraction and evidence grading.
//!
//! Usage:
//!   EVIGRADE_BIND=0.0.0.0:5000 evigrade-server
//!
//! Or with args:
//!   evigrade-server --bind 0.0.0.0:5000 --config /path/to/settings.json

use evigrade_lib::grading::EvidenceGrader;
use evigrade_lib::http_server::{self, AppState};
use evigrade_lib::{init_logging, settings};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    // Parse simple args (no clap to keep binary small)
    let args: Vec<String> = std::env::args().collect();
    let mut bind_arg: Option<&str> = None;
    let mut config_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                config_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                println!("evigrade-server — Evidence grading HTTP API");
                println!();
                println!("Usage: evigrade-server [--bind ADDR:PORT] [--config PATH]");
                println!();
                println!("Environment variables:");
                println!("  {}               Bind address (default: 127.0.0.1:5000)", settings::BIND_ENV);
                println!("  {}  Request body limit in bytes (default: 16 MiB)", settings::MAX_UPLOAD_ENV);
                println!("  {}             Settings file path", settings::CONFIG_ENV);
                println!("  RUST_LOG                    Log filter (default: info)");
                std::process::exit(0);
            }
            other => {
                eprintln!("[Server] Ignoring unknown argument: {}", other);
                i += 1;
            }
        }
    }

    init_logging();

    let mut config = match config_arg {
        Some(path) => settings::init_at(PathBuf::from(path)),
        None => settings::init(settings::default_data_dir()),
    };
    if let Some(bind) = bind_arg {
        config.bind_addr = bind.to_string();
    }

    let grader = EvidenceGrader::configured(config.thresholds);
    let thresholds = grader.thresholds();
    tracing::info!(
        high = thresholds.high,
        moderate = thresholds.moderate,
        low = thresholds.low,
        max_upload_bytes = config.max_upload_bytes,
        "grader ready"
    );

    let state = AppState::new(grader, config.preview_chars);
    if let Err(e) = http_server::serve(state, &config.bind_addr, config.max_upload_bytes).await {
        tracing::error!(addr = %config.bind_addr, error = %e, "server failed");
        std::process::exit(1);
    }
}
