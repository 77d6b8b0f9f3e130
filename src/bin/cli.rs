//! Evigrade CLI - extract study attributes and grade evidence from the terminal
//!
//! Usage: evigrade-cli <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use evigrade_lib::grading::{BatchOutcome, GradeResponse, GradeThresholds, GradingResult};
use evigrade_lib::http_server::PaperReport;
use evigrade_lib::{extract_text_from_pdf, extract_with_id, init_logging, settings, EvidenceGrader, PaperRecord};
use std::path::{Path, PathBuf};

// ============================================================================
// Main CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "evigrade-cli")]
#[command(version, about = "Evidence grading for clinical research papers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (default: <data dir>/evigrade/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract study attributes from a PDF or plain-text file
    Extract {
        /// Input file (.pdf or text)
        file: PathBuf,
    },
    /// Grade paper records from a JSON file (one object or a list)
    Grade {
        /// JSON file
        file: PathBuf,
    },
    /// Extract then grade a PDF or plain-text file
    Analyze {
        /// Input file (.pdf or text)
        file: PathBuf,
    },
    /// Show or update grade thresholds
    Thresholds {
        /// Minimum composite for High
        #[arg(long, requires_all = ["moderate", "low"])]
        high: Option<u32>,
        /// Minimum composite for Moderate
        #[arg(long, requires_all = ["high", "low"])]
        moderate: Option<u32>,
        /// Minimum composite for Low
        #[arg(long, requires_all = ["high", "moderate"])]
        low: Option<u32>,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => settings::init_at(path.clone()),
        None => settings::init(settings::default_data_dir()),
    };
    let grader = EvidenceGrader::configured(config.thresholds);

    match cli.command {
        Commands::Extract { file } => {
            let record = load_record(&file)?;
            if cli.json {
                print_json(&record)?;
            } else {
                print_record(&record);
            }
        }
        Commands::Grade { file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| format!("Invalid JSON in {}: {}", file.display(), e))?;
            let response = grader.grade_payload(&payload).map_err(|e| e.to_string())?;
            if cli.json {
                print_json(&response)?;
            } else {
                print_grade_response(&response);
            }
        }
        Commands::Analyze { file } => {
            let record = load_record(&file)?;
            let grading = grader.grade(&record);
            if cli.json {
                print_json(&PaperReport { record, grading, raw_text: None })?;
            } else {
                print_record(&record);
                println!();
                print_grading(&grading);
            }
        }
        Commands::Thresholds { high, moderate, low } => {
            if let (Some(high), Some(moderate), Some(low)) = (high, moderate, low) {
                settings::set_thresholds(GradeThresholds { high, moderate, low })
                    .map_err(|e| e.to_string())?;
            }
            let current = settings::get_thresholds();
            if cli.json {
                print_json(&current)?;
            } else {
                println!("High:     >= {}", current.high);
                println!("Moderate: >= {}", current.moderate);
                println!("Low:      >= {}", current.low);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Input
// ============================================================================

fn load_text(path: &Path) -> Result<String, String> {
    let is_pdf = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(evigrade_lib::utils::has_pdf_extension)
        .unwrap_or(false);

    if is_pdf {
        let bytes = std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        extract_text_from_pdf(&bytes).map_err(|e| e.to_string())
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
    }
}

fn load_record(path: &Path) -> Result<PaperRecord, String> {
    let text = load_text(path)?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("PDF")
        .to_string();
    Ok(extract_with_id(&text, id))
}

// ============================================================================
// Output
// ============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", out);
    Ok(())
}

fn print_record(r: &PaperRecord) {
    println!("Paper:        {}", r.paper_id);
    println!("Title:        {}", r.title);
    println!("Study type:   {}", r.study_type);
    println!("Methodology:  {}", r.methodology);
    println!("Sample size:  {}", r.sample_size);
    println!("Control:      {}", r.control_group);
    println!("Randomized:   {}", r.randomization);
    println!("Blinding:     {}", r.blinding);
    println!("Follow-up:    {} {}", r.follow_up, r.follow_up_unit);
    println!("Statistics:   {}", r.statistical_analysis);
    println!("Risk of bias: {}", r.risk_of_bias);
    println!("Consistency:  {}", r.consistency);
    println!("Directness:   {}", r.directness);
    println!("Precision:    {}", r.precision);
}

fn print_grading(g: &GradingResult) {
    println!("Evidence level: {} ({})", g.evidence_level, g.composite());
    for (name, score) in &g.scores {
        if name != evigrade_lib::grading::COMPOSITE_KEY {
            println!("  {:<22}{}", name, score);
        }
    }
}

fn print_grade_response(response: &GradeResponse) {
    match response {
        GradeResponse::Single(result) => print_grading(result),
        GradeResponse::Batch(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    BatchOutcome::Graded(result) => {
                        println!("[{}] {} ({})", i, result.evidence_level, result.composite());
                    }
                    BatchOutcome::Failed { error, .. } => println!("[{}] error: {}", i, error),
                }
            }
        }
    }
}
