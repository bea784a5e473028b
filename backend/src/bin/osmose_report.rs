//! OSmOSE Report Runner Binary
//!
//! Loads a report configuration and a JSON detection snapshot, runs every
//! configured report and prints the results as JSON on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Use ./report.toml (or backend/report.toml, ../report.toml)
//! DETECTIONS_JSON=detections.json cargo run --bin osmose-report
//!
//! # Explicit configuration file
//! REPORT_CONFIG=campaign.toml cargo run --bin osmose-report
//! ```
//!
//! # Environment Variables
//!
//! - `REPORT_CONFIG`: Path to the TOML report configuration (default: search `report.toml`)
//! - `DETECTIONS_JSON`: Path to the detection snapshot (default: `detections` in the config)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use osmose_rust::api::parse_detections_json_str;
use osmose_rust::config::ReportConfig;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting OSmOSE report run");

    let config = match env::var("REPORT_CONFIG") {
        Ok(path) => ReportConfig::from_file(&path)
            .with_context(|| format!("Failed to load report configuration {}", path))?,
        Err(_) => ReportConfig::from_default_location()
            .context("Failed to load report configuration")?,
    };

    let detections_path = env::var("DETECTIONS_JSON")
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.detections.clone())
        .context("No detection snapshot: set DETECTIONS_JSON or `detections` in the config")?;

    let json = fs::read_to_string(&detections_path)
        .with_context(|| format!("Failed to read {}", detections_path.display()))?;
    let table = parse_detections_json_str(&json)
        .with_context(|| format!("Failed to parse {}", detections_path.display()))?;
    info!(
        "Loaded {} detections from {} ({} annotators)",
        table.len(),
        detections_path.display(),
        table.annotators().len()
    );

    let bundle = config.run(&table).context("Report run failed")?;

    println!("{}", serde_json::to_string_pretty(&bundle)?);
    info!("Report run complete");

    Ok(())
}
