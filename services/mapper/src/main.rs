//! Mapper - Builds the KMFK monthly matrix from downloaded KOFIA exports
//!
//! Responsibilities:
//! - Discover the raw exports in the input directory
//! - Classify, resolve headers and synthesize KMFK codes per dataset
//! - Align everything onto the 60-month window and the column template
//! - Validate the 62x144 shape before writing DATA, META and the ZIP bundle
//!
//! Same inputs = same output, byte for byte, whatever order the files are read in.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mapper::config::Config;
use mapper::{Category, ColumnTemplate, Period, Pipeline, RunReport};

#[derive(Parser, Debug)]
#[command(name = "mapper", about = "Maps KOFIA fund exports onto the KMFK template")]
struct Args {
    /// Directory holding the raw exports (overrides KMFK_INPUT_DIR)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory for DATA/META/ZIP output (overrides KMFK_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON column template (overrides KMFK_TEMPLATE)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Last month of the window, YYYY-MM (overrides KMFK_WINDOW_END)
    #[arg(long, value_parser = parse_period)]
    window_end: Option<Period>,

    /// Dry run - validate but write nothing
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Skip the ZIP bundle
    #[arg(long, default_value = "false")]
    no_archive: bool,

    /// Write the built-in template as JSON to this path and exit
    #[arg(long)]
    export_template: Option<PathBuf>,
}

fn parse_period(raw: &str) -> std::result::Result<Period, String> {
    raw.parse().map_err(|e: mapper::MapError| e.to_string())
}

fn print_summary(report: &RunReport) {
    println!("Window: {} .. {}", report.window.start(), report.window.end());
    println!("Shape: {}", report.matrix.shape());
    println!("Datasets mapped: {}/{}", report.datasets.len(), Category::ALL.len());
    for (category, identity) in &report.datasets {
        println!("  {:<24} <- {}", category.to_string(), identity);
    }
    let missing = report.missing_categories();
    if !missing.is_empty() {
        println!("Missing categories (filled with N.A.):");
        for category in missing {
            println!("  {}", category);
        }
    }
    if !report.failures.is_empty() {
        println!("Dropped datasets ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.identity, failure.error);
        }
    }
    if !report.unmapped.is_empty() {
        println!("Unmapped columns ({}):", report.unmapped.len());
        for col in report.unmapped.iter().take(10) {
            println!("  {} [{}] '{}': {}", col.dataset, col.column, col.label, col.reason);
        }
        if report.unmapped.len() > 10 {
            println!("  ... and {} more", report.unmapped.len() - 10);
        }
    }
    println!("Fingerprint: {}", report.fingerprint);
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    if let Some(path) = &args.export_template {
        let json = ColumnTemplate::standard().to_json_string()?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Standard template written to {}", path.display());
        return Ok(());
    }

    let mut config = Config::from_env()?;
    if let Some(dir) = args.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if args.template.is_some() {
        config.template_path = args.template;
    }
    if args.window_end.is_some() {
        config.window_end = args.window_end;
    }
    if args.no_archive {
        config.archive = false;
    }

    println!("=== KMFK Mapper ===");
    println!("Input: {}", config.input_dir.display());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let template = match &config.template_path {
        Some(path) => ColumnTemplate::load(path)
            .with_context(|| format!("Failed to load template {}", path.display()))?,
        None => ColumnTemplate::standard(),
    };
    info!(entries = template.len(), "template loaded");

    let pipeline = Pipeline::new(template)
        .with_window_end(config.window_end)
        .with_header_scan_rows(config.header_scan_rows);

    if args.dry_run {
        let report = pipeline
            .run_directory(&config.input_dir)
            .context("Mapping run failed")?;
        print_summary(&report);
        println!("\nDry run - no files written");
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    let (report, written) = pipeline
        .execute_directory(&config.input_dir, &config.output_dir, today, config.archive)
        .context("Mapping run failed")?;
    print_summary(&report);

    println!("\nDATA: {}", written.data.display());
    println!("META: {}", written.metadata.display());
    if let Some(zip) = &written.archive {
        println!("ZIP:  {}", zip.display());
    }
    Ok(())
}
