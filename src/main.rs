//! UPI Report - monthly UPI transaction metrics report generator
//!
//! Loads the monthly UPI CSV, derives yearly, COVID-period, per-bank and
//! seasonal views, and writes them as a chart deck.
//!
//! Usage:
//!   upi_report [config.json]

mod charts;
mod config;
mod data;
mod ppt;
mod report;
mod stats;

use anyhow::{Context, Result};
use config::ReportConfig;
use data::DataLoader;
use log::{info, warn};
use ppt::PptGenerator;
use report::{Analysis, ReportDocument};
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = ReportConfig::load(config_path.as_deref())
        .context("Failed to load report configuration")?;

    let cleaned = DataLoader::load_csv(&config.input_path)
        .with_context(|| format!("Failed to load {}", config.input_path.display()))?;
    if cleaned.is_empty() {
        warn!("{} has a header but no data rows", config.input_path.display());
    }

    let analysis = Analysis::run(&cleaned, &config.covid);
    let document = ReportDocument::build(&analysis);
    let slides = document
        .render(config.chart_width, config.chart_height)
        .context("Failed to render report charts")?;

    PptGenerator::generate(&slides, &config.output_path, &document.title)
        .with_context(|| format!("Failed to write {}", config.output_path.display()))?;
    info!("Report written to {}", config.output_path.display());

    if config.open_when_done {
        if let Err(e) = open::that(&config.output_path) {
            warn!("Could not open {}: {}", config.output_path.display(), e);
        }
    }
    Ok(())
}
