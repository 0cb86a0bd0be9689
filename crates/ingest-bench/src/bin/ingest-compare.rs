use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ingest_bench::{comparison_table, load_results, logging::init_logging, CompareConfig};
use log::info;

fn main() -> Result<()> {
    init_logging("[compare]".magenta());
    let config = CompareConfig::parse();

    let runs = load_results(&config.results_dir).with_context(|| {
        format!(
            "unable to compare results in '{}'",
            config.results_dir.display()
        )
    })?;

    if runs.is_empty() {
        info!("no result files found in '{}'", config.results_dir.display());
        return Ok(());
    }

    println!("{}", comparison_table(&runs));
    Ok(())
}
