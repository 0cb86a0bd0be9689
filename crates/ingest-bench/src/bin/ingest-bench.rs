use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ingest_bench::{logging::init_logging, run_benchmark, Config};

fn main() -> Result<()> {
    init_logging("[ingest]".cyan());
    let config = Config::parse();

    let summary = run_benchmark(&config).with_context(|| {
        format!(
            "benchmark run of '{}' into table '{}' failed",
            config.csv_file.display(),
            config.table
        )
    })?;

    println!("\n{}", summary.completion_message());
    println!("{}", summary.table());

    Ok(())
}
