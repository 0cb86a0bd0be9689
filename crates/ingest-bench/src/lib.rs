//! Bulk CSV-to-database ingestion benchmark.
//!
//! A CSV file of products is streamed row by row, grouped into fixed-size
//! batches and written to a PostgreSQL table with one statement per batch.
//! After every batch the process's resident memory and CPU usage are sampled;
//! at the end of the input a [`RunSummary`] with throughput and the full
//! metric series is written as JSON.
//!
//! ```text
//! CsvRowReader ──> Batcher ──> BatchSink::insert_batch ──> MetricsRecorder::record
//!                                                               │
//!                                                        RunSummary (JSON/CSV)
//! ```
//!
//! The [`compare`] module reads a directory of such summaries, possibly from
//! other implementations of the benchmark, and tabulates them side by side.

pub mod batch;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod product;
pub mod report;
pub mod row;
pub mod sink;

#[cfg(test)]
mod test;

pub use compare::{comparison_table, load_results, RunComparison};
pub use config::{CompareConfig, Config, RunLabels};
pub use error::IngestError;
pub use metrics::{MetricSample, MetricsRecorder, ProcessProbe, ResourceProbe};
pub use pipeline::{run_benchmark, run_with, IngestOptions, IngestOutcome, Ingestor};
pub use product::Product;
pub use report::RunSummary;
pub use row::{CsvRowReader, Row};
pub use sink::{BatchSink, PostgresSink};
