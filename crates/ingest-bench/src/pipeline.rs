//! The read → batch → insert → sample loop.
//!
//! Everything runs on the calling thread: a flush (insert plus metrics
//! sample) completes before the next row is read, so batches reach the sink
//! in input order and never overlap.

use crate::{
    batch::Batcher,
    config::Config,
    error::IngestError,
    metrics::{MetricsRecorder, ProcessProbe, ResourceProbe},
    product::Product,
    report::RunSummary,
    row::{CsvRowReader, Row},
    sink::{BatchSink, PostgresSink},
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use num_format::{Locale, ToFormattedString};
use std::{
    io::Read,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: NonZeroUsize,
    pub progress: bool,
    /// Emit an `info!` line every this many inserted rows.
    pub log_every: u64,
}

impl From<&Config> for IngestOptions {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            progress: config.progress,
            log_every: config.log_every,
        }
    }
}

/// Counters collected by [`Ingestor::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Rows successfully parsed from the input.
    pub rows_read: u64,
    /// Rows reported as written by the sink, summed over all batches.
    pub rows_inserted: u64,
    /// Records that could not be decoded and were dropped.
    pub rows_skipped: u64,
    /// Rows written by each flush, in flush order.
    pub inserted_per_batch: Vec<u64>,
    /// Wall-clock time from the first read to the last flush.
    pub elapsed: Duration,
}

impl IngestOutcome {
    pub fn flushes(&self) -> usize {
        self.inserted_per_batch.len()
    }
}

/// Drives rows from a reader into a sink, one batch at a time, sampling
/// process metrics after every flush.
pub struct Ingestor<'a, S: ?Sized, P: ?Sized> {
    sink: &'a mut S,
    probe: &'a mut P,
    options: IngestOptions,
}

impl<'a, S, P> Ingestor<'a, S, P>
where
    S: BatchSink + ?Sized,
    P: ResourceProbe + ?Sized,
{
    pub fn new(sink: &'a mut S, probe: &'a mut P, options: IngestOptions) -> Self {
        Self {
            sink,
            probe,
            options,
        }
    }

    /// Consumes `rows` to the end, appending one metric sample to `metrics`
    /// per non-empty flush.
    pub fn run<R: Read>(
        &mut self,
        mut rows: CsvRowReader<R>,
        metrics: &mut MetricsRecorder,
    ) -> IngestOutcome {
        let progress = progress_bar(self.options.progress, rows.input_len());
        let mut batcher = Batcher::new(self.options.batch_size);
        let mut outcome = IngestOutcome::default();
        let mut last_log = 0;

        let start = Instant::now();

        while let Some(row) = rows.next() {
            match row {
                Ok(row) => {
                    outcome.rows_read += 1;
                    if let Some(batch) = batcher.push(row) {
                        self.flush(&batch, metrics, &mut outcome);
                        progress.set_position(rows.bytes_read());
                        progress.set_message(rows_message(outcome.rows_inserted));
                        if outcome.rows_inserted - last_log >= self.options.log_every {
                            let inserted = outcome.rows_inserted;
                            progress.suspend(|| info!("Inserted {inserted} rows"));
                            last_log = inserted;
                        }
                    }
                }
                Err(e) if e.is_io_error() => {
                    error!("error reading input, ending the stream early: {e}");
                }
                Err(e) => {
                    outcome.rows_skipped += 1;
                    warn!("skipping unreadable record: {e}");
                }
            }
        }

        if let Some(batch) = batcher.finish() {
            self.flush(&batch, metrics, &mut outcome);
        }

        outcome.elapsed = start.elapsed();

        progress.set_position(rows.bytes_read());
        progress.finish_with_message(rows_message(outcome.rows_inserted));

        outcome
    }

    fn flush(&mut self, batch: &[Row], metrics: &mut MetricsRecorder, outcome: &mut IngestOutcome) {
        let inserted = flush_batch(&mut *self.sink, batch);
        outcome.rows_inserted += inserted;
        outcome.inserted_per_batch.push(inserted);
        metrics.record(&mut *self.probe);
    }
}

/// Converts `batch` into products and writes them with one statement.
///
/// A failed insert is logged and counts as zero rows; it is not retried.
pub fn flush_batch<S: BatchSink + ?Sized>(sink: &mut S, batch: &[Row]) -> u64 {
    let products: Vec<Product> = batch.iter().map(Product::from_row).collect();

    match sink.insert_batch(&products) {
        Ok(inserted) => {
            if inserted < products.len() as u64 {
                debug!(
                    "skipped {} conflicting rows in a batch of {}",
                    products.len() as u64 - inserted,
                    products.len()
                );
            }
            inserted
        }
        Err(e) => {
            error!("batch insert of {} rows failed: {e}", products.len());
            0
        }
    }
}

/// Prepares the sink, ingests every row and writes the reports configured in
/// `config`.
pub fn run_with<R, S, P>(
    config: &Config,
    rows: CsvRowReader<R>,
    sink: &mut S,
    probe: &mut P,
) -> Result<RunSummary, IngestError>
where
    R: Read,
    S: BatchSink + ?Sized,
    P: ResourceProbe + ?Sized,
{
    sink.prepare()?;

    let mut metrics = MetricsRecorder::new();
    let outcome = Ingestor::new(sink, probe, IngestOptions::from(config)).run(rows, &mut metrics);
    if outcome.rows_skipped > 0 {
        warn!("{} unreadable records were skipped", outcome.rows_skipped);
    }
    debug!(
        "read {} rows, inserted {} in {} batches",
        outcome.rows_read,
        outcome.rows_inserted,
        outcome.flushes()
    );

    let summary = RunSummary::new(config.labels.clone(), &outcome, metrics);
    summary.write_json(&config.results_file)?;
    info!("results written to '{}'", config.results_file.display());

    if let Some(csv) = &config.output_csv {
        summary.append_csv(csv)?;
    }

    Ok(summary)
}

/// Runs the benchmark against the configured Postgres database.
///
/// The input file is opened before connecting, so a missing file aborts the
/// run without touching the database.
pub fn run_benchmark(config: &Config) -> Result<RunSummary, IngestError> {
    let rows = CsvRowReader::open(&config.csv_file)?;
    info!(
        "ingesting '{}' into table '{}' in batches of {}",
        config.csv_file.display(),
        config.table,
        config.batch_size
    );

    let mut sink = PostgresSink::connect(&config.database_url, &config.table)?;
    let mut probe = ProcessProbe::new();

    run_with(config, rows, &mut sink, &mut probe)
}

fn progress_bar(enabled: bool, input_len: Option<u64>) -> ProgressBar {
    let (progress, template) = match (enabled, input_len) {
        (false, _) => return ProgressBar::hidden(),
        (true, Some(len)) => (
            ProgressBar::new(len),
            "{bytes} / {total_bytes} [{wide_bar}] {percent}% {msg} {eta}",
        ),
        (true, None) => (ProgressBar::new_spinner(), "{spinner} {bytes} {msg}"),
    };

    match ProgressStyle::with_template(template) {
        Ok(style) => progress.set_style(style.progress_chars("=>-")),
        Err(e) => debug!("invalid progress template: {e}"),
    }
    progress
}

fn rows_message(rows: u64) -> String {
    format!("{} rows", rows.to_formatted_string(&Locale::en))
}
