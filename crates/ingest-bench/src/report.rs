//! Run summary and its on-disk and console renderings.

use crate::{
    config::RunLabels, error::IngestError, metrics::MetricsRecorder, pipeline::IngestOutcome,
};
use ascii_table::AsciiTable;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::{
    fs::{create_dir_all, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

const MIB: f64 = 1024.0 * 1024.0;

/// Result of one benchmark run, serialized as the per-run JSON file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub db: String,
    pub mode: String,
    pub variant: String,
    pub language: String,
    pub total_rows: u64,
    pub total_time_sec: f64,
    pub rows_per_sec: f64,
    pub peak_memory_bytes: u64,
    pub peak_cpu_percent: f64,
    /// `memory_usage`, `memory_spikes`, `cpu_usage` and `cpu_spikes`.
    #[serde(flatten)]
    pub metrics: MetricsRecorder,
}

/// Scalar columns appended to the results CSV.
#[derive(Serialize)]
struct CsvLine<'a> {
    db: &'a str,
    mode: &'a str,
    variant: &'a str,
    language: &'a str,
    total_rows: u64,
    total_time_sec: f64,
    rows_per_sec: f64,
    peak_memory_bytes: u64,
    peak_cpu_percent: f64,
}

const CSV_COLUMNS: [&str; 9] = [
    "db",
    "mode",
    "variant",
    "language",
    "total_rows",
    "total_time_sec",
    "rows_per_sec",
    "peak_memory_bytes",
    "peak_cpu_percent",
];

impl RunSummary {
    pub fn new(labels: RunLabels, outcome: &IngestOutcome, metrics: MetricsRecorder) -> Self {
        let total_time_sec = outcome.elapsed.as_secs_f64();
        let rows_per_sec = if total_time_sec > 0.0 {
            outcome.rows_inserted as f64 / total_time_sec
        } else {
            0.0
        };

        Self {
            db: labels.db,
            mode: labels.mode,
            variant: labels.variant,
            language: labels.language,
            total_rows: outcome.rows_inserted,
            total_time_sec,
            rows_per_sec,
            peak_memory_bytes: metrics.peak_memory_bytes(),
            peak_cpu_percent: metrics.peak_cpu_percent(),
            metrics,
        }
    }

    /// Writes the summary as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<(), IngestError> {
        let report_error = |source| IngestError::Report {
            path: path.to_path_buf(),
            source,
        };

        create_parent_dir(path).map_err(report_error)?;
        let mut writer = BufWriter::new(File::create(path).map_err(report_error)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| report_error(io::Error::from(e)))?;
        writer.flush().map_err(report_error)
    }

    /// Appends one line to a results CSV file. The header line is written
    /// only when the file is created.
    pub fn append_csv(&self, path: &Path) -> Result<(), IngestError> {
        let report_error = |source| IngestError::ReportCsv {
            path: path.to_path_buf(),
            source,
        };

        create_parent_dir(path).map_err(|e| report_error(e.into()))?;
        let already_exists = path.is_file();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| report_error(e.into()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !already_exists {
            writer.write_record(CSV_COLUMNS).map_err(report_error)?;
        }
        writer
            .serialize(CsvLine {
                db: &self.db,
                mode: &self.mode,
                variant: &self.variant,
                language: &self.language,
                total_rows: self.total_rows,
                total_time_sec: self.total_time_sec,
                rows_per_sec: self.rows_per_sec,
                peak_memory_bytes: self.peak_memory_bytes,
                peak_cpu_percent: self.peak_cpu_percent,
            })
            .map_err(report_error)?;
        writer.flush().map_err(|e| report_error(e.into()))
    }

    pub fn completion_message(&self) -> String {
        format!(
            "Done! Inserted {} rows in {:.2}s ({} rows/sec)",
            self.total_rows.to_formatted_string(&Locale::en),
            self.total_time_sec,
            (self.rows_per_sec.round() as u64).to_formatted_string(&Locale::en),
        )
    }

    pub fn table(&self) -> String {
        const COLUMNS: [&str; 8] = [
            "DB",
            "Language",
            "Rows",
            "Elapsed",
            "Rows/sec",
            "Samples",
            "Peak RSS",
            "Peak CPU",
        ];

        let mut table = AsciiTable::default();
        table.set_max_width(160);
        for (idx, name) in COLUMNS.into_iter().enumerate() {
            table.column(idx).set_header(name);
        }

        table.format([[
            format!("{} {} {}", self.db, self.mode, self.variant),
            self.language.clone(),
            self.total_rows.to_formatted_string(&Locale::en),
            format!("{:.2}s", self.total_time_sec),
            format!("{:.0}", self.rows_per_sec),
            self.metrics.len().to_string(),
            format!("{:.2} MiB", self.peak_memory_bytes as f64 / MIB),
            format!("{:.2} %", self.peak_cpu_percent),
        ]])
    }
}

fn create_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}
