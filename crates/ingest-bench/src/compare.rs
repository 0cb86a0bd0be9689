//! Side-by-side comparison of the JSON summaries left by benchmark runs.
//!
//! Summaries may come from other implementations of the same benchmark, so
//! every field is optional: missing labels read as `?`, missing numbers as 0.

use crate::error::IngestError;
use ascii_table::AsciiTable;
use log::{debug, warn};
use num_format::{Locale, ToFormattedString};
use serde::Deserialize;
use std::{
    fs::{read_dir, File},
    io::BufReader,
    path::{Path, PathBuf},
};

const MIB: f64 = 1024.0 * 1024.0;

/// The subset of a results file needed for comparison.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultFile {
    db: Option<String>,
    mode: Option<String>,
    variant: Option<String>,
    language: Option<String>,
    total_rows: Option<f64>,
    total_time_sec: Option<f64>,
    rows_per_sec: Option<f64>,
    memory_usage: Option<Vec<f64>>,
    memory_spikes: Option<Vec<f64>>,
    cpu_usage: Option<Vec<f64>>,
    cpu_spikes: Option<Vec<f64>>,
}

/// One run, reduced to the figures compared across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunComparison {
    /// `<db>_<mode>_<variant>_<language>`.
    pub name: String,
    pub source: PathBuf,
    pub total_rows: u64,
    pub total_time_sec: f64,
    pub rows_per_sec: f64,
    pub peak_memory_bytes: f64,
    pub peak_cpu_percent: f64,
    pub samples: usize,
}

impl RunComparison {
    fn from_result(source: PathBuf, result: ResultFile) -> Self {
        let label = |value: Option<String>| value.unwrap_or_else(|| "?".to_string());
        let name = format!(
            "{}_{}_{}_{}",
            label(result.db),
            label(result.mode),
            label(result.variant),
            label(result.language)
        );

        let memory_usage = result.memory_usage.unwrap_or_default();
        let cpu_usage = result.cpu_usage.unwrap_or_default();

        Self {
            name,
            source,
            total_rows: result.total_rows.unwrap_or(0.0).max(0.0) as u64,
            total_time_sec: result.total_time_sec.unwrap_or(0.0),
            rows_per_sec: result.rows_per_sec.unwrap_or(0.0),
            peak_memory_bytes: peak(result.memory_spikes.unwrap_or_default(), &memory_usage),
            peak_cpu_percent: peak(result.cpu_spikes.unwrap_or_default(), &cpu_usage),
            samples: memory_usage.len(),
        }
    }
}

/// Largest spike value, or the largest raw sample when a file carries no
/// spike series.
fn peak(spikes: Vec<f64>, usage: &[f64]) -> f64 {
    let series: &[f64] = if spikes.is_empty() { usage } else { &spikes };
    series.iter().copied().fold(0.0, f64::max)
}

/// Loads every `*.json` file in `dir`, slowest run first.
///
/// Files that cannot be read or parsed are logged and skipped.
pub fn load_results(dir: &Path) -> Result<Vec<RunComparison>, IngestError> {
    let dir_error = |source| IngestError::ResultsDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut runs = Vec::with_capacity(paths.len());
    for path in paths {
        let parsed = File::open(&path)
            .map_err(serde_json::Error::io)
            .and_then(|file| serde_json::from_reader::<_, ResultFile>(BufReader::new(file)));
        match parsed {
            Ok(result) => {
                debug!("loaded '{}'", path.display());
                runs.push(RunComparison::from_result(path, result));
            }
            Err(e) => warn!("skipping '{}': {e}", path.display()),
        }
    }

    runs.sort_by(|a, b| b.total_time_sec.total_cmp(&a.total_time_sec));
    Ok(runs)
}

/// Renders `runs` as a table, one row per run in the given order.
pub fn comparison_table(runs: &[RunComparison]) -> String {
    let mut table = AsciiTable::default();
    table.set_max_width(200);
    for (idx, name) in ["Run", "Rows", "Elapsed", "Rows/sec", "Samples", "Peak RSS", "Peak CPU"]
        .into_iter()
        .enumerate()
    {
        table.column(idx).set_header(name);
    }

    let rows: Vec<[String; 7]> = runs
        .iter()
        .map(|run| {
            [
                run.name.clone(),
                run.total_rows.to_formatted_string(&Locale::en),
                format!("{:.2}s", run.total_time_sec),
                (run.rows_per_sec.round() as u64).to_formatted_string(&Locale::en),
                run.samples.to_string(),
                format!("{:.1} MiB", run.peak_memory_bytes / MIB),
                format!("{:.2} %", run.peak_cpu_percent),
            ]
        })
        .collect();
    table.format(rows)
}

#[cfg(test)]
mod test {
    use super::{comparison_table, load_results};
    use crate::{
        config::RunLabels,
        error::IngestError,
        metrics::{MetricSample, MetricsRecorder},
        pipeline::IngestOutcome,
        report::RunSummary,
    };
    use pretty_assertions::assert_eq;
    use std::{fs, time::Duration};

    fn write_rust_run(dir: &std::path::Path) {
        let mut metrics = MetricsRecorder::new();
        for memory_bytes in [8 << 20, 16 << 20, 12 << 20] {
            metrics.push(MetricSample {
                memory_bytes,
                cpu_percent: 40.0,
            });
        }
        let outcome = IngestOutcome {
            rows_read: 3000,
            rows_inserted: 3000,
            elapsed: Duration::from_secs(2),
            ..IngestOutcome::default()
        };
        RunSummary::new(RunLabels::default(), &outcome, metrics)
            .write_json(&dir.join("postgres_boring_a_plain_rust.json"))
            .unwrap();
    }

    #[test]
    fn compares_runs_slowest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_rust_run(dir.path());
        fs::write(
            dir.path().join("mysql_boring_a_plain_python.json"),
            r#"{"db": "MySQL", "mode": "Boring", "variant": "Plain", "language": "Python",
                "total_rows": 3000, "total_time_sec": 6.0, "rows_per_sec": 500.0,
                "memory_usage": [1048576, 3145728.0, 2097152], "cpu_usage": [12.5, 99.0]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let runs = load_results(dir.path()).unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].name, "MySQL_Boring_Plain_Python");
        assert_eq!(runs[0].total_time_sec, 6.0);
        assert_eq!(runs[0].peak_memory_bytes, 3.0 * 1024.0 * 1024.0);
        assert_eq!(runs[0].peak_cpu_percent, 99.0);
        assert_eq!(runs[0].samples, 3);

        assert_eq!(runs[1].name, "PostgreSQL_Boring_Plain_Rust");
        assert_eq!(runs[1].total_rows, 3000);
        assert_eq!(runs[1].rows_per_sec, 1500.0);
        assert_eq!(runs[1].peak_memory_bytes, (16u64 << 20) as f64);

        let table = comparison_table(&runs);
        assert!(table.contains("MySQL_Boring_Plain_Python"));
        assert!(table.contains("3.0 MiB"));
        assert!(table.contains("16.0 MiB"));
        assert!(table.contains("1,500"));
    }

    #[test]
    fn missing_fields_use_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("partial.json"),
            r#"{"db": "MySQL", "total_time_sec": null}"#,
        )
        .unwrap();

        let runs = load_results(dir.path()).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "MySQL_?_?_?");
        assert_eq!(runs[0].total_time_sec, 0.0);
        assert_eq!(runs[0].peak_memory_bytes, 0.0);
        assert_eq!(runs[0].samples, 0);
    }

    #[test]
    fn empty_directory_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_results(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        match load_results(&missing) {
            Err(IngestError::ResultsDir { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected a results directory error, got {other:?}"),
        }
    }
}
