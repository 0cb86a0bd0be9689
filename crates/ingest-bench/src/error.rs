use std::{io, path::PathBuf};
use thiserror::Error as ThisError;

/// Errors produced by the ingestion pipeline.
///
/// Only the variants raised before the timed section starts (opening the
/// input, preparing the table) and the final report write abort a run.
/// Everything raised while streaming is logged and absorbed by the pipeline.
#[derive(Debug, ThisError)]
pub enum IngestError {
    #[error("unable to open CSV file '{}': {source}", .path.display())]
    OpenCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unable to read CSV header row: {0}")]
    CsvHeader(#[source] csv::Error),

    #[error("postgres error while {action}: {source}")]
    Database {
        action: String,
        #[source]
        source: postgres::Error,
    },

    #[error("unable to encode batch as JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unable to write report '{}': {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write CSV report '{}': {source}", .path.display())]
    ReportCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unable to list results directory '{}': {source}", .path.display())]
    ResultsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[cfg(test)]
    #[error("simulated sink failure while {0}")]
    SinkFailure(&'static str),
}

impl IngestError {
    pub(crate) fn database(action: impl Into<String>, source: postgres::Error) -> Self {
        Self::Database {
            action: action.into(),
            source,
        }
    }
}
