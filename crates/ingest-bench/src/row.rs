//! Streaming CSV reader producing header-keyed rows.

use crate::error::IngestError;
use csv::{Reader as CsvReader, ReaderBuilder as CsvReaderBuilder, StringRecord, Trim};
use std::{fs::File, io::Read, path::Path, sync::Arc};

/// One CSV record keyed by the file's header names.
///
/// The header record is shared by every row of a file. Rows with fewer
/// fields than headers are kept as-is; the missing columns read as `None`.
#[derive(Debug, Clone)]
pub struct Row {
    headers: Arc<StringRecord>,
    record: StringRecord,
}

impl Row {
    pub fn new(headers: Arc<StringRecord>, record: StringRecord) -> Self {
        Self { headers, record }
    }

    /// Value of the first column whose header equals `name`, ignoring ASCII
    /// case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|index| self.record.get(index))
    }

    /// Value for the first alias that names a column of this row.
    pub fn lookup(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| self.get(alias))
    }

    /// Number of fields actually present in the record.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

/// Lazy, single-pass sequence of [`Row`]s read from a CSV source.
///
/// The first record is consumed as the header row when the reader is built.
/// Once the underlying reader reports an I/O error the sequence ends.
pub struct CsvRowReader<R> {
    reader: CsvReader<R>,
    headers: Arc<StringRecord>,
    input_len: Option<u64>,
    done: bool,
}

impl CsvRowReader<File> {
    /// Opens `path` and reads its header row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let reader = builder()
            .from_path(path)
            .map_err(|source| IngestError::OpenCsv {
                path: path.to_path_buf(),
                source,
            })?;
        let input_len = reader.get_ref().metadata().ok().map(|m| m.len());

        let mut rows = Self::with_csv_reader(reader)?;
        rows.input_len = input_len;
        Ok(rows)
    }
}

impl<R: Read> CsvRowReader<R> {
    pub fn from_reader(reader: R) -> Result<Self, IngestError> {
        Self::with_csv_reader(builder().from_reader(reader))
    }

    fn with_csv_reader(mut reader: CsvReader<R>) -> Result<Self, IngestError> {
        let headers = reader.headers().map_err(IngestError::CsvHeader)?.clone();

        Ok(Self {
            reader,
            headers: Arc::new(headers),
            input_len: None,
            done: false,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Total size of the input in bytes, when reading from a file.
    pub fn input_len(&self) -> Option<u64> {
        self.input_len
    }

    /// Byte offset of the reader within the input.
    pub fn bytes_read(&self) -> u64 {
        self.reader.position().byte()
    }
}

impl<R: Read> Iterator for CsvRowReader<R> {
    type Item = Result<Row, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(Row::new(self.headers.clone(), record))),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(error) => {
                if error.is_io_error() {
                    self.done = true;
                }
                Some(Err(error))
            }
        }
    }
}

fn builder() -> CsvReaderBuilder {
    let mut builder = CsvReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(Trim::Headers);
    builder
}
