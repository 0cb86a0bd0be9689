//! Test doubles for the pipeline's database and metrics seams.


pub use mock_probe::MockProbe;
pub use mock_sink::MockSink;

use std::io::{self, Read};

/// A products CSV with `rows` records and ids `1..=rows`.
pub fn csv_with_rows(rows: usize) -> String {
    let mut data = String::from("Id,Name,Price,Stock,Internal ID\n");
    for id in 1..=rows {
        data.push_str(&format!("{id},product {id},{}.5,{},{}\n", id % 100, id % 7, id * 10));
    }
    data
}

/// Yields `data` and then fails every further read with an I/O error.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos..];
        if remaining.is_empty() {
            return Err(io::Error::other("device disconnected"));
        }
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}
