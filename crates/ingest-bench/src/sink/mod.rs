use crate::{error::IngestError, product::Product};

mod postgres;

pub use self::postgres::{PostgresSink, RawQueries};

/// Destination of flushed batches.
pub trait BatchSink {
    /// Makes sure the destination table exists and is empty.
    fn prepare(&mut self) -> Result<(), IngestError>;

    /// Writes `products` with a single bulk statement.
    ///
    /// Rows whose primary key already exists, in the table or earlier in the
    /// same batch, are skipped. Returns the number of rows actually written.
    fn insert_batch(&mut self, products: &[Product]) -> Result<u64, IngestError>;
}
