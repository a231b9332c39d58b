//! Batched persistence of produced rows
//!
//! Rows accumulate in memory and are written to their table in one
//! transaction whenever the buffer reaches the batch size, plus once more at
//! the end of a run for whatever is left.

use crate::storage::{Record, Row, Storage, StorageResult};

/// Number of buffered rows that triggers a flush
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Buffers rows of type `R` and flushes them to `R::TABLE`
pub struct BatchSink<'s, S: Storage + ?Sized, R: Row> {
    storage: &'s mut S,
    buffer: Vec<R>,
    batch_size: usize,
    flushed: usize,
    flushes: usize,
}

impl<'s, S: Storage + ?Sized, R: Row> BatchSink<'s, S, R> {
    /// Creates a sink over `storage`; a batch size of 0 is treated as 1
    pub fn new(storage: &'s mut S, batch_size: usize) -> Self {
        Self {
            storage,
            buffer: Vec::new(),
            batch_size: batch_size.max(1),
            flushed: 0,
            flushes: 0,
        }
    }

    /// Creates the target table if needed
    pub fn create_table(&mut self) -> StorageResult<()> {
        self.storage.create_table(R::TABLE)
    }

    /// Buffers rows, flushing if the batch size is reached
    pub fn push(&mut self, rows: Vec<R>) -> StorageResult<()> {
        self.buffer.extend(rows);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the whole buffer in one transaction
    ///
    /// On failure nothing is written and the buffer is kept as is.
    pub fn flush(&mut self) -> StorageResult<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let records: Vec<Record> = self.buffer.iter().map(Row::to_record).collect();
        self.storage.insert_into(R::TABLE, &records)?;

        let written = self.buffer.len();
        self.buffer.clear();
        self.flushed += written;
        self.flushes += 1;

        tracing::debug!(
            "Flushed {} rows into {} ({} total)",
            written,
            R::TABLE,
            self.flushed
        );
        Ok(written)
    }

    /// Flushes the remainder and returns the total number of rows written
    pub fn finish(&mut self) -> StorageResult<usize> {
        self.flush()?;
        Ok(self.flushed)
    }

    /// Rows waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Rows written so far
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    /// Number of successful flushes so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageUrl, StorageError};

    /// Records every insert call; optionally fails them
    #[derive(Default)]
    struct RecordingStorage {
        inserts: Vec<usize>,
        fail: bool,
    }

    impl Storage for RecordingStorage {
        fn create_table(&mut self, _table: &str) -> StorageResult<()> {
            Ok(())
        }

        fn insert_into(&mut self, table: &str, records: &[Record]) -> StorageResult<()> {
            if self.fail {
                return Err(StorageError::UnknownTable(table.to_string()));
            }
            self.inserts.push(records.len());
            Ok(())
        }

        fn load_all(&self, _table: &str) -> StorageResult<Vec<Record>> {
            Ok(Vec::new())
        }

        fn preview(&self, _table: &str, _limit: usize) -> StorageResult<Vec<Record>> {
            Ok(Vec::new())
        }

        fn count_rows(&self, _table: &str) -> StorageResult<u64> {
            Ok(0)
        }
    }

    fn pages(n: usize) -> Vec<PageUrl> {
        (0..n)
            .map(|i| PageUrl {
                id: 1,
                page_url: format!("https://www.example.com/cat/?cid=1&page={}", i),
            })
            .collect()
    }

    #[test]
    fn test_flushes_at_threshold_and_on_finish() {
        let mut storage = RecordingStorage::default();
        {
            let mut sink = BatchSink::new(&mut storage, 3);
            sink.push(pages(2)).unwrap();
            assert_eq!(sink.buffered(), 2);
            sink.push(pages(1)).unwrap();
            assert_eq!(sink.buffered(), 0);
            sink.push(pages(1)).unwrap();
            assert_eq!(sink.finish().unwrap(), 4);
            assert_eq!(sink.flushes(), 2);
        }
        assert_eq!(storage.inserts, vec![3, 1]);
    }

    #[test]
    fn test_finish_on_empty_buffer_writes_nothing() {
        let mut storage = RecordingStorage::default();
        {
            let mut sink: BatchSink<_, PageUrl> = BatchSink::new(&mut storage, 10);
            sink.push(Vec::new()).unwrap();
            assert_eq!(sink.finish().unwrap(), 0);
        }
        assert!(storage.inserts.is_empty());
    }

    #[test]
    fn test_failed_flush_keeps_buffer() {
        let mut storage = RecordingStorage {
            fail: true,
            ..Default::default()
        };
        let mut sink = BatchSink::new(&mut storage, 2);

        assert!(sink.push(pages(2)).is_err());
        assert_eq!(sink.buffered(), 2);
        assert_eq!(sink.flushed(), 0);

        sink.storage.fail = false;
        assert_eq!(sink.finish().unwrap(), 2);
        assert_eq!(sink.buffered(), 0);
    }
}
