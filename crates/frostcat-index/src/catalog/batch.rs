//! Transactions committed every N statements

use rusqlite::{Connection, Params, Transaction};

/// Runs inserts inside transactions of at most `batch_size` statements
///
/// A batch that is dropped before [`BatchWriter::finish`] rolls back; batches
/// committed before it stay.
pub(crate) struct BatchWriter<'c> {
    conn: &'c Connection,
    tx: Option<Transaction<'c>>,
    batch_size: usize,
    pending: usize,
    written: usize,
}

impl<'c> BatchWriter<'c> {
    pub(crate) fn new(conn: &'c Connection, batch_size: usize) -> Self {
        Self {
            conn,
            tx: None,
            batch_size: batch_size.max(1),
            pending: 0,
            written: 0,
        }
    }

    /// Execute one statement, committing when the batch is full
    pub(crate) fn execute<P: Params>(&mut self, sql: &str, params: P) -> rusqlite::Result<()> {
        if self.tx.is_none() {
            self.tx = Some(self.conn.unchecked_transaction()?);
        }
        if let Some(tx) = &self.tx {
            tx.prepare_cached(sql)?.execute(params)?;
        }

        self.pending += 1;
        self.written += 1;
        if self.pending >= self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> rusqlite::Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()?;
        }
        self.pending = 0;
        Ok(())
    }

    /// Commit the open batch and return the number of statements executed
    pub(crate) fn finish(mut self) -> rusqlite::Result<usize> {
        self.commit()?;
        Ok(self.written)
    }
}
