//! Snapshot transactions over a sub-range of a [`Mapping`].
//!
//! Writes land in a private heap copy of the range; the live mapping is only
//! touched by the single bulk copy in [`Transaction::commit`]. There is no
//! write-ahead log: durability still depends on [`Mapping::sync`].

use crate::errors::{MmapError, Result};
use crate::io::{copy_in, copy_out, ReadAt, WriteAt};
use crate::mapping::Mapping;
use crate::utils::{len_as_offset, offset_in};

/// An isolated copy of `[offset, offset + len)` of a mapping.
///
/// Offsets passed to [`Transaction::read_at`] and [`Transaction::write_at`] are
/// the same absolute offsets the parent mapping uses. The transaction borrows
/// the mapping mutably, so nothing else can touch it until the transaction is
/// gone.
///
/// Finish with [`Transaction::commit`], [`Transaction::flush`] or
/// [`Transaction::rollback`]. A transaction dropped while still open rolls back.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use mmap_txn::{MapMode, Mapping};
///
/// let file = File::options().read(true).write(true).open("data.bin")?;
/// let mut map = Mapping::builder().mode(MapMode::ReadWrite).map(&file)?;
/// let mut tx = map.begin(16, 8)?;
/// tx.write_at(&[1, 2, 3, 4], 16)?;
/// tx.commit()?;
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
#[derive(Debug)]
pub struct Transaction<'m> {
    mapping: &'m mut Mapping,
    start: i64,
    end: i64,
    // None once committed or rolled back
    snapshot: Option<Vec<u8>>,
}

impl Mapping {
    /// Begin a transaction over `[offset, offset + length)`.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` if the mapping is closed,
    /// `MmapError::IllegalOperation` if it is not writable,
    /// `MmapError::InvalidOffset` if `offset` is outside `[0, len)` and
    /// `MmapError::InvalidLength` if `length` is zero or runs past the end.
    pub fn begin(&mut self, offset: i64, length: usize) -> Result<Transaction<'_>> {
        let memory = self.memory()?;
        if !self.writable() {
            return Err(MmapError::IllegalOperation("transaction"));
        }
        let at = offset_in(offset, 0, len_as_offset(memory.len()))?;
        if length == 0 || length > memory.len() - at {
            return Err(MmapError::InvalidLength(length));
        }
        let snapshot = memory[at..at + length].to_vec();
        log::debug!("begin transaction over {offset}..+{length}");
        Ok(Transaction {
            mapping: self,
            start: offset,
            end: offset + len_as_offset(length),
            snapshot: Some(snapshot),
        })
    }
}

impl Transaction<'_> {
    /// First offset covered by the transaction.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.start
    }

    /// Offset one past the last byte covered by the transaction.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Snapshot length in bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Transactions always cover at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Whether the transaction was committed or rolled back.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Read from the snapshot; see [`ReadAt`].
    ///
    /// # Errors
    ///
    /// Returns `MmapError::TransactionClosed` after commit or rollback, and
    /// `MmapError::InvalidOffset` when `offset` is outside the transaction range.
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        let snapshot = self.snapshot.as_ref().ok_or(MmapError::TransactionClosed)?;
        let at = offset_in(offset, self.start, self.end)?;
        Ok(copy_out(snapshot, at, buf))
    }

    /// Write into the snapshot; see [`WriteAt`].
    ///
    /// # Errors
    ///
    /// Returns `MmapError::TransactionClosed` after commit or rollback, and
    /// `MmapError::InvalidOffset` when `offset` is outside the transaction range.
    pub fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        let snapshot = self.snapshot.as_mut().ok_or(MmapError::TransactionClosed)?;
        let at = offset_in(offset, self.start, self.end)?;
        Ok(copy_in(snapshot, at, buf))
    }

    /// Copy the snapshot into the live mapping and close the transaction.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::TransactionClosed` if already finished,
    /// `MmapError::Closed` if the mapping went away, and
    /// `MmapError::PartialCommit` if fewer bytes than the snapshot were copied.
    pub fn commit(&mut self) -> Result<()> {
        let snapshot = self.snapshot.as_ref().ok_or(MmapError::TransactionClosed)?;
        let memory = self.mapping.memory_mut()?;
        let at = offset_in(self.start, 0, len_as_offset(memory.len()))?;
        let n = copy_in(memory, at, snapshot);
        if n < snapshot.len() {
            return Err(MmapError::PartialCommit { num_bytes: n });
        }
        self.snapshot = None;
        log::debug!("committed transaction over {}..{}", self.start, self.end);
        Ok(())
    }

    /// [`Transaction::commit`], then [`Mapping::sync`] on the parent.
    ///
    /// # Errors
    ///
    /// Any error of `commit` or `sync`.
    pub fn flush(&mut self) -> Result<()> {
        self.commit()?;
        self.mapping.sync()
    }

    /// Discard the snapshot and close the transaction.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::TransactionClosed` if already finished.
    pub fn rollback(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .ok_or(MmapError::TransactionClosed)?;
        log::debug!("rolled back transaction over {}..{}", self.start, self.end);
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.snapshot.take().is_some() {
            log::warn!(
                "transaction over {}..{} dropped while open; rolled back",
                self.start,
                self.end
            );
        }
    }
}

impl ReadAt for Transaction<'_> {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        Transaction::read_at(self, buf, offset)
    }
}

impl WriteAt for Transaction<'_> {
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        Transaction::write_at(self, buf, offset)
    }
}
