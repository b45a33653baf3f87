//! Typed segments bound to a mapping or to one of its transactions.

use std::ops::{Deref, DerefMut};

use crate::errors::Result;
use crate::mapping::Mapping;
use crate::segment::{Segment, Value};
use crate::transaction::Transaction;

/// A [`Segment`] over a [`Mapping`] it owns.
///
/// Derefs to the mapping, so byte access, `lock`, `sync` and `close` are
/// available directly.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use mmap_txn::{MapMode, MappedSegment, Mapping, Value};
///
/// let file = File::options().read(true).write(true).open("counters.bin")?;
/// let map = Mapping::builder().mode(MapMode::ReadWrite).map(&file)?;
/// let mut seg = MappedSegment::new(map);
///
/// let mut tx = seg.begin(0, 16)?;
/// tx.inc(0, &[Value::U64(1), Value::U64(10)])?;
/// tx.commit()?;
/// drop(tx);
///
/// seg.close()?;
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
#[derive(Debug)]
pub struct MappedSegment {
    mapping: Mapping,
}

impl MappedSegment {
    /// Bind a segment to `mapping`.
    #[must_use]
    pub fn new(mapping: Mapping) -> Self {
        Self { mapping }
    }

    /// Give back the mapping.
    #[must_use]
    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }

    /// A borrowed [`Segment`] over the mapping.
    pub fn segment(&mut self) -> Segment<&mut Mapping> {
        Segment::new(&mut self.mapping)
    }

    /// See [`Segment::get`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::get`].
    pub fn get(&self, offset: i64, slots: &mut [Value]) -> Result<i64> {
        Segment::new(&self.mapping).get(offset, slots)
    }

    /// See [`Segment::get_widths`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::get_widths`].
    pub fn get_widths(&self, offset: i64, widths: &[usize]) -> Result<Vec<Value>> {
        Segment::new(&self.mapping).get_widths(offset, widths)
    }

    /// See [`Segment::set`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::set`].
    pub fn set(&mut self, offset: i64, values: &[Value]) -> Result<i64> {
        self.segment().set(offset, values)
    }

    /// See [`Segment::inc`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::inc`].
    pub fn inc(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.segment().inc(offset, deltas)
    }

    /// See [`Segment::dec`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::dec`].
    pub fn dec(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.segment().dec(offset, deltas)
    }

    /// Begin a transaction with the same typed vocabulary.
    ///
    /// # Errors
    ///
    /// Any error of [`Mapping::begin`].
    pub fn begin(&mut self, offset: i64, length: usize) -> Result<MappedSegmentTransaction<'_>> {
        let tx = self.mapping.begin(offset, length)?;
        Ok(MappedSegmentTransaction { tx })
    }
}

impl Deref for MappedSegment {
    type Target = Mapping;

    fn deref(&self) -> &Mapping {
        &self.mapping
    }
}

impl DerefMut for MappedSegment {
    fn deref_mut(&mut self) -> &mut Mapping {
        &mut self.mapping
    }
}

/// A [`Segment`] over a [`Transaction`].
///
/// Derefs to the transaction for `commit`, `flush`, `rollback` and byte access.
#[derive(Debug)]
pub struct MappedSegmentTransaction<'m> {
    tx: Transaction<'m>,
}

impl<'m> MappedSegmentTransaction<'m> {
    /// Bind a segment to an already started transaction.
    #[must_use]
    pub fn new(tx: Transaction<'m>) -> Self {
        Self { tx }
    }

    /// Give back the transaction.
    #[must_use]
    pub fn into_transaction(self) -> Transaction<'m> {
        self.tx
    }

    /// A borrowed [`Segment`] over the transaction.
    pub fn segment(&mut self) -> Segment<&mut Transaction<'m>> {
        Segment::new(&mut self.tx)
    }

    /// See [`Segment::get`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::get`].
    pub fn get(&self, offset: i64, slots: &mut [Value]) -> Result<i64> {
        Segment::new(&self.tx).get(offset, slots)
    }

    /// See [`Segment::get_widths`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::get_widths`].
    pub fn get_widths(&self, offset: i64, widths: &[usize]) -> Result<Vec<Value>> {
        Segment::new(&self.tx).get_widths(offset, widths)
    }

    /// See [`Segment::set`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::set`].
    pub fn set(&mut self, offset: i64, values: &[Value]) -> Result<i64> {
        self.segment().set(offset, values)
    }

    /// See [`Segment::inc`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::inc`].
    pub fn inc(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.segment().inc(offset, deltas)
    }

    /// See [`Segment::dec`].
    ///
    /// # Errors
    ///
    /// Any error of [`Segment::dec`].
    pub fn dec(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.segment().dec(offset, deltas)
    }
}

impl<'m> Deref for MappedSegmentTransaction<'m> {
    type Target = Transaction<'m>;

    fn deref(&self) -> &Transaction<'m> {
        &self.tx
    }
}

impl<'m> DerefMut for MappedSegmentTransaction<'m> {
    fn deref_mut(&mut self) -> &mut Transaction<'m> {
        &mut self.tx
    }
}
