//! Positional codec for fixed-width big-endian integers over a byte store.
//!
//! A layout is nothing more than an ordered list of widths: no header, no type
//! tags. Readers must use the same operand order and widths the writer used.

use crate::errors::{MmapError, Result};
use crate::io::{ReadAt, WriteAt};
use crate::utils::len_as_offset;

/// A fixed-width unsigned integer operand.
///
/// The variant decides the encoded width; the payload is the value (for
/// [`Segment::set`]), the delta (for [`Segment::inc`] / [`Segment::dec`]) or is
/// overwritten with the decoded value (for [`Segment::get`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// 1 byte.
    U8(u8),
    /// 2 bytes, big-endian.
    U16(u16),
    /// 4 bytes, big-endian.
    U32(u32),
    /// 8 bytes, big-endian.
    U64(u64),
}

impl Value {
    /// Encoded width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Value::U8(_) => 1,
            Value::U16(_) => 2,
            Value::U32(_) => 4,
            Value::U64(_) => 8,
        }
    }

    /// A zero of the given byte width, if the codec supports it.
    #[must_use]
    pub const fn zero_of_width(width: usize) -> Option<Value> {
        match width {
            1 => Some(Value::U8(0)),
            2 => Some(Value::U16(0)),
            4 => Some(Value::U32(0)),
            8 => Some(Value::U64(0)),
            _ => None,
        }
    }

    /// The value widened to `u64`.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        match self {
            Value::U8(v) => v as u64,
            Value::U16(v) => v as u64,
            Value::U32(v) => v as u64,
            Value::U64(v) => v,
        }
    }

    /// Same variant as `self`, holding `bits` truncated to its width.
    #[allow(clippy::cast_possible_truncation)]
    const fn with_bits(self, bits: u64) -> Value {
        match self {
            Value::U8(_) => Value::U8(bits as u8),
            Value::U16(_) => Value::U16(bits as u16),
            Value::U32(_) => Value::U32(bits as u32),
            Value::U64(_) => Value::U64(bits),
        }
    }

    fn encode(self, buf: &mut [u8; 8]) -> &[u8] {
        match self {
            Value::U8(v) => buf[..1].copy_from_slice(&[v]),
            Value::U16(v) => buf[..2].copy_from_slice(&v.to_be_bytes()),
            Value::U32(v) => buf[..4].copy_from_slice(&v.to_be_bytes()),
            Value::U64(v) => buf.copy_from_slice(&v.to_be_bytes()),
        }
        &buf[..self.width()]
    }

    /// Decode `bytes` (exactly `self.width()` long) into the same variant.
    fn decode(self, bytes: &[u8]) -> Value {
        let mut wide = [0u8; 8];
        wide[8 - bytes.len()..].copy_from_slice(bytes);
        self.with_bits(u64::from_be_bytes(wide))
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

fn advance(offset: i64, width: usize) -> Result<i64> {
    offset
        .checked_add(len_as_offset(width))
        .ok_or(MmapError::InvalidOffset(offset))
}

/// Typed access to a random-access byte store.
///
/// The segment holds no state besides the store, which may be a
/// [`Mapping`](crate::Mapping), a [`Transaction`](crate::Transaction), a
/// `Vec<u8>` or a mutable reference to any of them. Every operation starts at
/// `offset`, handles its operands in order, advances by each operand's width,
/// and returns the offset after the last operand.
///
/// Read-modify-write operations are not atomic: nothing stops another writer
/// from touching the store between the read and the write.
///
/// # Examples
///
/// ```
/// use mmap_txn::{Segment, Value};
///
/// let mut seg = Segment::new(vec![0u8; 16]);
/// let end = seg.set(0, &[Value::U16(0x0102), Value::U32(7)])?;
/// assert_eq!(end, 6);
/// seg.inc(2, &[Value::U32(1)])?;
///
/// let mut out = [Value::U16(0), Value::U32(0)];
/// seg.get(0, &mut out)?;
/// assert_eq!(out, [Value::U16(0x0102), Value::U32(8)]);
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Segment<S> {
    store: S,
}

impl<S> Segment<S> {
    /// Wrap a byte store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn get_ref(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Unwrap the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ReadAt> Segment<S> {
    fn read(&self, buf: &mut [u8], offset: i64, index: usize) -> Result<()> {
        let n = self.store.read_at(buf, offset)?;
        if n < buf.len() {
            return Err(MmapError::PartialRead {
                index,
                offset,
                num_bytes: n,
            });
        }
        Ok(())
    }

    /// Decode one value per slot, using each slot's variant as its width.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::PartialRead` when the store ends inside a value, and
    /// any error of the store. Slots before the failing one are already filled.
    pub fn get(&self, offset: i64, slots: &mut [Value]) -> Result<i64> {
        let mut offset = offset;
        let mut buf = [0u8; 8];
        for (index, slot) in slots.iter_mut().enumerate() {
            let bytes = &mut buf[..slot.width()];
            self.read(bytes, offset, index)?;
            *slot = slot.decode(bytes);
            offset = advance(offset, slot.width())?;
        }
        Ok(offset)
    }

    /// Decode a layout described by byte widths.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnsupportedType` for a width other than 1, 2, 4 or 8
    /// before anything is read, then any error of [`Segment::get`].
    pub fn get_widths(&self, offset: i64, widths: &[usize]) -> Result<Vec<Value>> {
        let mut slots = widths
            .iter()
            .enumerate()
            .map(|(index, &width)| {
                Value::zero_of_width(width).ok_or(MmapError::UnsupportedType { index })
            })
            .collect::<Result<Vec<_>>>()?;
        self.get(offset, &mut slots)?;
        Ok(slots)
    }
}

impl<S: WriteAt> Segment<S> {
    fn write(&mut self, buf: &[u8], offset: i64, index: usize) -> Result<()> {
        let n = self.store.write_at(buf, offset)?;
        if n < buf.len() {
            return Err(MmapError::PartialWrite {
                index,
                offset,
                num_bytes: n,
            });
        }
        Ok(())
    }

    /// Encode and write `values` in order.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::PartialWrite` when the store ends inside a value, and
    /// any error of the store. Values before the failing one are already written.
    pub fn set(&mut self, offset: i64, values: &[Value]) -> Result<i64> {
        let mut offset = offset;
        let mut buf = [0u8; 8];
        for (index, value) in values.iter().enumerate() {
            self.write(value.encode(&mut buf), offset, index)?;
            offset = advance(offset, value.width())?;
        }
        Ok(offset)
    }
}

impl<S: ReadAt + WriteAt> Segment<S> {
    fn update(&mut self, offset: i64, deltas: &[Value], op: fn(u64, u64) -> u64) -> Result<i64> {
        let mut offset = offset;
        let mut buf = [0u8; 8];
        for (index, delta) in deltas.iter().enumerate() {
            let current = {
                let bytes = &mut buf[..delta.width()];
                self.read(bytes, offset, index)?;
                delta.decode(bytes)
            };
            let next = delta.with_bits(op(current.as_u64(), delta.as_u64()));
            self.write(next.encode(&mut buf), offset, index)?;
            offset = advance(offset, delta.width())?;
        }
        Ok(offset)
    }

    /// Add each delta to the value stored at its position, wrapping at the
    /// operand's width.
    ///
    /// # Errors
    ///
    /// `MmapError::PartialRead`, `MmapError::PartialWrite`, or any error of the store.
    pub fn inc(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.update(offset, deltas, u64::wrapping_add)
    }

    /// Subtract each delta from the value stored at its position, wrapping at
    /// the operand's width.
    ///
    /// # Errors
    ///
    /// `MmapError::PartialRead`, `MmapError::PartialWrite`, or any error of the store.
    pub fn dec(&mut self, offset: i64, deltas: &[Value]) -> Result<i64> {
        self.update(offset, deltas, u64::wrapping_sub)
    }
}
