//! Random-access byte stores.
//!
//! Offsets are signed, absolute positions in the store's own address space.
//! A transfer that moves fewer bytes than requested is not an error: the
//! returned count is short and the caller must compare it against the buffer.

use crate::errors::Result;
use crate::utils::{len_as_offset, offset_in};

/// A byte store that can be read at arbitrary offsets.
pub trait ReadAt {
    /// Copy up to `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied, which is short when the store ends
    /// before `buf` is full.
    ///
    /// # Errors
    ///
    /// Implementations fail with `MmapError::InvalidOffset` when `offset` is
    /// outside the store and with their own lifecycle errors when closed.
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize>;
}

/// A byte store that can be written at arbitrary offsets.
pub trait WriteAt {
    /// Copy up to `buf.len()` bytes from `buf` into the store at `offset`.
    ///
    /// Returns the number of bytes copied, which is short when the store ends
    /// before `buf` is exhausted.
    ///
    /// # Errors
    ///
    /// Implementations fail with `MmapError::InvalidOffset` when `offset` is
    /// outside the store and with their own lifecycle or permission errors.
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize>;
}

/// Copy from `src[at..]` into `dst`, returning the count.
pub(crate) fn copy_out(src: &[u8], at: usize, dst: &mut [u8]) -> usize {
    let n = dst.len().min(src.len() - at);
    dst[..n].copy_from_slice(&src[at..at + n]);
    n
}

/// Copy `src` into `dst[at..]`, returning the count.
pub(crate) fn copy_in(dst: &mut [u8], at: usize, src: &[u8]) -> usize {
    let n = src.len().min(dst.len() - at);
    dst[at..at + n].copy_from_slice(&src[..n]);
    n
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        let at = offset_in(offset, 0, len_as_offset(self.len()))?;
        Ok(copy_out(self, at, buf))
    }
}

impl WriteAt for [u8] {
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        let at = offset_in(offset, 0, len_as_offset(self.len()))?;
        Ok(copy_in(self, at, buf))
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl WriteAt for Vec<u8> {
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        self.as_mut_slice().write_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &mut T {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for &mut T {
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        (**self).write_at(buf, offset)
    }
}
