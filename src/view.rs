//! Bounds-checked byte view over a live OS mapping.

use std::ptr::NonNull;

/// The caller-visible bytes of a mapping.
///
/// This is the only place that turns a raw mapped address into slices. Every
/// other layer goes through [`MappedView::as_slice`] / [`MappedView::as_mut_slice`].
pub(crate) struct MappedView {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedView {
    /// Build a view of `len` bytes starting `inner_offset` bytes past `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the start of a live mapping at least `inner_offset + len`
    /// bytes long, and the mapping must outlive the view.
    pub(crate) unsafe fn new(base: NonNull<u8>, inner_offset: usize, len: usize) -> Self {
        // SAFETY: inner_offset is inside the mapping per the caller contract.
        let ptr = NonNull::new_unchecked(base.as_ptr().add(inner_offset));
        Self { ptr, len }
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr..ptr+len is mapped for the lifetime of the view.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutable access to the mapped bytes.
    ///
    /// Writing to pages that were mapped read-only faults; callers check the
    /// mapping's writable flag first.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr..ptr+len is mapped and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}
