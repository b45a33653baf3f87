//! Utility helpers for page size, mapping alignment, and range validation.

use crate::errors::{MmapError, Result};

/// Get the system page size in bytes.
#[must_use]
pub fn page_size() -> usize {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            windows_system_info().0
        } else {
            unix_page_size()
        }
    }
}

/// Granularity the OS requires for the file offset of a mapping.
///
/// This is the page size on POSIX systems and the allocation granularity
/// (usually 64 KiB) on Windows.
#[must_use]
pub fn mapping_granularity() -> usize {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            windows_system_info().1
        } else {
            unix_page_size()
        }
    }
}

#[cfg(target_os = "windows")]
fn windows_system_info() -> (usize, usize) {
    use std::mem::MaybeUninit;
    #[allow(non_snake_case)]
    #[repr(C)]
    struct SYSTEM_INFO {
        wProcessorArchitecture: u16,
        wReserved: u16,
        dwPageSize: u32,
        lpMinimumApplicationAddress: *mut core::ffi::c_void,
        lpMaximumApplicationAddress: *mut core::ffi::c_void,
        dwActiveProcessorMask: usize,
        dwNumberOfProcessors: u32,
        dwProcessorType: u32,
        dwAllocationGranularity: u32,
        wProcessorLevel: u16,
        wProcessorRevision: u16,
    }
    extern "system" {
        fn GetSystemInfo(lpSystemInfo: *mut SYSTEM_INFO);
    }
    let mut sysinfo = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo always fills the structure.
    unsafe {
        GetSystemInfo(sysinfo.as_mut_ptr());
        let s = sysinfo.assume_init();
        (s.dwPageSize as usize, s.dwAllocationGranularity as usize)
    }
}

#[cfg(not(target_os = "windows"))]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unix_page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE is safe to call.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    page_size.max(0) as usize
}

/// Largest length a single mapping may have.
pub const MAX_MAPPING_LEN: usize = isize::MAX as usize;

/// A caller-requested file window reconciled with the OS alignment rules.
///
/// The OS maps `[aligned_offset, aligned_offset + aligned_len)` of the file;
/// the caller's first byte lives `inner_offset` bytes into that region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    /// File offset rounded down to the granularity.
    pub aligned_offset: u64,
    /// Distance from `aligned_offset` to the requested offset.
    pub inner_offset: usize,
    /// Length of the OS mapping: `inner_offset + len`.
    pub aligned_len: usize,
    /// Length requested by the caller.
    pub len: usize,
}

impl PageSpan {
    /// Reconcile `offset`/`len` with the given granularity.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidOffset` if `offset` is negative and
    /// `MmapError::InvalidLength` if `len` is zero or the aligned length exceeds
    /// [`MAX_MAPPING_LEN`].
    pub fn new(offset: i64, len: usize, granularity: usize) -> Result<Self> {
        let Ok(requested) = u64::try_from(offset) else {
            return Err(MmapError::InvalidOffset(offset));
        };
        if len == 0 || len > MAX_MAPPING_LEN {
            return Err(MmapError::InvalidLength(len));
        }
        let granularity = granularity.max(1) as u64;
        let inner = requested % granularity;
        // inner < granularity, which is itself a usize
        #[allow(clippy::cast_possible_truncation)]
        let inner_offset = inner as usize;
        let aligned_len = inner_offset
            .checked_add(len)
            .filter(|&n| n <= MAX_MAPPING_LEN)
            .ok_or(MmapError::InvalidLength(len))?;
        Ok(Self {
            aligned_offset: requested - inner,
            inner_offset,
            aligned_len,
            len,
        })
    }

    /// Reconcile `offset`/`len` with the host's [`mapping_granularity`].
    ///
    /// # Errors
    ///
    /// See [`PageSpan::new`].
    pub fn for_host(offset: i64, len: usize) -> Result<Self> {
        Self::new(offset, len, mapping_granularity())
    }

    /// Check that the requested bytes lie inside a file of `file_len` bytes.
    ///
    /// Pages wholly past the end of the file fault on access, so a span that
    /// overruns the file is never mapped.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidLength` if `offset + len` exceeds `file_len`.
    pub fn ensure_within(&self, file_len: u64) -> Result<()> {
        let end = (self.aligned_offset + self.inner_offset as u64).checked_add(self.len as u64);
        match end {
            Some(end) if end <= file_len => Ok(()),
            _ => Err(MmapError::InvalidLength(self.len)),
        }
    }
}

/// Validate that `offset` addresses a byte of `[low, high)` and return its
/// distance from `low`.
///
/// # Errors
///
/// Returns `MmapError::InvalidOffset` when the offset is outside the range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn offset_in(offset: i64, low: i64, high: i64) -> Result<usize> {
    if offset < low || offset >= high {
        return Err(MmapError::InvalidOffset(offset));
    }
    // high - low is a mapped length, so it fits in usize
    Ok((offset - low) as usize)
}

/// Convert a mapping length into the signed offset space callers address with.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn len_as_offset(len: usize) -> i64 {
    // lengths are bounded by MAX_MAPPING_LEN
    len as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_offset_passes_through() {
        let span = PageSpan::new(8192, 100, 4096).expect("span");
        assert_eq!(span.aligned_offset, 8192);
        assert_eq!(span.inner_offset, 0);
        assert_eq!(span.aligned_len, 100);
        assert_eq!(span.len, 100);
    }

    #[test]
    fn unaligned_offset_rounds_down_and_extends() {
        let span = PageSpan::new(4096 + 10, 20, 4096).expect("span");
        assert_eq!(span.aligned_offset, 4096);
        assert_eq!(span.inner_offset, 10);
        assert_eq!(span.aligned_len, 30);

        let span = PageSpan::new(70_000, 1, 65_536).expect("span");
        assert_eq!(span.aligned_offset, 65_536);
        assert_eq!(span.inner_offset, 70_000 - 65_536);
        assert_eq!(span.aligned_len, 70_000 - 65_536 + 1);
    }

    #[test]
    fn rejects_negative_offset() {
        assert!(matches!(
            PageSpan::new(-1, 10, 4096),
            Err(MmapError::InvalidOffset(-1))
        ));
    }

    #[test]
    fn rejects_zero_and_oversized_length() {
        assert!(matches!(
            PageSpan::new(0, 0, 4096),
            Err(MmapError::InvalidLength(0))
        ));
        assert!(matches!(
            PageSpan::new(0, usize::MAX, 4096),
            Err(MmapError::InvalidLength(_))
        ));
        // fits alone, overflows once the inner offset is added
        assert!(matches!(
            PageSpan::new(1, MAX_MAPPING_LEN, 4096),
            Err(MmapError::InvalidLength(_))
        ));
    }

    #[test]
    fn span_must_end_inside_file() {
        let span = PageSpan::new(4096 + 10, 20, 4096).expect("span");
        span.ensure_within(4096 + 30).expect("exact end");
        assert!(matches!(
            span.ensure_within(4096 + 29),
            Err(MmapError::InvalidLength(20))
        ));
        assert!(matches!(
            PageSpan::new(0, 3 * 4096, 4096).expect("span").ensure_within(100),
            Err(MmapError::InvalidLength(12_288))
        ));
    }

    #[test]
    fn host_granularity_is_a_page_multiple() {
        let page = page_size();
        let gran = mapping_granularity();
        assert!(page > 0);
        assert!(gran >= page);
        assert_eq!(gran % page, 0);
    }

    #[test]
    fn offset_in_checks_half_open_range() {
        assert_eq!(offset_in(10, 10, 20).expect("low"), 0);
        assert_eq!(offset_in(19, 10, 20).expect("last"), 9);
        assert!(matches!(offset_in(20, 10, 20), Err(MmapError::InvalidOffset(20))));
        assert!(matches!(offset_in(9, 10, 20), Err(MmapError::InvalidOffset(9))));
        assert!(matches!(offset_in(-1, 0, 20), Err(MmapError::InvalidOffset(-1))));
    }
}
