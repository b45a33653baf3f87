//! Per-host virtual memory primitives behind one capability interface.
//!
//! Page-alignment arithmetic lives in [`crate::utils::PageSpan`]; a backend only
//! receives an already aligned span and never sees the caller's raw request.

use std::fs::File;
use std::ptr::NonNull;

use crate::errors::Result;
use crate::utils::PageSpan;

/// Protection and sharing requested for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Access {
    pub(crate) writable: bool,
    /// Copy-on-write: writes stay in this process and never reach the file.
    pub(crate) private: bool,
    pub(crate) executable: bool,
}

/// Virtual memory operations a host platform must provide.
///
/// Implementations release their OS resources in `Drop` if [`Backend::unmap`]
/// was never reached, so every acquisition path is scope-bound.
pub(crate) trait Backend: Sized {
    /// Map `span` of `file`. The backend keeps `file` until it is unmapped.
    fn map(file: File, span: &PageSpan, access: Access) -> Result<Self>;

    /// Start of the aligned mapping.
    fn base(&self) -> NonNull<u8>;

    /// Pin the mapped pages in physical memory.
    fn lock(&self) -> Result<()>;

    /// Release a previous [`Backend::lock`].
    fn unlock(&self) -> Result<()>;

    /// Flush dirty pages to the backing file.
    fn sync(&self) -> Result<()>;

    /// Tear down the mapping and close the retained file handle.
    fn unmap(self) -> Result<()>;
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub(crate) use unix::UnixMapping as NativeMapping;
    } else if #[cfg(windows)] {
        mod windows;
        pub(crate) use windows::WindowsMapping as NativeMapping;
    } else {
        compile_error!("mmap-txn supports unix and windows targets only");
    }
}
