//! POSIX backend: `mmap`, `mlock`, `msync`, `munmap`.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::ptr::{self, NonNull};

use libc::c_void;

use super::{Access, Backend};
use crate::errors::{MmapError, Result};
use crate::utils::PageSpan;

pub(crate) struct UnixMapping {
    // null once released
    addr: *mut c_void,
    len: usize,
    _file: File,
}

impl UnixMapping {
    fn release(&mut self) -> Result<()> {
        if self.addr.is_null() {
            return Ok(());
        }
        let addr = std::mem::replace(&mut self.addr, ptr::null_mut());
        // SAFETY: addr/len describe a mapping created by `map` and not yet unmapped.
        if unsafe { libc::munmap(addr, self.len) } != 0 {
            return Err(MmapError::last_os("munmap"));
        }
        log::debug!("munmap {:p} ({} bytes)", addr, self.len);
        Ok(())
    }
}

impl Backend for UnixMapping {
    fn map(file: File, span: &PageSpan, access: Access) -> Result<Self> {
        let mut prot = libc::PROT_READ;
        if access.writable {
            prot |= libc::PROT_WRITE;
        }
        if access.executable {
            prot |= libc::PROT_EXEC;
        }
        let flags = if access.private {
            libc::MAP_PRIVATE
        } else {
            libc::MAP_SHARED
        };
        #[allow(clippy::cast_possible_wrap)]
        let offset = libc::off_t::try_from(span.aligned_offset)
            .map_err(|_| MmapError::InvalidOffset(span.aligned_offset as i64))?;

        // SAFETY: a fresh mapping at a kernel-chosen address; the fd is valid for the call.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                span.aligned_len,
                prot,
                flags,
                file.as_raw_fd(),
                offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(MmapError::last_os("mmap"));
        }
        Ok(Self {
            addr,
            len: span.aligned_len,
            _file: file,
        })
    }

    fn base(&self) -> NonNull<u8> {
        // mmap never hands out the null page and released mappings are never read
        NonNull::new(self.addr.cast::<u8>()).unwrap_or(NonNull::dangling())
    }

    fn lock(&self) -> Result<()> {
        // SAFETY: the range is a live mapping.
        if unsafe { libc::mlock(self.addr, self.len) } != 0 {
            return Err(MmapError::last_os("mlock"));
        }
        Ok(())
    }

    fn unlock(&self) -> Result<()> {
        // SAFETY: the range is a live mapping.
        if unsafe { libc::munlock(self.addr, self.len) } != 0 {
            return Err(MmapError::last_os("munlock"));
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // SAFETY: the range is a live mapping and addr is page aligned.
        if unsafe { libc::msync(self.addr, self.len, libc::MS_SYNC) } != 0 {
            return Err(MmapError::last_os("msync"));
        }
        Ok(())
    }

    fn unmap(mut self) -> Result<()> {
        self.release()
    }
}

impl Drop for UnixMapping {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("releasing mapping failed: {e}");
        }
    }
}
