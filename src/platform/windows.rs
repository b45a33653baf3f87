//! Windows backend: `CreateFileMappingW`, `MapViewOfFile`, `VirtualLock`, `FlushViewOfFile`.

use std::ffi::c_void;
use std::fs::File;
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle, RawHandle};
use std::ptr::{self, NonNull};

use super::{Access, Backend};
use crate::errors::{MmapError, Result};
use crate::utils::PageSpan;

type Handle = *mut c_void;
type Bool = i32;

const PAGE_READONLY: u32 = 0x02;
const PAGE_READWRITE: u32 = 0x04;
const PAGE_WRITECOPY: u32 = 0x08;
const FILE_MAP_COPY: u32 = 0x0001;
const FILE_MAP_WRITE: u32 = 0x0002;
const FILE_MAP_READ: u32 = 0x0004;
const FILE_MAP_EXECUTE: u32 = 0x0020;

#[allow(non_snake_case)]
extern "system" {
    fn CreateFileMappingW(
        hFile: Handle,
        lpFileMappingAttributes: *const c_void,
        flProtect: u32,
        dwMaximumSizeHigh: u32,
        dwMaximumSizeLow: u32,
        lpName: *const u16,
    ) -> Handle;
    fn MapViewOfFile(
        hFileMappingObject: Handle,
        dwDesiredAccess: u32,
        dwFileOffsetHigh: u32,
        dwFileOffsetLow: u32,
        dwNumberOfBytesToMap: usize,
    ) -> *mut c_void;
    fn UnmapViewOfFile(lpBaseAddress: *const c_void) -> Bool;
    fn VirtualLock(lpAddress: *const c_void, dwSize: usize) -> Bool;
    fn VirtualUnlock(lpAddress: *const c_void, dwSize: usize) -> Bool;
    fn FlushViewOfFile(lpBaseAddress: *const c_void, dwNumberOfBytesToFlush: usize) -> Bool;
    fn FlushFileBuffers(hFile: Handle) -> Bool;
}

#[allow(clippy::cast_possible_truncation)]
fn split(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

pub(crate) struct WindowsMapping {
    // null once released
    view: *mut c_void,
    len: usize,
    private: bool,
    section: Option<OwnedHandle>,
    file: Option<File>,
}

impl WindowsMapping {
    fn release(&mut self) -> Result<()> {
        if self.view.is_null() {
            return Ok(());
        }
        let view = std::mem::replace(&mut self.view, ptr::null_mut());
        // handles close on drop even when the unmap below fails
        let _section = self.section.take();
        let _file = self.file.take();
        // SAFETY: view is the base address returned by MapViewOfFile.
        if unsafe { UnmapViewOfFile(view) } == 0 {
            return Err(MmapError::last_os("UnmapViewOfFile"));
        }
        log::debug!("UnmapViewOfFile {:p} ({} bytes)", view, self.len);
        Ok(())
    }
}

impl Backend for WindowsMapping {
    fn map(file: File, span: &PageSpan, access: Access) -> Result<Self> {
        let (mut prot, mut desired) = match (access.writable, access.private) {
            (false, _) => (PAGE_READONLY, FILE_MAP_READ),
            (true, false) => (PAGE_READWRITE, FILE_MAP_WRITE),
            (true, true) => (PAGE_WRITECOPY, FILE_MAP_COPY),
        };
        if access.executable {
            // PAGE_EXECUTE_* constants are the plain ones shifted by a nibble
            prot <<= 4;
            desired |= FILE_MAP_EXECUTE;
        }

        let max_size = span.aligned_offset + span.aligned_len as u64;
        let (max_high, max_low) = split(max_size);
        // SAFETY: the file handle is valid; no name or security attributes.
        let raw = unsafe {
            CreateFileMappingW(
                file.as_raw_handle().cast(),
                ptr::null(),
                prot,
                max_high,
                max_low,
                ptr::null(),
            )
        };
        if raw.is_null() {
            return Err(MmapError::last_os("CreateFileMapping"));
        }
        // SAFETY: raw is a fresh handle owned by nobody else.
        let section = unsafe { OwnedHandle::from_raw_handle(raw as RawHandle) };

        let (off_high, off_low) = split(span.aligned_offset);
        // SAFETY: section is a valid file mapping handle; offset is granularity aligned.
        let view = unsafe {
            MapViewOfFile(
                section.as_raw_handle().cast(),
                desired,
                off_high,
                off_low,
                span.aligned_len,
            )
        };
        if view.is_null() {
            return Err(MmapError::last_os("MapViewOfFile"));
        }
        Ok(Self {
            view,
            len: span.aligned_len,
            private: access.private,
            section: Some(section),
            file: Some(file),
        })
    }

    fn base(&self) -> NonNull<u8> {
        NonNull::new(self.view.cast::<u8>()).unwrap_or(NonNull::dangling())
    }

    fn lock(&self) -> Result<()> {
        // SAFETY: the range is a live view.
        if unsafe { VirtualLock(self.view, self.len) } == 0 {
            return Err(MmapError::last_os("VirtualLock"));
        }
        Ok(())
    }

    fn unlock(&self) -> Result<()> {
        // SAFETY: the range is a live view.
        if unsafe { VirtualUnlock(self.view, self.len) } == 0 {
            return Err(MmapError::last_os("VirtualUnlock"));
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // SAFETY: the range is a live view.
        if unsafe { FlushViewOfFile(self.view, self.len) } == 0 {
            return Err(MmapError::last_os("FlushViewOfFile"));
        }
        // copy-on-write pages never reach the file
        if self.private {
            return Ok(());
        }
        if let Some(file) = &self.file {
            // SAFETY: the handle is owned by `file`.
            if unsafe { FlushFileBuffers(file.as_raw_handle().cast()) } == 0 {
                return Err(MmapError::last_os("FlushFileBuffers"));
            }
        }
        Ok(())
    }

    fn unmap(mut self) -> Result<()> {
        self.release()
    }
}

impl Drop for WindowsMapping {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("releasing mapping failed: {e}");
        }
    }
}
