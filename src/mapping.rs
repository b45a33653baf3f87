//! Memory mapping of a file region with byte-level, bounds-checked access.

use std::fs::File;
use std::ops::BitOr;

use crate::errors::{MmapError, Result};
use crate::io::{copy_in, copy_out, ReadAt, WriteAt};
use crate::platform::{Access, Backend, NativeMapping};
use crate::utils::{len_as_offset, offset_in, PageSpan};
use crate::view::MappedView;

#[cfg(windows)]
const DUP_OPERATION: &str = "DuplicateHandle";
#[cfg(not(windows))]
const DUP_OPERATION: &str = "dup";

/// An open file that can be mapped: anything exposing a borrowed file
/// descriptor (Unix) or handle (Windows), such as `File`, `OwnedFd` or
/// `OwnedHandle`.
#[cfg(unix)]
pub trait MapSource: std::os::fd::AsFd {}
#[cfg(unix)]
impl<T: std::os::fd::AsFd + ?Sized> MapSource for T {}

/// An open file that can be mapped: anything exposing a borrowed file
/// descriptor (Unix) or handle (Windows), such as `File`, `OwnedFd` or
/// `OwnedHandle`.
#[cfg(windows)]
pub trait MapSource: std::os::windows::io::AsHandle {}
#[cfg(windows)]
impl<T: std::os::windows::io::AsHandle + ?Sized> MapSource for T {}

/// Duplicate the caller's descriptor so the mapping owns its own.
fn duplicate<S: MapSource + ?Sized>(source: &S) -> Result<File> {
    #[cfg(unix)]
    let owned = source.as_fd().try_clone_to_owned();
    #[cfg(windows)]
    let owned = source.as_handle().try_clone_to_owned();
    owned.map(File::from).map_err(|source| MmapError::Os {
        operation: DUP_OPERATION,
        source,
    })
}

/// Access mode for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MapMode {
    /// Shared, read-only mapping.
    ReadOnly = 0,
    /// Shared mapping. Writes are visible to other mappings of the same region
    /// and reach the file; [`Mapping::sync`] controls when.
    ReadWrite = 1,
    /// Private copy-on-write mapping. Writes stay in this mapping and never
    /// reach the file.
    WriteCopy = 2,
}

impl MapMode {
    /// Whether the mode allows writes through the mapping.
    #[must_use]
    pub fn is_writable(self) -> bool {
        !matches!(self, MapMode::ReadOnly)
    }
}

impl TryFrom<u32> for MapMode {
    type Error = MmapError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(MapMode::ReadOnly),
            1 => Ok(MapMode::ReadWrite),
            2 => Ok(MapMode::WriteCopy),
            other => Err(MmapError::InvalidMode(other)),
        }
    }
}

/// Extra mapping flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapFlags(u32);

impl MapFlags {
    /// Mapped pages may be executed.
    pub const EXECUTABLE: MapFlags = MapFlags(0x1);

    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        MapFlags(0)
    }

    /// Build flags from raw bits. Unknown bits are kept but have no effect.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        MapFlags(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: MapFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MapFlags {
    type Output = MapFlags;

    fn bitor(self, rhs: MapFlags) -> MapFlags {
        MapFlags(self.0 | rhs.0)
    }
}

struct Region {
    backend: NativeMapping,
    view: MappedView,
}

/// A virtual memory window onto a region of a file.
///
/// The caller addresses bytes relative to the requested offset; alignment to
/// the OS mapping granularity is handled internally. The mapping keeps its own
/// duplicate of the file handle, so closing the caller's `File` does not
/// invalidate it.
///
/// A mapping is not thread-safe and is neither `Send` nor `Sync`. Always call
/// [`Mapping::close`]; dropping an open mapping releases it on a best-effort
/// basis and only logs failures.
///
/// # Examples
///
/// ```no_run
/// use std::fs::OpenOptions;
/// use mmap_txn::{MapFlags, MapMode, Mapping};
///
/// let file = OpenOptions::new().read(true).write(true).open("data.bin")?;
/// let mut map = Mapping::new(&file, 100, 4096, MapMode::ReadWrite, MapFlags::empty())?;
/// map.write_at(b"hello", 0)?;
/// map.sync()?;
/// map.close()?;
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
pub struct Mapping {
    // None once closed
    region: Option<Region>,
    len: usize,
    mode: MapMode,
    executable: bool,
    locked: bool,
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("address", &self.address())
            .field("len", &self.len)
            .field("mode", &self.mode)
            .field("executable", &self.executable)
            .field("locked", &self.locked)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Mapping {
    /// Map `length` bytes of `file` starting at `offset`.
    ///
    /// `file` is any open descriptor or handle ([`MapSource`]); the mapping
    /// duplicates it and leaves the caller's copy alone.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidOffset` if `offset` is negative.
    /// Returns `MmapError::InvalidLength` if `length` is zero, too large for the
    /// platform, or `offset + length` runs past the end of the file.
    /// Returns `MmapError::Os` if duplicating the handle or creating the mapping fails.
    /// Returns `MmapError::Io` if the file size cannot be read.
    pub fn new<S: MapSource + ?Sized>(
        file: &S,
        offset: i64,
        length: usize,
        mode: MapMode,
        flags: MapFlags,
    ) -> Result<Self> {
        let span = PageSpan::for_host(offset, length)?;
        let access = Access {
            writable: mode.is_writable(),
            private: mode == MapMode::WriteCopy,
            executable: flags.contains(MapFlags::EXECUTABLE),
        };
        let handle = duplicate(file)?;
        span.ensure_within(handle.metadata()?.len())?;
        let backend = NativeMapping::map(handle, &span, access)?;
        // SAFETY: the backend mapped span.aligned_len = inner_offset + len bytes,
        // and the view is dropped together with the backend in `Region`.
        let view = unsafe { MappedView::new(backend.base(), span.inner_offset, span.len) };
        log::debug!(
            "mapped {} bytes at file offset {} (aligned offset {}, aligned len {}, mode {:?})",
            span.len,
            offset,
            span.aligned_offset,
            span.aligned_len,
            mode
        );
        Ok(Self {
            region: Some(Region { backend, view }),
            len: span.len,
            mode,
            executable: access.executable,
            locked: false,
        })
    }

    /// Start configuring a mapping with [`MappingBuilder`].
    #[must_use]
    pub fn builder() -> MappingBuilder {
        MappingBuilder::default()
    }

    /// Mapping mode.
    #[must_use]
    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Whether mapped pages may be written.
    #[must_use]
    pub fn writable(&self) -> bool {
        self.mode.is_writable()
    }

    /// Whether mapped pages may be executed.
    #[must_use]
    pub fn executable(&self) -> bool {
        self.executable
    }

    /// Whether the pages are currently locked in memory.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the mapping has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.region.is_none()
    }

    /// Address of the first caller-visible byte, or null once closed.
    #[must_use]
    pub fn address(&self) -> *const u8 {
        self.region
            .as_ref()
            .map_or(std::ptr::null(), |r| r.view.as_ptr())
    }

    /// Mapped length in bytes as requested by the caller.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty. Mappings are never created empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Zero-copy view of the mapped bytes.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` once the mapping is closed.
    pub fn memory(&self) -> Result<&[u8]> {
        Ok(self.region()?.view.as_slice())
    }

    /// Zero-copy mutable view of the mapped bytes.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` once the mapping is closed.
    /// Returns `MmapError::IllegalOperation` on a read-only mapping.
    pub fn memory_mut(&mut self) -> Result<&mut [u8]> {
        self.writable_region("write").map(|r| r.view.as_mut_slice())
    }

    /// Read up to `buf.len()` bytes at `offset`; see [`ReadAt`].
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` once closed and `MmapError::InvalidOffset`
    /// when `offset` is outside `[0, len)`.
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        let memory = self.memory()?;
        let at = offset_in(offset, 0, len_as_offset(memory.len()))?;
        Ok(copy_out(memory, at, buf))
    }

    /// Write up to `buf.len()` bytes at `offset`; see [`WriteAt`].
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` once closed, `MmapError::IllegalOperation` on a
    /// read-only mapping and `MmapError::InvalidOffset` when `offset` is outside `[0, len)`.
    pub fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        let memory = self.memory_mut()?;
        let at = offset_in(offset, 0, len_as_offset(memory.len()))?;
        Ok(copy_in(memory, at, buf))
    }

    /// Lock the mapped pages in physical memory.
    ///
    /// Every page that holds part of the mapping is resident when this returns
    /// and stays resident until [`Mapping::unlock`]. This is about swapping, not
    /// mutual exclusion. It may require raising the process memory-lock limit
    /// (`RLIMIT_MEMLOCK` on Unix, the working set size on Windows).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed`, `MmapError::Locked` if already locked, or
    /// `MmapError::Os` if the OS refuses.
    pub fn lock(&mut self) -> Result<()> {
        let region = self.region()?;
        if self.locked {
            return Err(MmapError::Locked);
        }
        region.backend.lock()?;
        log::trace!("locked {} bytes", self.len);
        self.locked = true;
        Ok(())
    }

    /// Unlock pages locked by [`Mapping::lock`].
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed`, `MmapError::Unlocked` if not locked, or
    /// `MmapError::Os` if the OS refuses.
    pub fn unlock(&mut self) -> Result<()> {
        let region = self.region()?;
        if !self.locked {
            return Err(MmapError::Unlocked);
        }
        region.backend.unlock()?;
        log::trace!("unlocked {} bytes", self.len);
        self.locked = false;
        Ok(())
    }

    /// Flush dirty pages to the backing file.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed`, `MmapError::IllegalOperation` on a read-only
    /// mapping, or `MmapError::Os` if the flush fails.
    pub fn sync(&self) -> Result<()> {
        let region = self.region()?;
        if !self.writable() {
            return Err(MmapError::IllegalOperation("sync"));
        }
        region.backend.sync()?;
        log::trace!("synced {} bytes", self.len);
        Ok(())
    }

    /// Sync (if writable), unlock (if locked), then release the mapping and its
    /// file handle.
    ///
    /// If syncing or unlocking fails the mapping stays open. Once the release
    /// is attempted the mapping is closed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::Closed` on a second call, or the first OS failure.
    pub fn close(&mut self) -> Result<()> {
        self.region()?;
        if self.writable() {
            self.sync()?;
        }
        if self.locked {
            self.unlock()?;
        }
        match self.region.take() {
            Some(region) => region.backend.unmap(),
            None => Err(MmapError::Closed),
        }
    }

    fn region(&self) -> Result<&Region> {
        self.region.as_ref().ok_or(MmapError::Closed)
    }

    fn writable_region(&mut self, operation: &'static str) -> Result<&mut Region> {
        let writable = self.writable();
        let region = self.region.as_mut().ok_or(MmapError::Closed)?;
        if !writable {
            return Err(MmapError::IllegalOperation(operation));
        }
        Ok(region)
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if self.region.is_none() {
            return;
        }
        log::warn!(
            "mapping of {} bytes dropped without close; releasing",
            self.len
        );
        if let Err(e) = self.close() {
            log::warn!("closing dropped mapping failed: {e}");
        }
    }
}

impl ReadAt for Mapping {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        Mapping::read_at(self, buf, offset)
    }
}

impl WriteAt for Mapping {
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        Mapping::write_at(self, buf, offset)
    }
}

/// Builder for [`Mapping`].
///
/// Defaults: offset 0, length up to the end of the file, read-only, not executable.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use mmap_txn::{MapMode, Mapping};
///
/// let file = File::options().read(true).write(true).open("data.bin")?;
/// let map = Mapping::builder()
///     .offset(512)
///     .mode(MapMode::WriteCopy)
///     .map(&file)?;
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MappingBuilder {
    offset: i64,
    len: Option<usize>,
    mode: MapMode,
    flags: MapFlags,
}

impl Default for MappingBuilder {
    fn default() -> Self {
        Self {
            offset: 0,
            len: None,
            mode: MapMode::ReadOnly,
            flags: MapFlags::empty(),
        }
    }
}

impl MappingBuilder {
    /// File offset of the first mapped byte.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Number of bytes to map.
    #[must_use]
    pub fn len(mut self, len: usize) -> Self {
        self.len = Some(len);
        self
    }

    /// Mapping mode.
    #[must_use]
    pub fn mode(mut self, mode: MapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Request executable pages.
    #[must_use]
    pub fn executable(mut self, executable: bool) -> Self {
        self.flags = if executable {
            self.flags | MapFlags::EXECUTABLE
        } else {
            MapFlags::from_bits(self.flags.bits() & !MapFlags::EXECUTABLE.bits())
        };
        self
    }

    /// Raw flags, replacing any set so far.
    #[must_use]
    pub fn flags(mut self, flags: MapFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Create the mapping.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidOffset` if the offset is negative,
    /// `MmapError::Io` if the file length is needed and cannot be read,
    /// and any error of [`Mapping::new`].
    pub fn map<S: MapSource + ?Sized>(self, file: &S) -> Result<Mapping> {
        let len = match self.len {
            Some(len) => len,
            None => {
                let start =
                    u64::try_from(self.offset).map_err(|_| MmapError::InvalidOffset(self.offset))?;
                let total = duplicate(file)?.metadata()?.len();
                let remaining = total.saturating_sub(start);
                usize::try_from(remaining).map_err(|_| MmapError::InvalidLength(usize::MAX))?
            }
        };
        Mapping::new(file, self.offset, len, self.mode, self.flags)
    }
}
