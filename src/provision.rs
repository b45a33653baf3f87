//! Create-or-open helpers for fixed-size segment files.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use crate::errors::Result;
use crate::mapped::MappedSegment;
use crate::mapping::{MapFlags, MapMode, Mapping};

/// Open `path` as a read-write [`MappedSegment`] of exactly `size` bytes,
/// creating the file with permission bits `perm` if it does not exist.
///
/// `init` runs only when the file was created by this call. If anything fails
/// after creation (mapping or `init`), the mapping is closed and the file is
/// removed, so the next call starts from scratch and runs `init` again.
/// An existing file is resized to `size` and returned as is.
///
/// `perm` is applied on Unix and ignored elsewhere.
///
/// # Errors
///
/// Returns `MmapError::Io` for filesystem failures, any error of
/// [`Mapping::new`], or the error returned by `init`.
///
/// # Examples
///
/// ```no_run
/// use mmap_txn::{provision::open_segment_file, Value};
///
/// let seg = open_segment_file("counters.bin", 0o600, 64, |seg| {
///     seg.set(0, &[Value::U32(0xC0FFEE)])?;
///     Ok(())
/// })?;
/// # Ok::<(), mmap_txn::MmapError>(())
/// ```
pub fn open_segment_file<P, F>(path: P, perm: u32, size: usize, init: F) -> Result<MappedSegment>
where
    P: AsRef<Path>,
    F: FnOnce(&mut MappedSegment) -> Result<()>,
{
    let path = path.as_ref();
    let created = matches!(fs::metadata(path), Err(e) if e.kind() == ErrorKind::NotFound);

    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(perm);
    }
    #[cfg(not(unix))]
    let _ = perm;

    let mapped = options
        .open(path)
        .map_err(Into::into)
        .and_then(|file| {
            file.set_len(size as u64)?;
            // the mapping keeps its own handle; `file` closes here
            Mapping::new(&file, 0, size, MapMode::ReadWrite, MapFlags::empty())
        });
    let mut seg = match mapped {
        Ok(mapping) => MappedSegment::new(mapping),
        Err(e) => {
            if created {
                discard(path);
            }
            return Err(e);
        }
    };

    if created {
        if let Err(e) = init(&mut seg) {
            log::warn!("initializing {} failed: {e}; removing it", path.display());
            if let Err(close_err) = seg.close() {
                log::warn!("closing {} failed: {close_err}", path.display());
            }
            drop(seg);
            discard(path);
            return Err(e);
        }
        log::debug!("created segment file {} ({size} bytes)", path.display());
    }
    Ok(seg)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("removing {} failed: {e}", path.display());
    }
}

/// Remove a segment file. Close every mapping of it first.
///
/// # Errors
///
/// Returns `MmapError::Io` if the file cannot be removed.
pub fn remove_segment_file<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::remove_file(path)?;
    Ok(())
}
