//! Crate-specific error types for mmap-txn.

use std::io;
use thiserror::Error;

/// Result alias for mmap-txn operations.
pub type Result<T> = std::result::Result<T, MmapError>;

/// Error type covering mapping lifecycle, bounds, transactions and the segment codec.
#[derive(Debug, Error)]
pub enum MmapError {
    /// Operation on a mapping that has already been closed.
    #[error("mapping closed")]
    Closed,

    /// Operation not allowed for this mapping (write, sync or transaction on a read-only mapping).
    #[error("illegal operation ({0})")]
    IllegalOperation(&'static str),

    /// Mapping mode outside of the known set.
    #[error("invalid mode 0x{0:x}")]
    InvalidMode(u32),

    /// Offset outside of the addressable range.
    #[error("invalid offset 0x{0:x}")]
    InvalidOffset(i64),

    /// Length that is zero, too large for the platform, or runs past the mapping.
    #[error("invalid length {0}")]
    InvalidLength(usize),

    /// Memory pages are already locked.
    #[error("mapping locked")]
    Locked,

    /// Memory pages are not locked.
    #[error("mapping unlocked")]
    Unlocked,

    /// Operation on a transaction that was already committed or rolled back.
    #[error("transaction closed")]
    TransactionClosed,

    /// Fewer bytes than the snapshot length were copied back into the mapping.
    #[error("partial commit ({num_bytes} bytes)")]
    PartialCommit {
        /// Number of bytes committed.
        num_bytes: usize,
    },

    /// The store returned fewer bytes than the value width.
    #[error("partial read of value #{index} ({num_bytes} bytes at 0x{offset:x})")]
    PartialRead {
        /// Index of the value in the operand list.
        index: usize,
        /// Offset the value was read from.
        offset: i64,
        /// Number of bytes read.
        num_bytes: usize,
    },

    /// The store accepted fewer bytes than the value width.
    #[error("partial write of value #{index} ({num_bytes} bytes at 0x{offset:x})")]
    PartialWrite {
        /// Index of the value in the operand list.
        index: usize,
        /// Offset the value was written to.
        offset: i64,
        /// Number of bytes written.
        num_bytes: usize,
    },

    /// Operand of a width the segment codec does not know.
    #[error("type of value #{index} is not supported")]
    UnsupportedType {
        /// Index of the operand in the operand list.
        index: usize,
    },

    /// A platform call failed.
    #[error("{operation}: {source}")]
    Os {
        /// Name of the failing system call.
        operation: &'static str,
        /// Error reported by the OS.
        #[source]
        source: io::Error,
    },

    /// Wrapper for `std::io::Error` raised by filesystem helpers.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MmapError {
    /// Wrap the last OS error with the name of the call that produced it.
    pub(crate) fn last_os(operation: &'static str) -> Self {
        MmapError::Os {
            operation,
            source: io::Error::last_os_error(),
        }
    }
}
