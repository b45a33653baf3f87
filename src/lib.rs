//! # mmap-txn: Memory-mapped file windows with snapshot transactions
//!
//! This crate maps a byte range of an open file into memory, lets you stage
//! changes to a sub-range in an isolated snapshot and publish them in one copy,
//! and reads/writes fixed-width big-endian integers at positional offsets.
//!
//! ## Features
//!
//! - **Unaligned windows**: map any offset; page alignment is handled internally
//! - **Snapshot transactions**: commit or roll back a batch of writes as a whole
//! - **Copy-on-write mode**: private mappings whose writes never reach the file
//! - **Page locking**: pin mapped pages in physical memory
//! - **Positional codec**: `u8`/`u16`/`u32`/`u64` fields, always big-endian
//! - **Cross-platform**: POSIX (`mmap`) and Windows (`MapViewOfFile`) backends
//!
//! Nothing here is thread-safe: a [`Mapping`] and everything derived from it
//! belongs to a single thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use mmap_txn::{MapFlags, MapMode, MappedSegment, Mapping, Value};
//!
//! let file = File::options().read(true).write(true).open("data.bin")?;
//! let map = Mapping::new(&file, 0, 4096, MapMode::ReadWrite, MapFlags::empty())?;
//! let mut seg = MappedSegment::new(map);
//!
//! // Stage two fields and publish them together
//! let mut tx = seg.begin(0, 16)?;
//! tx.set(0, &[Value::U32(1), Value::U64(42)])?;
//! tx.commit()?;
//! drop(tx);
//!
//! // Persist and release
//! seg.sync()?;
//! seg.close()?;
//! # Ok::<(), mmap_txn::MmapError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types for all operations
//! - [`utils`]: Page size queries and alignment arithmetic
//! - [`io`]: Random-access byte store traits
//! - [`mapping`]: Core `Mapping` implementation
//! - [`transaction`]: Snapshot transactions over a mapping
//! - [`segment`]: Big-endian positional codec
//! - [`mapped`]: Segments bound to mappings and transactions
//! - [`provision`]: Create-or-open helpers for segment files

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/mmap-txn")]

pub mod errors;
pub mod io;
pub mod mapped;
pub mod mapping;
mod platform;
pub mod provision;
pub mod segment;
pub mod transaction;
pub mod utils;
mod view;

pub use errors::{MmapError, Result};
pub use io::{ReadAt, WriteAt};
pub use mapped::{MappedSegment, MappedSegmentTransaction};
pub use mapping::{MapFlags, MapMode, MapSource, Mapping, MappingBuilder};
pub use provision::{open_segment_file, remove_segment_file};
pub use segment::{Segment, Value};
pub use transaction::Transaction;
