//! # Queue Configuration Constants
//!
//! All numeric limits and on-disk layout sizes in one place.
//!
//! ## Dependency Graph
//!
//! ```text
//! page size (per queue, [MIN_PAGE_SIZE, MAX_PAGE_SIZE])
//!       │
//!       ├─> NEXT_POINTER_SIZE (4 bytes, last 4 bytes of every page)
//!       │     Payload region is [0, page_size - NEXT_POINTER_SIZE).
//!       │
//!       └─> LENGTH_PREFIX_SIZE (4 bytes per element frame)
//!             A frame (prefix + payload) may span any number of pages,
//!             so neither value bounds the element size.
//!
//! INDEX_FILE_SIZE (24 bytes)
//!       │
//!       └─> Six u32 fields: size, capacity, head page/offset,
//!           tail page/offset. The index file is always exactly this long.
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `MIN_PAGE_SIZE` leaves room for the next-page pointer plus at least
//!    one length prefix (enforced below).
//! 2. `MAX_PAGE_SIZE` is 2 GiB; offsets inside a page must fit in the u32
//!    cursor fields of the index.

/// Smallest allowed page size: 512 KiB.
pub const MIN_PAGE_SIZE: u64 = 1 << 19;

/// Largest allowed page size: 2 GiB. Page offsets are stored as u32.
pub const MAX_PAGE_SIZE: u64 = 1 << 31;

/// Default page size: 128 MiB.
pub const DEFAULT_PAGE_SIZE: u64 = 1 << 27;

/// Default element-count bound: effectively unbounded.
pub const DEFAULT_CAPACITY: u32 = u32::MAX;

/// Default cap on released pages kept mapped for reuse.
pub const DEFAULT_MAX_IDLE_PAGES: usize = 16;

/// Name of the index file inside the queue directory.
pub const INDEX_FILE_NAME: &str = ".index";

/// Exact length of the index file.
pub const INDEX_FILE_SIZE: usize = 24;

/// Trailing bytes of every page holding the successor page id (0 = none).
pub const NEXT_POINTER_SIZE: usize = 4;

/// Bytes of the little-endian length prefix written before each element.
pub const LENGTH_PREFIX_SIZE: usize = 4;

const _: () = assert!(MIN_PAGE_SIZE > (NEXT_POINTER_SIZE + LENGTH_PREFIX_SIZE) as u64);
const _: () = assert!(MAX_PAGE_SIZE <= 1 << 32);
