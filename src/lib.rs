//! # mmapq - Persistent Blocking Queue
//!
//! mmapq is a bounded, blocking FIFO queue whose elements survive process
//! restarts. Producers and consumers share one queue instance backed by a
//! directory of memory-mapped page files; order and element count are
//! preserved across clean shutdowns and, best-effort, across crashes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmapq::{QueueBuilder, StringSerializer};
//!
//! let queue = QueueBuilder::new("./outbox", StringSerializer)
//!     .capacity(10_000)
//!     .open()?;
//!
//! queue.put(&"job-1".to_string())?;
//! let job = queue.take()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  PersistentQueue (lock + condvars)  │
//! ├─────────────────────────────────────┤
//! │  Serializer (user codec, unlocked)  │
//! ├─────────────────────────────────────┤
//! │  ByteLog (framing, head/tail walk)  │
//! ├──────────────┬──────────────────────┤
//! │  QueueIndex  │  PageAllocator/Page  │
//! └──────────────┴──────────────────────┘
//! ```
//!
//! The queue core serializes every operation on one lock and blocks on
//! `not_full` / `not_empty` condvars. Below it, the byte log walks a linked
//! chain of fixed-size mmap'd pages, reading at the head cursor and writing
//! at the tail cursor; the 24-byte index file is the single source of truth
//! for size, capacity, and both cursors.
//!
//! ## File Layout
//!
//! ```text
//! queue_dir/
//! ├── .index       # 24 bytes: size, capacity, head/tail cursors
//! ├── 1            # page files, each exactly page_size bytes,
//! ├── 2            # named by decimal page id
//! └── ...
//! ```
//!
//! Page files appear as the backlog grows and are deleted again as
//! consumers drain, keeping disk usage proportional to queue depth plus a
//! small idle reserve.
//!
//! ## Module Overview
//!
//! - [`queue`]: the public queue and its builder
//! - [`storage`]: pages, allocator, index, byte log
//! - [`serialize`]: the element codec seam and stock codecs
//! - [`config`]: limits, defaults, on-disk layout sizes

pub mod config;
pub mod queue;
pub mod serialize;
pub mod storage;

pub use queue::{PersistentQueue, QueueBuilder};
pub use serialize::{BytesSerializer, JsonSerializer, Serializer, StringSerializer};
