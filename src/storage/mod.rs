//! # Storage Module
//!
//! The persistent substrate of the queue: fixed-size memory-mapped page
//! files chained by on-page successor ids, an allocator that owns every
//! mapping and recycles drained pages, a 24-byte index recording the
//! queue's size and cursors, and the byte log that composes the three into
//! a framed FIFO byte stream.
//!
//! ## On-Disk Layout
//!
//! ```text
//! queue_dir/
//! ├── .index        # 24 bytes: size, capacity, head/tail cursors
//! ├── 1             # page files, each exactly page_size bytes
//! ├── 2
//! └── ...
//! ```
//!
//! Every page reserves its last four bytes for the id of its successor
//! (0 = none); ids double as file names. Page files appear on demand as the
//! tail grows and disappear when the allocator's idle cache overflows.
//!
//! ## Safety Model
//!
//! All mappings are `MmapMut` regions owned by exactly one struct and
//! borrowed per operation, so the borrow checker rules out access to an
//! unmapped page. The queue layer serializes every operation behind one
//! lock; nothing in this module synchronizes on its own.
//!
//! ## Module Organization
//!
//! - `page`: one mapped page file ([`Page`])
//! - `allocator`: page ownership, id issue, idle recycling ([`PageAllocator`])
//! - `index`: the persistent size/cursor record ([`QueueIndex`])
//! - `log`: framed byte stream over the page chain ([`ByteLog`])

mod allocator;
mod index;
mod log;
mod page;

pub use allocator::PageAllocator;
pub use index::QueueIndex;
pub use log::ByteLog;
pub use page::Page;
