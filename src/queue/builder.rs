//! # Queue Builder
//!
//! Fluent configuration for opening or creating a [`PersistentQueue`].
//! Settings are validated when `open()` runs, not when they are set.
//!
//! ```ignore
//! let queue = QueueBuilder::new("./outbox", StringSerializer)
//!     .capacity(10_000)
//!     .page_size(1 << 20)
//!     .max_idle_pages(4)
//!     .open()?;
//! ```
//!
//! Opening a directory that already holds a queue keeps the capacity stored
//! on disk; the configured value only applies to fresh directories.

use std::path::{Path, PathBuf};

use eyre::{ensure, Result};

use crate::config::{
    DEFAULT_CAPACITY, DEFAULT_MAX_IDLE_PAGES, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
use crate::serialize::Serializer;
use crate::storage::ByteLog;

use super::PersistentQueue;

pub struct QueueBuilder<S> {
    directory: PathBuf,
    serializer: S,
    capacity: u32,
    page_size: u64,
    max_idle_pages: usize,
}

impl<S: Serializer> QueueBuilder<S> {
    pub fn new<P: AsRef<Path>>(directory: P, serializer: S) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            serializer,
            capacity: DEFAULT_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
            max_idle_pages: DEFAULT_MAX_IDLE_PAGES,
        }
    }

    /// Maximum element count for a freshly created queue.
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Size in bytes of each page file. Must lie within
    /// [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`].
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Cap on drained pages kept mapped for reuse before their files are
    /// deleted.
    pub fn max_idle_pages(mut self, max_idle_pages: usize) -> Self {
        self.max_idle_pages = max_idle_pages;
        self
    }

    /// Swaps the element codec, keeping every other setting.
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> QueueBuilder<S2> {
        QueueBuilder {
            directory: self.directory,
            serializer,
            capacity: self.capacity,
            page_size: self.page_size,
            max_idle_pages: self.max_idle_pages,
        }
    }

    /// Validates the configuration and opens (or creates) the queue.
    pub fn open(self) -> Result<PersistentQueue<S>> {
        ensure!(
            (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size),
            "page size must be within [{MIN_PAGE_SIZE}, {MAX_PAGE_SIZE}] bytes, got {}",
            self.page_size
        );

        let log = ByteLog::open(
            &self.directory,
            self.capacity,
            self.page_size as usize,
            self.max_idle_pages,
        )?;
        Ok(PersistentQueue::from_parts(
            self.directory,
            self.serializer,
            log,
        ))
    }
}
