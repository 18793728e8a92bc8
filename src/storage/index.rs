//! # Queue Index
//!
//! The 24-byte `.index` file is the single source of truth for the queue's
//! element count, capacity, and head/tail cursors. Six little-endian u32
//! fields at fixed offsets:
//!
//! ```text
//! Offset  Field        Meaning
//! ------  -----------  -------------------------------------------
//! 0       size         Elements currently enqueued
//! 4       capacity     Maximum element count (fixed at creation)
//! 8       head_page    Page id holding the next byte to read
//! 12      head_offset  Offset of that byte within head_page
//! 16      tail_page    Page id holding the next byte to write
//! 20      tail_offset  Offset of that byte within tail_page
//! ```
//!
//! The file is memory-mapped; setters write straight through the mapping.

use std::fs::OpenOptions;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::INDEX_FILE_SIZE;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct IndexHeader {
    size: U32,
    capacity: U32,
    head_page: U32,
    head_offset: U32,
    tail_page: U32,
    tail_offset: U32,
}

const _: () = assert!(std::mem::size_of::<IndexHeader>() == INDEX_FILE_SIZE);

impl IndexHeader {
    /// Fresh-queue state: empty, both cursors at page 1, offset 0.
    fn new(capacity: u32) -> Self {
        Self {
            size: U32::new(0),
            capacity: U32::new(capacity),
            head_page: U32::new(1),
            head_offset: U32::new(0),
            tail_page: U32::new(1),
            tail_offset: U32::new(0),
        }
    }
}

#[derive(Debug)]
pub struct QueueIndex {
    mmap: MmapMut,
}

impl QueueIndex {
    /// Creates and initializes the index file for a fresh queue.
    pub fn create(path: &Path, capacity: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create index file '{}'", path.display()))?;

        file.set_len(INDEX_FILE_SIZE as u64)
            .wrap_err_with(|| format!("failed to size index file '{}'", path.display()))?;

        // SAFETY: MmapMut::map_mut is unsafe because externally-modified
        // mappings are undefined behavior. This is safe because:
        // 1. The file was just created and truncated by this process
        // 2. Queue directories are single-process by contract
        // 3. The mapping's lifetime is tied to QueueIndex
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let mut index = Self { mmap };
        *index.header_mut() = IndexHeader::new(capacity);
        index.sync()?;
        Ok(index)
    }

    /// Opens an existing index file. The stored capacity is authoritative.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open index file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat index file '{}'", path.display()))?;
        ensure!(
            metadata.len() == INDEX_FILE_SIZE as u64,
            "index file '{}' is {} bytes, expected {}",
            path.display(),
            metadata.len(),
            INDEX_FILE_SIZE
        );

        // SAFETY: MmapMut::map_mut is unsafe because externally-modified
        // mappings are undefined behavior. This is safe because:
        // 1. Queue directories are single-process by contract
        // 2. The file length was validated above
        // 3. The mapping's lifetime is tied to QueueIndex
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self { mmap })
    }

    pub fn size(&self) -> u32 {
        self.header().size.get()
    }

    pub fn set_size(&mut self, size: u32) {
        self.header_mut().size = U32::new(size);
    }

    pub fn capacity(&self) -> u32 {
        self.header().capacity.get()
    }

    pub fn head_page(&self) -> u32 {
        self.header().head_page.get()
    }

    pub fn set_head_page(&mut self, page: u32) {
        self.header_mut().head_page = U32::new(page);
    }

    pub fn head_offset(&self) -> u32 {
        self.header().head_offset.get()
    }

    pub fn set_head_offset(&mut self, offset: u32) {
        self.header_mut().head_offset = U32::new(offset);
    }

    pub fn tail_page(&self) -> u32 {
        self.header().tail_page.get()
    }

    pub fn set_tail_page(&mut self, page: u32) {
        self.header_mut().tail_page = U32::new(page);
    }

    pub fn tail_offset(&self) -> u32 {
        self.header().tail_offset.get()
    }

    pub fn set_tail_offset(&mut self, offset: u32) {
        self.header_mut().tail_offset = U32::new(offset);
    }

    /// Flushes the mapping to disk (msync).
    pub fn sync(&self) -> Result<()> {
        self.mmap.flush().wrap_err("failed to sync queue index")
    }

    fn header(&self) -> &IndexHeader {
        // The mapping is exactly header-sized and IndexHeader is Unaligned.
        IndexHeader::ref_from_bytes(&self.mmap[..INDEX_FILE_SIZE])
            .expect("index mapping is header-sized")
    }

    fn header_mut(&mut self) -> &mut IndexHeader {
        IndexHeader::mut_from_bytes(&mut self.mmap[..INDEX_FILE_SIZE])
            .expect("index mapping is header-sized")
    }
}
