//! # Memory-Mapped Page
//!
//! A `Page` is one file inside the queue directory, named by its decimal id
//! and mapped into memory at a fixed size. The last four bytes of every page
//! store the id of its successor in the byte log's page chain (0 means no
//! successor); everything before that is payload.
//!
//! ```text
//! +------------------------------+
//! |  Payload                     |
//! |  [0, page_size - 4)          |
//! +------------------------------+
//! |  next page id (4 bytes, LE)  |
//! +------------------------------+
//! ```
//!
//! Pages are created zero-filled, so a fresh page's next pointer is already
//! the null id. Writes go straight into the mapping; [`Page::sync`] issues
//! an msync. Dropping a `Page` unmaps it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

use crate::config::NEXT_POINTER_SIZE;

#[derive(Debug)]
pub struct Page {
    id: u32,
    page_size: usize,
    mmap: MmapMut,
}

impl Page {
    /// Path of the page file for `id` inside `directory`.
    pub fn file_path(directory: &Path, id: u32) -> PathBuf {
        directory.join(id.to_string())
    }

    /// Creates the page file for `id`, extends it to `page_size` bytes, and
    /// maps it. The file must not already exist with foreign content; the
    /// queue only calls this for ids the allocator has never handed out.
    pub fn create(directory: &Path, id: u32, page_size: usize) -> Result<Self> {
        let path = Self::file_path(directory, id);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to create page file '{}'", path.display()))?;

        file.set_len(page_size as u64)
            .wrap_err_with(|| format!("failed to size page file '{}'", path.display()))?;

        // SAFETY: MmapMut::map_mut is unsafe because externally-modified
        // mappings are undefined behavior. This is safe because:
        // 1. The file was just created and truncated by this process
        // 2. Queue directories are single-process by contract
        // 3. The mapping's lifetime is tied to Page, which unmaps on drop
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            id,
            page_size,
            mmap,
        })
    }

    /// Maps the existing page file for `id`. Fails if the file is missing
    /// or its length does not match `page_size`.
    pub fn open(directory: &Path, id: u32, page_size: usize) -> Result<Self> {
        let path = Self::file_path(directory, id);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open page file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat page file '{}'", path.display()))?;

        ensure!(
            metadata.len() == page_size as u64,
            "page file '{}' is {} bytes, expected {}",
            path.display(),
            metadata.len(),
            page_size
        );

        // SAFETY: MmapMut::map_mut is unsafe because externally-modified
        // mappings are undefined behavior. This is safe because:
        // 1. Queue directories are single-process by contract
        // 2. The file length was validated against page_size above
        // 3. The mapping's lifetime is tied to Page, which unmaps on drop
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            id,
            page_size,
            mmap,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload bytes still addressable at and after `offset`.
    pub fn remaining(&self, offset: usize) -> usize {
        self.payload_size() - offset
    }

    /// Copies `dst.len()` payload bytes starting at `offset` into `dst`.
    /// Callers stay inside the payload region via [`Page::remaining`].
    pub fn read(&self, offset: usize, dst: &mut [u8]) {
        debug_assert!(offset + dst.len() <= self.payload_size());
        dst.copy_from_slice(&self.mmap[offset..offset + dst.len()]);
    }

    /// Copies `src` into the payload region starting at `offset`.
    pub fn write(&mut self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.payload_size());
        self.mmap[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Id of the successor page, or 0 if none.
    pub fn next_page(&self) -> u32 {
        let offset = self.payload_size();
        u32::from_le_bytes(self.mmap[offset..offset + 4].try_into().unwrap())
    }

    pub fn set_next_page(&mut self, id: u32) {
        let offset = self.payload_size();
        self.mmap[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
    }

    /// Flushes the mapping to disk (msync).
    pub fn sync(&self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err_with(|| format!("failed to sync page {}", self.id))
    }

    fn payload_size(&self) -> usize {
        self.page_size - NEXT_POINTER_SIZE
    }
}
