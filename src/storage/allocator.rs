//! # Page Allocator
//!
//! Owns every mapped page of one queue directory and hands pages out by id.
//!
//! ## Design Overview
//!
//! The allocator is the authoritative owner of page mappings. The byte log
//! refers to pages only by id and borrows them per operation, which keeps
//! the page graph an arena-with-indices: successor links on disk are ids,
//! never object references.
//!
//! Fresh ids come from a monotonic counter seeded by scanning the directory
//! for numeric file names (`max + 1`, or 1 for an empty directory). Page id
//! 0 is the null id and is never allocated.
//!
//! ## Idle Cache
//!
//! Pages the consumer has fully drained are released rather than deleted.
//! Released ids sit in an insertion-ordered idle list, capped at `max_idle`;
//! overflow evicts the oldest entry by unmapping it and deleting its file.
//! Reuse also takes the oldest entry, which keeps recently released pages
//! mapped: producers tend to want the page the consumer just vacated.
//!
//! ## Thread Safety
//!
//! Not thread-safe on its own. The queue serializes all access behind its
//! lock, the same way TurDB shields its freelist behind the pager.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use hashbrown::HashMap;
use tracing::{debug, trace};

use super::Page;

#[derive(Debug)]
pub struct PageAllocator {
    directory: PathBuf,
    page_size: usize,
    max_idle: usize,
    next_id: u32,
    /// Every currently mapped page, in-use or idle.
    open: HashMap<u32, Page>,
    /// Released ids, oldest first. Always a subset of `open`'s keys.
    idle: VecDeque<u32>,
}

impl PageAllocator {
    /// Scans `directory` for existing page files and seeds the id counter
    /// past the highest one found.
    pub fn new(directory: &Path, page_size: usize, max_idle: usize) -> Result<Self> {
        let mut max_seen = 0u32;

        let entries = fs::read_dir(directory)
            .wrap_err_with(|| format!("failed to scan queue directory '{}'", directory.display()))?;
        for entry in entries {
            let entry = entry.wrap_err_with(|| {
                format!("failed to scan queue directory '{}'", directory.display())
            })?;
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) {
                max_seen = max_seen.max(id);
            }
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            page_size,
            max_idle,
            next_id: max_seen + 1,
            open: HashMap::new(),
            idle: VecDeque::new(),
        })
    }

    /// Returns a fresh page id: the oldest idle page if one exists (its next
    /// pointer reset to the null id), otherwise a newly created file under
    /// the next id.
    pub fn acquire(&mut self) -> Result<u32> {
        if let Some(id) = self.idle.pop_front() {
            self.page_mut(id)?.set_next_page(0);
            trace!(page = id, "reusing idle page");
            return Ok(id);
        }

        let id = self.next_id;
        let page = Page::create(&self.directory, id, self.page_size)?;
        self.next_id += 1;
        self.open.insert(id, page);
        debug!(page = id, "created page file");
        Ok(id)
    }

    /// Marks the page with this specific id in-use: removes it from the idle
    /// list if present and maps its file if not already open. Fails if the
    /// file does not exist.
    pub fn acquire_id(&mut self, id: u32) -> Result<()> {
        ensure!(id != 0, "page id 0 is the null page");

        if let Some(pos) = self.idle.iter().position(|&idle_id| idle_id == id) {
            self.idle.remove(pos);
        }
        if !self.open.contains_key(&id) {
            let page = Page::open(&self.directory, id, self.page_size)?;
            self.open.insert(id, page);
        }
        Ok(())
    }

    /// Marks a drained page idle, evicting the oldest idle page (unmap plus
    /// file delete) whenever the cache exceeds `max_idle`.
    pub fn release(&mut self, id: u32) -> Result<()> {
        ensure!(self.open.contains_key(&id), "released page {id} is not open");
        debug_assert!(!self.idle.contains(&id));

        self.idle.push_back(id);
        while self.idle.len() > self.max_idle {
            if let Some(victim) = self.idle.pop_front() {
                self.evict(victim)?;
            }
        }
        Ok(())
    }

    /// Borrows an open page.
    pub fn page(&self, id: u32) -> Result<&Page> {
        self.open
            .get(&id)
            .ok_or_else(|| eyre::eyre!("page {id} is not open"))
    }

    /// Mutably borrows an open page.
    pub fn page_mut(&mut self, id: u32) -> Result<&mut Page> {
        self.open
            .get_mut(&id)
            .ok_or_else(|| eyre::eyre!("page {id} is not open"))
    }

    /// Flushes every open mapping to disk.
    pub fn sync_all(&self) -> Result<()> {
        for page in self.open.values() {
            page.sync()?;
        }
        Ok(())
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    fn evict(&mut self, id: u32) -> Result<()> {
        // Drop the mapping before unlinking the file.
        self.open.remove(&id);
        let path = Page::file_path(&self.directory, id);
        fs::remove_file(&path)
            .wrap_err_with(|| format!("failed to delete evicted page '{}'", path.display()))?;
        debug!(page = id, "evicted idle page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    const PAGE_SIZE: usize = 1024;

    fn allocator(dir: &Path, max_idle: usize) -> PageAllocator {
        PageAllocator::new(dir, PAGE_SIZE, max_idle).unwrap()
    }

    #[test]
    fn acquire_hands_out_unique_positive_ids() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);

        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = allocator.acquire().unwrap();
            assert!(id > 0);
            assert!(seen.insert(id), "id {id} handed out twice");
        }
    }

    #[test]
    fn acquire_id_returns_same_backing_file() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);

        let id = allocator.acquire().unwrap();
        allocator.page_mut(id).unwrap().write(0, b"same file");
        allocator.acquire_id(id).unwrap();

        let mut buf = [0u8; 9];
        allocator.page(id).unwrap().read(0, &mut buf);
        assert_eq!(&buf, b"same file");
    }

    #[test]
    fn acquire_id_rejects_null_id() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);

        assert!(allocator.acquire_id(0).is_err());
    }

    #[test]
    fn acquire_id_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);

        assert!(allocator.acquire_id(5).is_err());
    }

    #[test]
    fn released_pages_are_reused_oldest_first() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 4);
        let a = allocator.acquire().unwrap();
        let b = allocator.acquire().unwrap();
        let c = allocator.acquire().unwrap();

        allocator.release(a).unwrap();
        allocator.release(b).unwrap();
        allocator.release(c).unwrap();

        assert_eq!(allocator.acquire().unwrap(), a);
        assert_eq!(allocator.acquire().unwrap(), b);
        assert_eq!(allocator.acquire().unwrap(), c);
    }

    #[test]
    fn reused_page_has_null_next_pointer() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);
        let id = allocator.acquire().unwrap();
        allocator.page_mut(id).unwrap().set_next_page(99);

        allocator.release(id).unwrap();
        let reused = allocator.acquire().unwrap();

        assert_eq!(reused, id);
        assert_eq!(allocator.page(reused).unwrap().next_page(), 0);
    }

    #[test]
    fn overflow_evicts_oldest_idle_page_and_deletes_file() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 1);
        let a = allocator.acquire().unwrap();
        let b = allocator.acquire().unwrap();

        allocator.release(a).unwrap();
        allocator.release(b).unwrap();

        assert!(!Page::file_path(dir.path(), a).exists());
        assert!(Page::file_path(dir.path(), b).exists());
        assert_eq!(allocator.idle_count(), 1);
        assert_eq!(allocator.open_count(), 1);
    }

    #[test]
    fn zero_max_idle_deletes_released_pages_immediately() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 0);
        let id = allocator.acquire().unwrap();

        allocator.release(id).unwrap();

        assert!(!Page::file_path(dir.path(), id).exists());
        assert_eq!(allocator.open_count(), 0);
    }

    #[test]
    fn evicted_ids_are_not_reissued() {
        let dir = tempdir().unwrap();
        let mut allocator = allocator(dir.path(), 0);
        let a = allocator.acquire().unwrap();
        allocator.release(a).unwrap();

        let b = allocator.acquire().unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn directory_scan_seeds_counter_past_existing_pages() {
        let dir = tempdir().unwrap();
        {
            let mut first = allocator(dir.path(), 4);
            for _ in 0..3 {
                first.acquire().unwrap();
            }
        }

        let mut reopened = allocator(dir.path(), 4);

        assert_eq!(reopened.acquire().unwrap(), 4);
    }

    #[test]
    fn directory_scan_ignores_non_numeric_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".index"), [0u8; 24]).unwrap();

        let mut allocator = allocator(dir.path(), 1);

        assert_eq!(allocator.acquire().unwrap(), 1);
    }
}
