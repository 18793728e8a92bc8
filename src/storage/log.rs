//! # Paged Byte Log
//!
//! The byte log turns a chain of fixed-size pages into one contiguous byte
//! stream with a persistent read cursor (head) and write cursor (tail).
//! Elements are framed as a 4-byte little-endian length prefix followed by
//! the payload; neither needs to fit in a single page.
//!
//! ## Cursor Discipline
//!
//! Writing appends at the tail cursor, acquiring a fresh page and linking it
//! via the on-page next pointer whenever the payload region runs out.
//! Reading consumes at the head cursor; when a read crosses into a successor
//! page the drained head page is released back to the allocator. Both
//! cursors are persisted to the index at the end of each primitive, so on
//! recovery the index always describes a valid FIFO prefix of complete
//! frames. Peeking walks the same chain on local cursor copies and touches
//! neither the index nor the allocator's idle list.
//!
//! ## Ownership
//!
//! The log owns the index and the allocator. All primitives take `&mut
//! self`; the queue serializes access behind its lock.

use std::fs;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use tracing::debug;

use crate::config::{INDEX_FILE_NAME, LENGTH_PREFIX_SIZE};
use super::{PageAllocator, QueueIndex};

#[derive(Debug)]
pub struct ByteLog {
    index: QueueIndex,
    allocator: PageAllocator,
    head: u32,
    tail: u32,
}

impl ByteLog {
    /// Opens or creates the queue directory.
    ///
    /// A missing or empty directory becomes a fresh queue with the given
    /// capacity. A nonempty directory must already be a queue (contain an
    /// index file); its stored capacity wins over `capacity`.
    pub fn open(
        directory: &Path,
        capacity: u32,
        page_size: usize,
        max_idle: usize,
    ) -> Result<Self> {
        let index_path = directory.join(INDEX_FILE_NAME);

        let fresh = if directory.exists() {
            let is_empty = fs::read_dir(directory)
                .wrap_err_with(|| {
                    format!("failed to read queue directory '{}'", directory.display())
                })?
                .next()
                .is_none();
            if !is_empty {
                ensure!(
                    index_path.exists(),
                    "'{}' already exists and is not a persistent queue",
                    directory.display()
                );
            }
            is_empty
        } else {
            fs::create_dir_all(directory).wrap_err_with(|| {
                format!("failed to create queue directory '{}'", directory.display())
            })?;
            true
        };

        let mut allocator = PageAllocator::new(directory, page_size, max_idle)?;

        if fresh {
            let index = QueueIndex::create(&index_path, capacity)?;
            let first = allocator.acquire()?;
            debug_assert_eq!(first, index.head_page());
            debug!(
                directory = %directory.display(),
                capacity,
                page_size,
                "created persistent queue"
            );
            Ok(Self {
                index,
                allocator,
                head: first,
                tail: first,
            })
        } else {
            let index = QueueIndex::open(&index_path)?;
            let head = index.head_page();
            let tail = index.tail_page();
            allocator.acquire_id(head)?;
            allocator.acquire_id(tail)?;
            debug!(
                directory = %directory.display(),
                size = index.size(),
                "opened persistent queue"
            );
            Ok(Self {
                index,
                allocator,
                head,
                tail,
            })
        }
    }

    /// Appends one framed element and bumps the persisted size.
    pub fn push(&mut self, frame: &[u8]) -> Result<()> {
        ensure!(
            frame.len() <= u32::MAX as usize,
            "element of {} bytes exceeds the frame length limit",
            frame.len()
        );
        self.write(&(frame.len() as u32).to_le_bytes())?;
        self.write(frame)?;
        let size = self.index.size();
        self.index.set_size(size + 1);
        Ok(())
    }

    /// Consumes and returns the head element. Callers check `len() > 0`
    /// first; the page chain always holds `size` complete frames.
    pub fn pop(&mut self) -> Result<Vec<u8>> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.read(&mut prefix)?;
        let mut frame = vec![0u8; u32::from_le_bytes(prefix) as usize];
        self.read(&mut frame)?;
        let size = self.index.size();
        self.index.set_size(size - 1);
        Ok(frame)
    }

    /// Returns a copy of the head element without advancing the head cursor
    /// or releasing any page.
    pub fn peek(&mut self) -> Result<Vec<u8>> {
        let mut page = self.head;
        let mut offset = self.index.head_offset() as usize;
        self.peek_frame(&mut page, &mut offset)
    }

    /// Copies out every enqueued element in FIFO order, cursors untouched.
    pub fn snapshot(&mut self) -> Result<Vec<Vec<u8>>> {
        let count = self.index.size() as usize;
        let mut frames = Vec::with_capacity(count);
        let mut page = self.head;
        let mut offset = self.index.head_offset() as usize;
        for _ in 0..count {
            frames.push(self.peek_frame(&mut page, &mut offset)?);
        }
        Ok(frames)
    }

    pub fn len(&self) -> u32 {
        self.index.size()
    }

    pub fn capacity(&self) -> u32 {
        self.index.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.index.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.index.size() == self.index.capacity()
    }

    /// Flushes every page mapping and the index to disk.
    pub fn sync(&self) -> Result<()> {
        self.allocator.sync_all()?;
        self.index.sync()
    }

    /// Writes `src` at the tail cursor, extending the page chain as needed,
    /// then persists the cursor.
    fn write(&mut self, src: &[u8]) -> Result<()> {
        let mut offset = 0;
        let mut tail_offset = self.index.tail_offset() as usize;

        while offset < src.len() {
            let tail = self.allocator.page_mut(self.tail)?;
            let available = tail.remaining(tail_offset);
            let needed = src.len() - offset;
            if available < needed {
                tail.write(tail_offset, &src[offset..offset + available]);
                offset += available;
                let next = self.allocator.acquire()?;
                self.allocator.page_mut(self.tail)?.set_next_page(next);
                self.tail = next;
                tail_offset = 0;
            } else {
                tail.write(tail_offset, &src[offset..offset + needed]);
                tail_offset += needed;
                offset += needed;
            }
        }

        self.index.set_tail_page(self.tail);
        self.index.set_tail_offset(tail_offset as u32);
        Ok(())
    }

    /// Fills `dst` from the head cursor, releasing each page the cursor
    /// drains past, then persists the cursor.
    fn read(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        let mut head_offset = self.index.head_offset() as usize;

        while offset < dst.len() {
            let head = self.allocator.page(self.head)?;
            let available = head.remaining(head_offset);
            let needed = dst.len() - offset;
            if available < needed {
                head.read(head_offset, &mut dst[offset..offset + available]);
                let next = head.next_page();
                offset += available;
                self.allocator.acquire_id(next)?;
                self.allocator.release(self.head)?;
                self.head = next;
                head_offset = 0;
            } else {
                head.read(head_offset, &mut dst[offset..offset + needed]);
                offset += needed;
                head_offset += needed;
            }
        }

        self.index.set_head_page(self.head);
        self.index.set_head_offset(head_offset as u32);
        Ok(())
    }

    /// Reads one frame at the given cursor, advancing only the cursor.
    fn peek_frame(&mut self, page: &mut u32, offset: &mut usize) -> Result<Vec<u8>> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.peek_into(page, offset, &mut prefix)?;
        let mut frame = vec![0u8; u32::from_le_bytes(prefix) as usize];
        self.peek_into(page, offset, &mut frame)?;
        Ok(frame)
    }

    fn peek_into(&mut self, page_id: &mut u32, page_offset: &mut usize, dst: &mut [u8]) -> Result<()> {
        let mut offset = 0;

        while offset < dst.len() {
            let page = self.allocator.page(*page_id)?;
            let available = page.remaining(*page_offset);
            let needed = dst.len() - offset;
            if available < needed {
                page.read(*page_offset, &mut dst[offset..offset + available]);
                let next = page.next_page();
                offset += available;
                self.allocator.acquire_id(next)?;
                *page_id = next;
                *page_offset = 0;
            } else {
                page.read(*page_offset, &mut dst[offset..offset + needed]);
                offset += needed;
                *page_offset += needed;
            }
        }
        Ok(())
    }
}
