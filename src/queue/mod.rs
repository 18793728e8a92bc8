//! # Persistent Blocking Queue
//!
//! [`PersistentQueue`] behaves like an in-memory bounded blocking queue
//! whose contents survive process restarts. Elements are encoded by a
//! user-supplied [`Serializer`] and stored in a directory of memory-mapped
//! page files; the on-disk index keeps the element count and cursors, so a
//! reopened queue resumes exactly where it left off.
//!
//! ## Concurrency
//!
//! Every operation serializes on one `parking_lot::Mutex` around the byte
//! log. The blocking variants (`put`, `take`, and their timed forms) wait
//! on `not_full` / `not_empty` condvars, re-checking the predicate on every
//! wakeup. Encoding runs before the lock is taken and decoding after it is
//! released, so user codecs never execute under the lock — except in
//! [`PersistentQueue::drain_to`], which decodes as it drains and documents
//! the consequences.
//!
//! ## Durability
//!
//! Writes land in mmap regions and reach disk when the OS flushes them, on
//! [`PersistentQueue::sync`], or on drop. A crash can lose the most recent
//! enqueues, but the index always describes a valid FIFO prefix: the length
//! prefix is written before its payload and the element count is bumped
//! last, so no partial element is ever observable after recovery.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmapq::{PersistentQueue, QueueBuilder, StringSerializer};
//!
//! let queue = QueueBuilder::new("./outbox", StringSerializer)
//!     .capacity(1024)
//!     .open()?;
//!
//! queue.put(&"hello".to_string())?;
//! assert_eq!(queue.poll()?, Some("hello".to_string()));
//! ```

mod builder;

pub use builder::QueueBuilder;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eyre::Result;
use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::serialize::{JsonSerializer, Serializer};
use crate::storage::ByteLog;

pub struct PersistentQueue<S: Serializer> {
    directory: PathBuf,
    serializer: S,
    log: Mutex<ByteLog>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<S: Serializer> std::fmt::Debug for PersistentQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentQueue")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl<T: Serialize + DeserializeOwned> PersistentQueue<JsonSerializer<T>> {
    /// Opens `directory` with the default JSON codec and default
    /// configuration. See [`QueueBuilder`] for the tunable form.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        QueueBuilder::new(directory, JsonSerializer::new()).open()
    }
}

impl<S: Serializer> PersistentQueue<S> {
    pub(crate) fn from_parts(directory: PathBuf, serializer: S, log: ByteLog) -> Self {
        Self {
            directory,
            serializer,
            log: Mutex::new(log),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues `item`, blocking while the queue is full.
    pub fn put(&self, item: &S::Item) -> Result<()> {
        let data = self.serializer.encode(item)?;
        let mut log = self.log.lock();
        while log.is_full() {
            self.not_full.wait(&mut log);
        }
        log.push(&data)?;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueues `item` if the queue has room, returning whether it did.
    pub fn offer(&self, item: &S::Item) -> Result<bool> {
        let data = self.serializer.encode(item)?;
        let mut log = self.log.lock();
        if log.is_full() {
            return Ok(false);
        }
        log.push(&data)?;
        self.not_empty.notify_one();
        Ok(true)
    }

    /// Like [`PersistentQueue::put`] but gives up once `timeout` elapses
    /// without room appearing. A zero timeout returns immediately.
    pub fn offer_timeout(&self, item: &S::Item, timeout: Duration) -> Result<bool> {
        let data = self.serializer.encode(item)?;
        let deadline = Instant::now() + timeout;
        let mut log = self.log.lock();
        while log.is_full() {
            if self.not_full.wait_until(&mut log, deadline).timed_out() && log.is_full() {
                return Ok(false);
            }
        }
        log.push(&data)?;
        self.not_empty.notify_one();
        Ok(true)
    }

    /// Dequeues the head element, blocking while the queue is empty.
    pub fn take(&self) -> Result<S::Item> {
        let frame = {
            let mut log = self.log.lock();
            while log.is_empty() {
                self.not_empty.wait(&mut log);
            }
            let frame = log.pop()?;
            self.not_full.notify_one();
            frame
        };
        self.serializer.decode(&frame)
    }

    /// Dequeues the head element, or returns `None` if the queue is empty.
    pub fn poll(&self) -> Result<Option<S::Item>> {
        let frame = {
            let mut log = self.log.lock();
            if log.is_empty() {
                None
            } else {
                let frame = log.pop()?;
                self.not_full.notify_one();
                Some(frame)
            }
        };
        self.decode_opt(frame)
    }

    /// Like [`PersistentQueue::take`] but gives up once `timeout` elapses
    /// with the queue still empty. A zero timeout returns immediately.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<S::Item>> {
        let deadline = Instant::now() + timeout;
        let frame = {
            let mut log = self.log.lock();
            loop {
                if !log.is_empty() {
                    let frame = log.pop()?;
                    self.not_full.notify_one();
                    break Some(frame);
                }
                if self.not_empty.wait_until(&mut log, deadline).timed_out() && log.is_empty() {
                    break None;
                }
            }
        };
        self.decode_opt(frame)
    }

    /// Returns the head element without removing it, or `None` if empty.
    /// Repeated peeks see the same element; no page is released.
    pub fn peek(&self) -> Result<Option<S::Item>> {
        let frame = {
            let mut log = self.log.lock();
            if log.is_empty() {
                None
            } else {
                Some(log.peek()?)
            }
        };
        self.decode_opt(frame)
    }

    /// Dequeues up to `max_elements` elements in FIFO order into `out`,
    /// returning how many were moved. Signals waiting producers once at the
    /// end if anything was drained.
    ///
    /// If decoding fails mid-drain, the frames consumed so far (including
    /// the one that failed) are already off the queue and are lost.
    pub fn drain_to(&self, out: &mut Vec<S::Item>, max_elements: usize) -> Result<usize> {
        if max_elements == 0 {
            return Ok(0);
        }
        let mut log = self.log.lock();
        let target = max_elements.min(log.len() as usize);
        let mut drained = 0;
        let mut failure = None;
        while drained < target {
            match log.pop().and_then(|frame| self.serializer.decode(&frame)) {
                Ok(item) => {
                    out.push(item);
                    drained += 1;
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        if drained > 0 {
            self.not_full.notify_one();
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(drained),
        }
    }

    /// Decodes a copy of every enqueued element in FIFO order without
    /// consuming anything. Frames are gathered under one lock acquisition;
    /// decoding happens after release.
    pub fn snapshot(&self) -> Result<Vec<S::Item>> {
        let frames = self.log.lock().snapshot()?;
        frames
            .iter()
            .map(|frame| self.serializer.decode(frame))
            .collect()
    }

    /// Number of elements currently enqueued.
    pub fn len(&self) -> usize {
        self.log.lock().len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// The element-count bound fixed when the queue directory was created.
    pub fn capacity(&self) -> usize {
        self.log.lock().capacity() as usize
    }

    /// How many more elements fit right now.
    pub fn remaining_capacity(&self) -> usize {
        let log = self.log.lock();
        (log.capacity() - log.len()) as usize
    }

    /// Flushes all page mappings and the index to disk.
    pub fn sync(&self) -> Result<()> {
        self.log.lock().sync()
    }

    pub fn path(&self) -> &Path {
        &self.directory
    }

    fn decode_opt(&self, frame: Option<Vec<u8>>) -> Result<Option<S::Item>> {
        match frame {
            Some(frame) => Ok(Some(self.serializer.decode(&frame)?)),
            None => Ok(None),
        }
    }
}

impl<S: Serializer> Drop for PersistentQueue<S> {
    fn drop(&mut self) {
        if let Err(error) = self.log.lock().sync() {
            warn!(%error, "failed to flush queue on drop");
        }
    }
}
