//! Paged window over a random-access backing store.
//!
//! Node records are addressed by index. Instead of one seek and one read per
//! record, the buffer keeps a fixed-capacity window of consecutive records
//! in memory. Reads and writes go to the window; the window only touches
//! the store when a record outside of it is requested, when it is flushed,
//! and when it is closed.
//!
//! Only the bytes `[0, dirty_limit)` of the window are written back, so a
//! window that was only read never causes a write.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use super::access_types::{PagedStats, TreeError, TreeResult};
use crate::node::NodeId;

/// A linear byte store the paged buffer can slide over.
pub trait BackingStore: Read + Write + Seek {
    /// Pushes written bytes down to durable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl BackingStore for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl BackingStore for Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fixed-capacity window of node records over a backing store.
pub struct PagedBuffer<S: BackingStore> {
    store: Option<S>,
    window: Vec<u8>,
    record_size: usize,
    /// Offset of record 1 in the store
    base_pos: u64,
    /// Offset of the window's first byte in the store
    window_start: u64,
    /// Bytes of the window that must be written back
    dirty_limit: usize,
    cursor: usize,
    stats: PagedStats,
}

impl<S: BackingStore> PagedBuffer<S> {
    /// Creates a buffer whose window holds as many whole records as fit in
    /// `buffer_size` bytes (at least one) and loads the first window.
    pub fn new(store: S, base_pos: u64, record_size: usize, buffer_size: usize) -> TreeResult<Self> {
        if record_size == 0 {
            return Err(TreeError::InvalidConfig(
                "record size must be greater than zero".into(),
            ));
        }
        let records = (buffer_size / record_size).max(1);

        let mut buffer = Self {
            store: Some(store),
            window: vec![0u8; records * record_size],
            record_size,
            base_pos,
            window_start: base_pos,
            dirty_limit: 0,
            cursor: 0,
            stats: PagedStats::default(),
        };
        buffer.load_window()?;
        Ok(buffer)
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    pub fn records_per_window(&self) -> usize {
        self.window.len() / self.record_size
    }

    pub fn base_pos(&self) -> u64 {
        self.base_pos
    }

    pub fn window_start(&self) -> u64 {
        self.window_start
    }

    pub fn dirty_limit(&self) -> usize {
        self.dirty_limit
    }

    pub fn stats(&self) -> PagedStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_none()
    }

    /// The backing store, while the buffer is open.
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Byte offset of record `node_index` in the store.
    pub fn record_offset(&self, node_index: NodeId) -> u64 {
        self.base_pos + u64::from(node_index.saturating_sub(1)) * self.record_size as u64
    }

    /// Positions the cursor on record `node_index` (1-based), sliding the
    /// window when the record lies outside of it.
    pub fn seek(&mut self, node_index: NodeId) -> TreeResult<()> {
        if self.store.is_none() {
            return Err(TreeError::Closed);
        }
        let pos = self.record_offset(node_index);
        let capacity = self.window.len() as u64;

        if pos < self.window_start || pos >= self.window_start + capacity {
            self.flush()?;
            self.window_start = self.base_pos + (pos - self.base_pos) / capacity * capacity;
            log::trace!(
                "Sliding window to offset {} for record {}",
                self.window_start,
                node_index
            );
            self.load_window()?;
        }

        self.cursor = (pos - self.window_start) as usize;
        Ok(())
    }

    /// The record under the cursor.
    pub fn record(&self) -> &[u8] {
        &self.window[self.cursor..self.cursor + self.record_size]
    }

    /// The record under the cursor, marked as needing write-back.
    pub fn record_mut(&mut self) -> &mut [u8] {
        let end = self.cursor + self.record_size;
        self.dirty_limit = self.dirty_limit.max(end);
        &mut self.window[self.cursor..end]
    }

    /// Writes `[0, dirty_limit)` of the window back to the store.
    pub fn flush(&mut self) -> TreeResult<()> {
        if self.dirty_limit == 0 {
            return Ok(());
        }
        let store = self.store.as_mut().ok_or(TreeError::Closed)?;
        store.seek(SeekFrom::Start(self.window_start))?;
        store.write_all(&self.window[..self.dirty_limit])?;
        store.flush()?;

        log::trace!(
            "Flushed {} bytes at offset {}",
            self.dirty_limit,
            self.window_start
        );
        self.stats.window_flushes += 1;
        self.stats.bytes_flushed += self.dirty_limit as u64;
        self.dirty_limit = 0;
        Ok(())
    }

    /// Flushes, then puts the window back on record 1 as if freshly opened.
    pub fn flush_and_rewind(&mut self) -> TreeResult<()> {
        self.flush()?;
        self.window_start = self.base_pos;
        self.cursor = 0;
        self.load_window()?;
        let base_pos = self.base_pos;
        self.store
            .as_mut()
            .ok_or(TreeError::Closed)?
            .seek(SeekFrom::Start(base_pos))?;
        Ok(())
    }

    /// Writes bytes outside of the record area (header fields).
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> TreeResult<()> {
        let store = self.store.as_mut().ok_or(TreeError::Closed)?;
        store.seek(SeekFrom::Start(offset))?;
        store.write_all(bytes)?;
        Ok(())
    }

    /// Reads bytes outside of the record area (header fields).
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TreeResult<()> {
        let store = self.store.as_mut().ok_or(TreeError::Closed)?;
        store.seek(SeekFrom::Start(offset))?;
        store.read_exact(buf)?;
        Ok(())
    }

    pub fn sync(&mut self) -> TreeResult<()> {
        self.store.as_mut().ok_or(TreeError::Closed)?.sync()?;
        Ok(())
    }

    /// Flushes, syncs and releases the store.
    ///
    /// The store is released even when the flush fails; the flush error is
    /// still returned. Closing a closed buffer does nothing.
    pub fn close(&mut self) -> TreeResult<()> {
        if self.store.is_none() {
            return Ok(());
        }
        let flushed = self.flush().and_then(|_| self.sync());
        drop(self.release());
        flushed
    }

    /// Takes the store out of the buffer without flushing.
    pub fn release(&mut self) -> Option<S> {
        self.window = Vec::new();
        self.dirty_limit = 0;
        self.cursor = 0;
        self.store.take()
    }

    fn load_window(&mut self) -> TreeResult<()> {
        let store = self.store.as_mut().ok_or(TreeError::Closed)?;
        store.seek(SeekFrom::Start(self.window_start))?;
        let filled = read_fully(store, &mut self.window)?;
        // Past the end of the store the window reads as zeros.
        self.window[filled..].fill(0);
        self.stats.window_loads += 1;
        Ok(())
    }
}

/// Reads until `buf` is full or the reader reports end of data.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
