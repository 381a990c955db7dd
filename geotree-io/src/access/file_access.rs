//! File-backed tree access.
//!
//! A tree file is a [`TreeHeader`] followed by fixed-size node records, node
//! 1 first. Records go through a [`PagedBuffer`], so a search touches the
//! store once per window rather than once per node, and only reads the
//! links and boundary of each record it visits.
//!
//! The highest written node ID, tree identifier and element count are only
//! written back to the header by [`FileTreeAccess::flush`] and
//! [`TreeAccess::close`]. A file whose header still says `node_id == 0` was
//! never finalized and is refused by [`FileTreeAccess::open`].
//!
//! After [`TreeAccess::rewind`] the records of the previous tree stay on
//! disk. Until a node is written again, flushing or closing keeps the
//! previous counters, so the file still opens as the tree it was before.

use std::fs::{File, OpenOptions as FsOpenOptions};
use std::io::{self, SeekFrom};
use std::path::Path;

use super::access_config::{OpenOptions, TreeAccessConfig};
use super::access_constants::COUNTERS_OFFSET;
use super::access_types::{PagedStats, TreeError, TreeResult};
use super::header::TreeHeader;
use super::paged_buffer::{BackingStore, PagedBuffer};
use super::record_codec::RecordCodec;
use super::tree_access::{AccessState, TreeAccess};
use crate::crs::{Crs, CrsCodec};
use crate::node::{intersects, ChildLink, Node, NodeId};

/// Tree access over a file, or any other [`BackingStore`].
pub struct FileTreeAccess<S: BackingStore = File> {
    buffer: PagedBuffer<S>,
    codec: RecordCodec,
    header: TreeHeader,
    state: AccessState,
    /// Highest node ID that has a record in the store
    written_limit: NodeId,
    /// Counters of the tree on disk before the last rewind, while nothing
    /// has been written since
    rewound: Option<TreeHeader>,
}

impl FileTreeAccess<File> {
    /// Creates (or truncates) the tree file at `path` and writes its header.
    pub fn create(path: impl AsRef<Path>, config: &TreeAccessConfig, crs: Crs) -> TreeResult<Self> {
        let path = path.as_ref();
        let file = FsOpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        log::debug!("Creating tree file {}", path.display());
        Self::create_in(file, config, crs)
    }

    /// Opens an existing tree file.
    ///
    /// Only the header and the root record are read.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions, crs_codec: &dyn CrsCodec) -> TreeResult<Self> {
        let path = path.as_ref();
        let file = FsOpenOptions::new().read(true).write(true).open(path)?;
        log::debug!("Opening tree file {}", path.display());
        Self::open_in(file, options, crs_codec)
    }

    /// Reads the header of a tree file without validating or opening it.
    pub fn read_header(path: impl AsRef<Path>) -> TreeResult<TreeHeader> {
        let mut file = File::open(path.as_ref())?;
        TreeHeader::read_from(&mut file, None)
    }
}

impl<S: BackingStore> FileTreeAccess<S> {
    /// Writes a fresh header to `store` and starts an empty tree after it.
    pub fn create_in(mut store: S, config: &TreeAccessConfig, crs: Crs) -> TreeResult<Self> {
        config.validate()?;
        let header = TreeHeader::new(config, &crs);
        let bytes = header.encode();
        store.seek(SeekFrom::Start(0))?;
        store.write_all(&bytes)?;
        store.flush()?;

        let codec = RecordCodec::new(config.byte_order, crs.boundary_len());
        let buffer = PagedBuffer::new(store, bytes.len() as u64, codec.record_size(), config.buffer_size)?;
        let state = AccessState::new(config.max_elements, config.split, config.hilbert_order, crs);

        log::debug!(
            "Created tree: {} dimensions, {} byte records, {} records per window",
            state.crs().dimension(),
            codec.record_size(),
            buffer.records_per_window()
        );
        Ok(Self {
            buffer,
            codec,
            header,
            state,
            written_limit: 0,
            rewound: None,
        })
    }

    /// Validates the header in `store` and reads the root record.
    pub fn open_in(mut store: S, options: &OpenOptions, crs_codec: &dyn CrsCodec) -> TreeResult<Self> {
        if options.buffer_size == 0 {
            return Err(TreeError::InvalidConfig(
                "buffer_size must be greater than zero".into(),
            ));
        }
        store.seek(SeekFrom::Start(0))?;
        let header = TreeHeader::read_from(&mut store, Some(options))?;
        let crs = crs_codec.decode(&header.crs)?;

        let codec = RecordCodec::new(header.byte_order, crs.boundary_len());
        let base_pos = header.encoded_len() as u64;
        let store_len = store.seek(SeekFrom::End(0))?;
        if store_len < base_pos + codec.record_size() as u64 {
            return Err(TreeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("tree store ends at byte {} before the root record", store_len),
            )));
        }

        let buffer = PagedBuffer::new(store, base_pos, codec.record_size(), options.buffer_size)?;
        let mut state = AccessState::new(header.max_elements, header.split, header.hilbert_order, crs);
        state.set_node_id_high_water(header.node_id);
        state.set_tree_identifier(header.tree_identifier);
        state.set_element_count(header.element_count);

        let mut access = Self {
            buffer,
            codec,
            written_limit: header.node_id,
            header,
            state,
            rewound: None,
        };
        let root = access.read_node(1)?;
        access.state.set_root(Some(root));

        log::debug!(
            "Opened tree: {} nodes, {} elements, byte order {:?}",
            access.written_limit,
            access.state.element_count(),
            access.codec.byte_order()
        );
        Ok(access)
    }

    /// The header as last persisted.
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    pub fn codec(&self) -> RecordCodec {
        self.codec
    }

    pub fn stats(&self) -> PagedStats {
        self.buffer.stats()
    }

    /// Writes pending records and the header counters, then syncs, without
    /// closing.
    pub fn flush(&mut self) -> TreeResult<()> {
        self.check_open()?;
        self.buffer.flush()?;
        self.write_counters()?;
        self.buffer.sync()
    }

    /// Flushes and hands the backing store back.
    pub fn into_store(mut self) -> TreeResult<S> {
        self.flush()?;
        self.state.mark_closed();
        self.buffer.release().ok_or(TreeError::Closed)
    }

    fn write_counters(&mut self) -> TreeResult<()> {
        match &self.rewound {
            Some(previous) if self.written_limit == 0 => {
                self.header.node_id = previous.node_id;
                self.header.tree_identifier = previous.tree_identifier;
                self.header.element_count = previous.element_count;
            }
            _ => {
                self.header.node_id = self.written_limit;
                self.header.tree_identifier = self.state.tree_identifier();
                self.header.element_count = self.state.element_count();
            }
        }
        let counters = self.header.encode_counters();
        self.buffer.write_at(COUNTERS_OFFSET, &counters)
    }

    fn check_range(&self, node_id: NodeId) -> TreeResult<()> {
        if node_id == 0 || node_id > self.written_limit {
            return Err(TreeError::NodeOutOfRange {
                node_id,
                limit: self.written_limit,
            });
        }
        Ok(())
    }
}

impl<S: BackingStore> TreeAccess for FileTreeAccess<S> {
    fn state(&self) -> &AccessState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AccessState {
        &mut self.state
    }

    fn read_node(&mut self, node_id: NodeId) -> TreeResult<Node> {
        self.check_open()?;
        self.check_range(node_id)?;
        self.buffer.seek(node_id)?;
        Ok(self.codec.decode(node_id, self.buffer.record()))
    }

    fn write_node(&mut self, node: &Node) -> TreeResult<()> {
        self.check_open()?;
        if node.node_id == 0 {
            return Err(TreeError::NodeOutOfRange {
                node_id: 0,
                limit: self.written_limit,
            });
        }
        self.codec.check(node)?;
        self.buffer.seek(node.node_id)?;
        self.codec.encode(node, self.buffer.record_mut())?;

        self.written_limit = self.written_limit.max(node.node_id);
        self.rewound = None;
        self.state.note_written(node);
        Ok(())
    }

    fn remove_node(&mut self, node: &Node) -> TreeResult<()> {
        self.check_open()?;
        self.check_range(node.node_id)?;
        self.state.recycle(node.node_id);
        Ok(())
    }

    fn internal_search(
        &mut self,
        start: NodeId,
        region: &[f64],
        results: &mut Vec<u32>,
    ) -> TreeResult<()> {
        self.check_open()?;
        let mut boundary = Vec::with_capacity(self.codec.boundary_len());
        let mut stack = vec![start];
        // A well-formed tree visits each record at most once.
        let mut budget = self.written_limit;

        while let Some(node_id) = stack.pop() {
            if budget == 0 {
                return Err(TreeError::CorruptLink { node_id });
            }
            budget -= 1;
            self.check_range(node_id)?;
            self.buffer.seek(node_id)?;

            let record = self.buffer.record();
            let (sibling, child) = self.codec.decode_links(record);
            if sibling != 0 {
                stack.push(sibling);
            }
            self.codec.decode_boundary_into(record, &mut boundary);
            if intersects(&boundary, region) {
                match child {
                    ChildLink::Data(data_id) => results.push(data_id),
                    ChildLink::Node(child_id) => stack.push(child_id),
                    ChildLink::None => return Err(TreeError::CorruptLink { node_id }),
                }
            }
        }
        Ok(())
    }

    fn rewind(&mut self) -> TreeResult<()> {
        self.check_open()?;
        self.buffer.flush_and_rewind()?;
        if self.written_limit > 0 {
            let mut previous = self.header.clone();
            previous.node_id = self.written_limit;
            previous.tree_identifier = self.state.tree_identifier();
            previous.element_count = self.state.element_count();
            self.rewound = Some(previous);
        }
        self.state.reset();
        self.written_limit = 0;
        log::debug!("Rewound tree to an empty state");
        Ok(())
    }

    fn close(&mut self) -> TreeResult<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        let written = self.write_counters();
        let closed = self.buffer.close();
        self.state.mark_closed();
        log::debug!(
            "Closed tree: {} nodes, {} elements",
            self.state.node_id_high_water(),
            self.state.element_count()
        );
        written.and(closed)
    }
}

impl<S: BackingStore> Drop for FileTreeAccess<S> {
    fn drop(&mut self) {
        // Best effort flush on drop
        if !self.state.is_closed() {
            if let Err(e) = self.flush() {
                log::warn!("Failed to flush tree on drop: {}", e);
            }
        }
    }
}
