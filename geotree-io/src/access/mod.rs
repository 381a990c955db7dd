//! Paged storage for spatial tree nodes.
//!
//! This module provides the storage layer an R-tree family algorithm builds on:
//! - Fixed-layout node records in a per-tree byte order
//! - A paged window over the backing store that only writes back what changed
//! - Node ID allocation with recycling of removed IDs
//! - File-backed and memory-backed implementations of one [`TreeAccess`] contract

pub mod access_config;
pub mod access_constants;
pub mod access_types;
pub mod header;
pub mod paged_buffer;
pub mod record_codec;
pub mod tree_access;
mod file_access;
mod memory_access;
mod shared_access;

pub use access_config::{OpenOptions, TreeAccessConfig};
pub use access_types::{ByteOrder, PagedStats, SplitPolicy, TreeError, TreeResult};
pub use file_access::FileTreeAccess;
pub use header::TreeHeader;
pub use memory_access::MemoryTreeAccess;
pub use paged_buffer::{BackingStore, PagedBuffer};
pub use record_codec::RecordCodec;
pub use shared_access::SharedTreeAccess;
pub use tree_access::{AccessState, TreeAccess};
