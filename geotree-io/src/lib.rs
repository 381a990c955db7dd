//! # geotree-io - Storage Engine for Spatial Trees
//!
//! Persistent and in-memory node storage for R-tree family spatial indexes.
//! The crate stores nodes; building and balancing the tree is left to the
//! algorithm on top.
//!
//! ## Features
//!
//! - **Paged I/O**: Node records are read and written through a fixed-size window
//! - **Portable Files**: Each file records its byte order and reads back on any host
//! - **Recycled IDs**: Removed node IDs are handed out again before fresh ones
//! - **Two Backends**: A file-backed and a memory-backed store behind one trait
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotree_io::{
//!     ChildLink, Crs, FileTreeAccess, FixedDimension, Node, NodeProperties, TreeAccess,
//!     TreeAccessConfig,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TreeAccessConfig::default();
//! let crs = Crs::new(2, b"EPSG:4326".to_vec())?;
//! let mut tree = FileTreeAccess::create("places.tree", &config, crs)?;
//!
//! let root = tree.new_node(
//!     Some(vec![0.0, 0.0, 10.0, 10.0]),
//!     NodeProperties::LEAF,
//!     0,
//!     0,
//!     ChildLink::Data(7),
//!     1,
//! );
//! tree.write_node(&root)?;
//! assert_eq!(tree.search(&[5.0, 5.0, 6.0, 6.0])?, vec![7]);
//! tree.close()?;
//!
//! let mut tree = FileTreeAccess::open("places.tree", &config.open_options(), &FixedDimension(2))?;
//! assert_eq!(tree.read_node(1)?, root);
//! tree.close()?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod crs;
pub mod node;

pub use access::{
    AccessState, BackingStore, ByteOrder, FileTreeAccess, MemoryTreeAccess, OpenOptions,
    PagedBuffer, PagedStats, RecordCodec, SharedTreeAccess, SplitPolicy, TreeAccess,
    TreeAccessConfig, TreeError, TreeHeader, TreeResult,
};
pub use crs::{Crs, CrsCodec, FixedDimension};
pub use node::{intersects, ChildLink, Node, NodeId, NodeProperties};
