//! Constants for the tree access layer.

/// Default window size of the paged buffer (4KB).
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default fan-out of a freshly configured tree.
pub const DEFAULT_MAX_ELEMENTS: i32 = 9;

/// Default Hilbert order; only Hilbert-variant trees give it meaning.
pub const DEFAULT_HILBERT_ORDER: i32 = 0;

/// Magic number written by trees that do not configure their own.
pub const DEFAULT_MAGIC: i32 = 0x4754_5249; // "GTRI"

/// Format version written by trees that do not configure their own.
pub const DEFAULT_VERSION: f64 = 0.1;

/// Initial capacity of the search result buffer.
pub const INITIAL_SEARCH_CAPACITY: usize = 100;

/// Initial number of slots of the memory-backed arena.
pub const INITIAL_ARENA_SLOTS: usize = 100;

/// Size in bytes of an encoded double.
pub const DOUBLE_SIZE: usize = 8;

/// Size in bytes of an encoded int32.
pub const INT_SIZE: usize = 4;

/// Number of int32 links stored after the properties byte.
pub const LINK_COUNT: usize = 4;

/// Offset of the `node_id`, `tree_identifier` and `element_count` fields
/// rewritten at close.
pub(crate) const COUNTERS_OFFSET: u64 = 22;

/// Byte length of the header before the CRS blob.
pub const HEADER_FIXED_LEN: usize = 38;
