//! Core types shared by the tree access layer.
//!
//! This module defines:
//! - Error types and result types
//! - Byte order and split policy enumerations
//! - Paging statistics

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading or writing a tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a tree of the expected type (magic number expected {expected:#010x}, found {found:#010x})")]
    MagicMismatch { expected: i32, found: i32 },

    #[error("Unsupported tree version (expected {expected}, found {found})")]
    VersionMismatch { expected: f64, found: f64 },

    #[error("Tree was never finalized by close(); rebuild it instead of reopening")]
    Unfinalized,

    #[error("Node {node_id} is outside the written range (limit {limit})")]
    NodeOutOfRange { node_id: u32, limit: u32 },

    #[error("Node {0} was never written or has been removed")]
    MissingNode(u32),

    #[error("Node {node_id} links to child 0 where a child was expected")]
    CorruptLink { node_id: u32 },

    #[error("Node {node_id} has {field} {value}, which a node record cannot hold")]
    LinkOutOfRange {
        node_id: u32,
        field: &'static str,
        value: u64,
    },

    #[error("Boundary length mismatch (expected {expected} values, found {found})")]
    BoundaryLength { expected: usize, found: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tree access is closed")]
    Closed,
}

/// Result type for tree access operations
pub type TreeResult<T> = Result<T, TreeError>;

// ============================================================================
// Byte Order
// ============================================================================

/// Byte order of every number written after the header's byte order flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Decodes the header flag (`true` means little-endian).
    pub fn from_flag(flag: u8) -> Self {
        if flag != 0 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            ByteOrder::Little => 1,
            ByteOrder::Big => 0,
        }
    }

    /// Writes `value` into the first 8 bytes of `dst`.
    pub fn put_f64(self, dst: &mut [u8], value: f64) {
        let bytes = match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        dst[..8].copy_from_slice(&bytes);
    }

    /// Reads a double from the first 8 bytes of `src`.
    pub fn get_f64(self, src: &[u8]) -> f64 {
        let bytes: [u8; 8] = fixed(src);
        match self {
            ByteOrder::Big => f64::from_be_bytes(bytes),
            ByteOrder::Little => f64::from_le_bytes(bytes),
        }
    }

    /// Writes `value` into the first 4 bytes of `dst`.
    pub fn put_i32(self, dst: &mut [u8], value: i32) {
        let bytes = match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        dst[..4].copy_from_slice(&bytes);
    }

    /// Reads an int32 from the first 4 bytes of `src`.
    pub fn get_i32(self, src: &[u8]) -> i32 {
        let bytes: [u8; 4] = fixed(src);
        match self {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

fn fixed<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&src[..N]);
    bytes
}

// ============================================================================
// Split Policy
// ============================================================================

/// Split heuristic the owning tree was built with.
///
/// The storage layer never splits anything; it only records the choice so a
/// reopened tree keeps splitting the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SplitPolicy {
    Linear,
    #[default]
    Quadratic,
}

impl SplitPolicy {
    /// Header encoding: bit 0 set means linear.
    pub fn to_byte(self) -> u8 {
        match self {
            SplitPolicy::Linear => 1,
            SplitPolicy::Quadratic => 0,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        if byte & 1 != 0 {
            SplitPolicy::Linear
        } else {
            SplitPolicy::Quadratic
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// I/O counters of a paged buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagedStats {
    /// Windows read from the backing store
    pub window_loads: u64,
    /// Flushes that wrote at least one byte
    pub window_flushes: u64,
    /// Total bytes written by flushes
    pub bytes_flushed: u64,
}
