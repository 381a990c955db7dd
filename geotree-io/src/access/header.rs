//! File header of a file-backed tree.
//!
//! ```text
//! Offset  Size  Field             Encoding
//! 0       4     magic number      big-endian
//! 4       1     byte order flag   1 = little-endian, 0 = big-endian
//! 5       8     version           tree byte order
//! 13      4     max elements      tree byte order
//! 17      4     hilbert order     tree byte order
//! 21      1     split mode        bit 0 set = linear
//! 22      4     node id           highest written node, 0 until close
//! 26      4     tree identifier   finalized at close
//! 30      4     element count     finalized at close
//! 34      4     CRS length        tree byte order
//! 38      n     CRS blob          verbatim
//! ```

use std::io::{self, Read};

use super::access_config::{OpenOptions, TreeAccessConfig};
use super::access_constants::HEADER_FIXED_LEN;
use super::access_types::{ByteOrder, SplitPolicy, TreeError, TreeResult};
use crate::crs::Crs;
use crate::node::NodeId;

/// Decoded header of a tree file.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeHeader {
    pub magic_number: i32,
    pub byte_order: ByteOrder,
    pub version: f64,
    pub max_elements: i32,
    pub hilbert_order: i32,
    pub split: SplitPolicy,
    pub node_id: NodeId,
    pub tree_identifier: i32,
    pub element_count: i32,
    pub crs: Vec<u8>,
}

impl TreeHeader {
    /// Header of a freshly created tree; counters start at zero.
    pub fn new(config: &TreeAccessConfig, crs: &Crs) -> Self {
        Self {
            magic_number: config.magic_number,
            byte_order: config.byte_order,
            version: config.version,
            max_elements: config.max_elements,
            hilbert_order: config.hilbert_order,
            split: config.split,
            node_id: 0,
            tree_identifier: 0,
            element_count: 0,
            crs: crs.encoded().to_vec(),
        }
    }

    /// Total encoded length; node records start right after it.
    pub fn encoded_len(&self) -> usize {
        HEADER_FIXED_LEN + self.crs.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let order = self.byte_order;
        let mut bytes = vec![0u8; self.encoded_len()];

        bytes[0..4].copy_from_slice(&self.magic_number.to_be_bytes());
        bytes[4] = order.flag();
        order.put_f64(&mut bytes[5..], self.version);
        order.put_i32(&mut bytes[13..], self.max_elements);
        order.put_i32(&mut bytes[17..], self.hilbert_order);
        bytes[21] = self.split.to_byte();
        bytes[22..34].copy_from_slice(&self.encode_counters());
        order.put_i32(&mut bytes[34..], self.crs.len() as i32);
        bytes[HEADER_FIXED_LEN..].copy_from_slice(&self.crs);
        bytes
    }

    /// The three counters rewritten at close, in file order.
    pub fn encode_counters(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        self.byte_order.put_i32(&mut bytes[0..], self.node_id as i32);
        self.byte_order.put_i32(&mut bytes[4..], self.tree_identifier);
        self.byte_order.put_i32(&mut bytes[8..], self.element_count);
        bytes
    }

    /// Reads a header from the start of `reader`.
    ///
    /// With `expected` set, the magic number and version are checked before
    /// the CRS blob is read, and a tree that was never finalized is refused.
    pub fn read_from<R: Read>(reader: &mut R, expected: Option<&OpenOptions>) -> TreeResult<Self> {
        let mut fixed = [0u8; HEADER_FIXED_LEN];
        reader.read_exact(&mut fixed)?;

        let magic_number = i32::from_be_bytes([fixed[0], fixed[1], fixed[2], fixed[3]]);
        if let Some(expected) = expected {
            if magic_number != expected.magic_number {
                log::warn!("Rejecting tree file with magic number {:#x}", magic_number);
                return Err(TreeError::MagicMismatch {
                    expected: expected.magic_number,
                    found: magic_number,
                });
            }
        }

        let order = ByteOrder::from_flag(fixed[4]);
        let version = order.get_f64(&fixed[5..]);
        if let Some(expected) = expected {
            // Versions must match exactly.
            if version.to_bits() != expected.version.to_bits() {
                log::warn!("Rejecting tree file with version {}", version);
                return Err(TreeError::VersionMismatch {
                    expected: expected.version,
                    found: version,
                });
            }
        }

        let crs_len = order.get_i32(&fixed[34..]);
        if crs_len < 0 {
            return Err(TreeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("negative CRS length {} in tree header", crs_len),
            )));
        }
        let mut crs = Vec::new();
        reader.by_ref().take(crs_len as u64).read_to_end(&mut crs)?;
        if crs.len() != crs_len as usize {
            return Err(TreeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("CRS blob truncated ({} of {} bytes)", crs.len(), crs_len),
            )));
        }

        let header = Self {
            magic_number,
            byte_order: order,
            version,
            max_elements: order.get_i32(&fixed[13..]),
            hilbert_order: order.get_i32(&fixed[17..]),
            split: SplitPolicy::from_byte(fixed[21]),
            node_id: order.get_i32(&fixed[22..]) as NodeId,
            tree_identifier: order.get_i32(&fixed[26..]),
            element_count: order.get_i32(&fixed[30..]),
            crs,
        };

        if expected.is_some() && header.node_id == 0 {
            log::warn!("Rejecting tree file that was never closed");
            return Err(TreeError::Unfinalized);
        }
        Ok(header)
    }
}
