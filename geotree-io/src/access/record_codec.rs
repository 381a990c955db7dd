//! Fixed-layout binary encoding of one node record.
//!
//! Layout, in the tree's byte order:
//!
//! ```text
//! boundary_len × f64   boundary, mins then maxs
//! u8                   properties
//! i32                  parent_id
//! i32                  sibling_id
//! i32                  child (0 none, > 0 node, < 0 negated data id)
//! i32                  child_count
//! ```
//!
//! No padding; a record is `boundary_len × 8 + 17` bytes.

use super::access_constants::{DOUBLE_SIZE, INT_SIZE, LINK_COUNT};
use super::access_types::{ByteOrder, TreeError, TreeResult};
use crate::node::{ChildLink, Node, NodeId, NodeProperties};

/// Stateless encoder/decoder for the records of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCodec {
    byte_order: ByteOrder,
    boundary_len: usize,
}

impl RecordCodec {
    pub fn new(byte_order: ByteOrder, boundary_len: usize) -> Self {
        Self {
            byte_order,
            boundary_len,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn boundary_len(&self) -> usize {
        self.boundary_len
    }

    /// Size in bytes of one encoded record.
    pub fn record_size(&self) -> usize {
        self.boundary_len * DOUBLE_SIZE + INT_SIZE * LINK_COUNT + 1
    }

    fn properties_offset(&self) -> usize {
        self.boundary_len * DOUBLE_SIZE
    }

    fn link_offset(&self, link: usize) -> usize {
        self.properties_offset() + 1 + link * INT_SIZE
    }

    /// Encodes `node` into `dst`, which must be exactly one record long.
    ///
    /// A node without a boundary is written with the NaN sentinel.
    pub fn encode(&self, node: &Node, dst: &mut [u8]) -> TreeResult<()> {
        debug_assert_eq!(dst.len(), self.record_size());
        let order = self.byte_order;

        self.check(node)?;
        match &node.boundary {
            Some(boundary) => {
                for (i, value) in boundary.iter().enumerate() {
                    order.put_f64(&mut dst[i * DOUBLE_SIZE..], *value);
                }
            }
            None => {
                for i in 0..self.boundary_len {
                    order.put_f64(&mut dst[i * DOUBLE_SIZE..], f64::NAN);
                }
            }
        }

        dst[self.properties_offset()] = node.properties.bits();
        order.put_i32(&mut dst[self.link_offset(0)..], node.parent_id as i32);
        order.put_i32(&mut dst[self.link_offset(1)..], node.sibling_id as i32);
        order.put_i32(&mut dst[self.link_offset(2)..], node.child.to_raw());
        order.put_i32(&mut dst[self.link_offset(3)..], node.child_count as i32);
        Ok(())
    }

    /// Fails when `node` cannot be encoded without losing information.
    pub fn check(&self, node: &Node) -> TreeResult<()> {
        self.check_boundary(node)?;
        node.check_links()
    }

    /// Fails when `node` carries a boundary of the wrong length.
    pub fn check_boundary(&self, node: &Node) -> TreeResult<()> {
        match &node.boundary {
            Some(boundary) if boundary.len() != self.boundary_len => Err(TreeError::BoundaryLength {
                expected: self.boundary_len,
                found: boundary.len(),
            }),
            _ => Ok(()),
        }
    }

    pub fn encode_to_vec(&self, node: &Node) -> TreeResult<Vec<u8>> {
        let mut bytes = vec![0u8; self.record_size()];
        self.encode(node, &mut bytes)?;
        Ok(bytes)
    }

    /// Decodes the record in `src` as node `node_id`.
    pub fn decode(&self, node_id: NodeId, src: &[u8]) -> Node {
        let mut boundary = Vec::with_capacity(self.boundary_len);
        self.decode_boundary_into(src, &mut boundary);
        let order = self.byte_order;

        Node {
            node_id,
            boundary: Some(boundary),
            properties: NodeProperties::from_bits_retain(src[self.properties_offset()]),
            parent_id: order.get_i32(&src[self.link_offset(0)..]) as NodeId,
            sibling_id: order.get_i32(&src[self.link_offset(1)..]) as NodeId,
            child: ChildLink::from_raw(order.get_i32(&src[self.link_offset(2)..])),
            child_count: order.get_i32(&src[self.link_offset(3)..]) as u32,
        }
    }

    /// Replaces the contents of `out` with the boundary of the record in `src`.
    pub fn decode_boundary_into(&self, src: &[u8], out: &mut Vec<f64>) {
        out.clear();
        out.extend(
            (0..self.boundary_len).map(|i| self.byte_order.get_f64(&src[i * DOUBLE_SIZE..])),
        );
    }

    /// Reads only the sibling and child links of the record in `src`.
    pub fn decode_links(&self, src: &[u8]) -> (NodeId, ChildLink) {
        let order = self.byte_order;
        let sibling = order.get_i32(&src[self.link_offset(1)..]) as NodeId;
        let child = ChildLink::from_raw(order.get_i32(&src[self.link_offset(2)..]));
        (sibling, child)
    }
}
