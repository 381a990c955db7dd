//! Coordinate reference system handle.
//!
//! The storage engine never interprets a CRS. It keeps the serialized form
//! as an opaque blob and only needs the number of axes, which an external
//! [`CrsCodec`] resolves when a tree file is reopened.

use serde::{Deserialize, Serialize};

use crate::access::{TreeError, TreeResult};

/// Opaque serialized CRS plus its coordinate-system dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    dimension: usize,
    encoded: Vec<u8>,
}

impl Crs {
    /// Creates a CRS handle; `encoded` is stored verbatim.
    pub fn new(dimension: usize, encoded: impl Into<Vec<u8>>) -> TreeResult<Self> {
        if dimension == 0 {
            return Err(TreeError::InvalidConfig(
                "CRS dimension must be at least 1".into(),
            ));
        }
        let encoded = encoded.into();
        if encoded.len() > i32::MAX as usize {
            return Err(TreeError::InvalidConfig(format!(
                "serialized CRS is too large ({} bytes)",
                encoded.len()
            )));
        }
        Ok(Self { dimension, encoded })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Number of doubles in a node boundary (min and max per axis).
    pub fn boundary_len(&self) -> usize {
        self.dimension * 2
    }
}

/// Resolves the dimension of a serialized CRS read back from a tree file.
pub trait CrsCodec {
    fn dimension(&self, encoded: &[u8]) -> TreeResult<usize>;

    fn decode(&self, encoded: &[u8]) -> TreeResult<Crs> {
        Crs::new(self.dimension(encoded)?, encoded)
    }
}

/// A codec for callers that already know the dimension of every tree they open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDimension(pub usize);

impl CrsCodec for FixedDimension {
    fn dimension(&self, _encoded: &[u8]) -> TreeResult<usize> {
        Ok(self.0)
    }
}

impl<F> CrsCodec for F
where
    F: Fn(&[u8]) -> TreeResult<usize>,
{
    fn dimension(&self, encoded: &[u8]) -> TreeResult<usize> {
        self(encoded)
    }
}
