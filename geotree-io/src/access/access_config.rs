//! Configuration for creating and opening trees.

use serde::{Deserialize, Serialize};

use super::access_constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_HILBERT_ORDER, DEFAULT_MAGIC, DEFAULT_MAX_ELEMENTS,
    DEFAULT_VERSION,
};
use super::access_types::{ByteOrder, SplitPolicy, TreeError, TreeResult};

/// Parameters fixed when a tree is created.
///
/// # Examples
///
/// ```rust
/// use geotree_io::{SplitPolicy, TreeAccessConfig};
///
/// let config = TreeAccessConfig::default()
///     .with_max_elements(16)
///     .with_split(SplitPolicy::Linear)
///     .with_buffer_size(8192);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeAccessConfig {
    /// Identifies the tree subtype; checked on open
    pub magic_number: i32,
    /// Format version; checked on open
    pub version: f64,
    /// Fan-out of the tree
    pub max_elements: i32,
    pub hilbert_order: i32,
    pub split: SplitPolicy,
    /// Window size of the paged buffer in bytes
    pub buffer_size: usize,
    /// Byte order of the file; native order when left at default
    pub byte_order: ByteOrder,
}

impl Default for TreeAccessConfig {
    fn default() -> Self {
        Self {
            magic_number: DEFAULT_MAGIC,
            version: DEFAULT_VERSION,
            max_elements: DEFAULT_MAX_ELEMENTS,
            hilbert_order: DEFAULT_HILBERT_ORDER,
            split: SplitPolicy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            byte_order: ByteOrder::native(),
        }
    }
}

impl TreeAccessConfig {
    pub fn with_magic_number(mut self, magic_number: i32) -> Self {
        self.magic_number = magic_number;
        self
    }

    pub fn with_version(mut self, version: f64) -> Self {
        self.version = version;
        self
    }

    pub fn with_max_elements(mut self, max_elements: i32) -> Self {
        self.max_elements = max_elements;
        self
    }

    pub fn with_hilbert_order(mut self, hilbert_order: i32) -> Self {
        self.hilbert_order = hilbert_order;
        self
    }

    pub fn with_split(mut self, split: SplitPolicy) -> Self {
        self.split = split;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Options that reopen a tree created with this configuration.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            magic_number: self.magic_number,
            version: self.version,
            buffer_size: self.buffer_size,
        }
    }

    pub fn validate(&self) -> TreeResult<()> {
        if self.max_elements < 2 {
            return Err(TreeError::InvalidConfig(format!(
                "max_elements must be at least 2, got {}",
                self.max_elements
            )));
        }
        if self.hilbert_order < 0 {
            return Err(TreeError::InvalidConfig(format!(
                "hilbert_order must not be negative, got {}",
                self.hilbert_order
            )));
        }
        if !self.version.is_finite() {
            return Err(TreeError::InvalidConfig(
                "version must be a finite number".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(TreeError::InvalidConfig(
                "buffer_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// What an opened file must match, plus the window size to read it with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub magic_number: i32,
    pub version: f64,
    pub buffer_size: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            magic_number: DEFAULT_MAGIC,
            version: DEFAULT_VERSION,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl OpenOptions {
    pub fn new(magic_number: i32, version: f64) -> Self {
        Self {
            magic_number,
            version,
            ..Self::default()
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}
