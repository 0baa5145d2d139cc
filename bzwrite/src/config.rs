//! Writer configuration.

use crate::format::BLOCK_SIZE_UNIT;
use bzwrite_core::bitstream::DEFAULT_CACHE_BYTES;
use bzwrite_core::{BzError, Result};
use std::num::NonZeroUsize;
use std::thread;

/// Block size level (1-9, where 9 = 900k blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSize(u8);

impl BlockSize {
    /// Smallest level.
    pub const MIN: u8 = 1;
    /// Largest level.
    pub const MAX: u8 = 9;

    /// Create a block size level, rejecting values outside 1-9.
    pub fn new(level: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&level) {
            return Err(BzError::invalid_argument(format!(
                "block size {level} outside {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Block capacity in bytes after the initial run-length pass.
    pub fn capacity(&self) -> usize {
        self.0 as usize * BLOCK_SIZE_UNIT
    }

    /// ASCII digit written in the stream header.
    pub fn digit(&self) -> u8 {
        b'0' + self.0
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<u8> for BlockSize {
    type Error = BzError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

/// Options for [`BzWriter`](crate::BzWriter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    block_size: BlockSize,
    workers: usize,
    queue_depth: usize,
    bit_cache_bytes: usize,
}

impl WriterOptions {
    /// Default options: 900k blocks, one encode worker per available core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size level.
    pub fn with_block_size(mut self, block_size: BlockSize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the number of threads encoding blocks in parallel.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set how many items each stage queue holds before its producer waits.
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Set the bit writer's cache size in bytes.
    pub fn with_bit_cache_bytes(mut self, bit_cache_bytes: usize) -> Self {
        self.bit_cache_bytes = bit_cache_bytes;
        self
    }

    /// Block size level.
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Encode worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stage queue capacity.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Bit writer cache size in bytes.
    pub fn bit_cache_bytes(&self) -> usize {
        self.bit_cache_bytes
    }

    /// Reject zero-sized settings.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BzError::invalid_argument("worker count must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(BzError::invalid_argument("queue depth must be at least 1"));
        }
        if self.bit_cache_bytes == 0 {
            return Err(BzError::invalid_argument("bit cache must hold at least 1 byte"));
        }
        Ok(())
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            block_size: BlockSize::default(),
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            queue_depth: 2,
            bit_cache_bytes: DEFAULT_CACHE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size() {
        let size = BlockSize::new(5).unwrap();
        assert_eq!(size.level(), 5);
        assert_eq!(size.capacity(), 500_000);
        assert_eq!(size.digit(), b'5');
    }

    #[test]
    fn test_block_size_bounds() {
        assert!(BlockSize::new(1).is_ok());
        assert!(BlockSize::new(9).is_ok());
        assert!(matches!(
            BlockSize::new(0),
            Err(BzError::InvalidArgument { .. })
        ));
        assert!(matches!(
            BlockSize::try_from(10),
            Err(BzError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_block_size_default() {
        assert_eq!(BlockSize::default().level(), 9);
        assert_eq!(BlockSize::default().capacity(), crate::format::MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_options_defaults() {
        let options = WriterOptions::new();
        assert_eq!(options.block_size(), BlockSize::default());
        assert!(options.workers() >= 1);
        assert_eq!(options.queue_depth(), 2);
        assert_eq!(options.bit_cache_bytes(), DEFAULT_CACHE_BYTES);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_validate() {
        assert!(WriterOptions::new().with_workers(0).validate().is_err());
        assert!(WriterOptions::new().with_queue_depth(0).validate().is_err());
        assert!(WriterOptions::new().with_bit_cache_bytes(0).validate().is_err());

        let options = WriterOptions::new()
            .with_block_size(BlockSize::new(1).unwrap())
            .with_workers(3)
            .with_queue_depth(4);
        assert_eq!(options.block_size().level(), 1);
        assert_eq!(options.workers(), 3);
        assert_eq!(options.queue_depth(), 4);
    }
}
