//! Multi-threaded bzip2 stream writer.
//!
//! Every block goes through the bzip2 transform chain:
//! 1. Run-Length Encoding (RLE) - runs of 4+ bytes become 4 bytes and a count
//! 2. Burrows-Wheeler Transform (BWT) - block sorting
//! 3. Move-to-Front Transform (MTF) - recency ranks
//! 4. Zero-Run Length Encoding - RUNA/RUNB digits for runs of rank 0
//! 5. Huffman Coding - one canonical code book per block
//!
//! [`BzWriter`] runs the chain as a pipeline: input is run-length encoded
//! and cut into blocks on background threads, blocks are encoded in
//! parallel on a worker pool, and the encoded blocks are written to the
//! sink in their original order.
//!
//! # Example
//!
//! ```
//! use bzwrite::{BlockSize, compress};
//!
//! let data = b"abracadabra abracadabra abracadabra";
//! let compressed = compress(data, BlockSize::new(1).unwrap()).unwrap();
//! assert_eq!(&compressed[..4], b"BZh1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
/// Burrows-Wheeler Transform implementation.
pub mod bwt;
pub mod config;
pub mod format;
pub mod huffman;
pub mod mtf;
pub mod pipeline;
pub mod rle;
mod writer;

pub use block::{BlockEncoder, BlockState, EncodedBlock};
pub use bzwrite_core::{BzError, Result};
pub use config::{BlockSize, WriterOptions};
pub use huffman::{Book, Code};
pub use writer::BzWriter;

/// Compress `data` into a complete bzip2 stream.
pub fn compress(data: &[u8], block_size: BlockSize) -> Result<Vec<u8>> {
    let options = WriterOptions::new().with_block_size(block_size);
    let mut writer = BzWriter::with_options(Vec::new(), options)?;
    writer.write(data)?;
    writer.finish()
}
