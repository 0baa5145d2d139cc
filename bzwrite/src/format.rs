//! Constants of the bzip2 container format.

/// Stream magic bytes ("BZ").
pub const BZIP2_MAGIC: [u8; 2] = [0x42, 0x5A];

/// Version byte following the stream magic ('h' for Huffman).
pub const HUFFMAN_VERSION: u8 = b'h';

/// Block header magic, 48 bits (BCD pi).
pub const BLOCK_MAGIC: u64 = 0x3141_5926_5359;

/// End of stream magic, 48 bits (BCD sqrt(pi)).
pub const EOS_MAGIC: u64 = 0x1772_4538_5090;

/// Zero-run marker adding `1 << k` at position `k`.
pub const RUNA: u16 = 0;

/// Zero-run marker adding `2 << k` at position `k`.
pub const RUNB: u16 = 1;

/// Block capacity unit: one block-size step is 100 000 bytes.
pub const BLOCK_SIZE_UNIT: usize = 100_000;

/// Maximum block capacity (level 9).
pub const MAX_BLOCK_SIZE: usize = 9 * BLOCK_SIZE_UNIT;

/// Run length at which the pre-BWT run-length pass starts emitting a count byte.
pub const RLE1_RUN_THRESHOLD: usize = 4;

/// Longest run covered by one group of four literals plus a count byte.
pub const RLE1_MAX_RUN: usize = RLE1_RUN_THRESHOLD + u8::MAX as usize;

/// Largest Huffman alphabet: RUNA, RUNB, 255 shifted MTF values, end of block.
pub const MAX_ALPHA_SIZE: usize = 258;

/// Longest Huffman code a bzip2 decoder accepts.
pub const MAX_CODE_LEN: u8 = 20;

/// Symbols coded between two selectors.
pub const SELECTOR_GROUP_SIZE: usize = 50;

/// Number of Huffman tables written per block. The format requires at
/// least two; both carry the same code lengths.
pub const TABLES_PER_BLOCK: usize = 2;

/// Width of the origin pointer field in bits.
pub const ORIGIN_POINTER_BITS: u8 = 24;
