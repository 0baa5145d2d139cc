//! Per-block encoding.
//!
//! A [`BlockEncoder`] collects run-length-encoded bytes up to its capacity,
//! then turns them into an [`EncodedBlock`]: BWT, move-to-front, zero-run
//! coding and a Huffman book over the resulting symbols. The encoded block
//! is serialized later, in stream order, by whoever owns the bit writer.

use crate::format::{
    BLOCK_MAGIC, ORIGIN_POINTER_BITS, SELECTOR_GROUP_SIZE, TABLES_PER_BLOCK,
};
use crate::huffman::Book;
use crate::mtf::UsedBytes;
use crate::{bwt, mtf, rle};
use bzwrite_core::{BitWriter, BzCrc, BzError, Result};
use log::debug;
use std::io::Write;

/// Largest selector count the 15-bit field can carry.
const MAX_SELECTORS: usize = (1 << 15) - 1;

/// Lifecycle of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Created, nothing written yet.
    Empty,
    /// Accepting bytes.
    Filling,
    /// The transform chain is running.
    Encoding,
    /// Encoded; the buffer has been consumed.
    Ready,
}

/// One block's bytes on their way through the transform chain.
#[derive(Debug)]
pub struct BlockEncoder {
    seq: u64,
    capacity: usize,
    data: Vec<u8>,
    state: BlockState,
}

impl BlockEncoder {
    /// Create an empty block with stream position `seq`.
    pub fn new(seq: u64, capacity: usize) -> Self {
        Self {
            seq,
            capacity,
            data: Vec::with_capacity(capacity),
            state: BlockState::Empty,
        }
    }

    /// Position of this block in the stream.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Maximum number of bytes the block holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Free space left in the block.
    pub fn remaining(&self) -> usize {
        match self.state {
            BlockState::Empty | BlockState::Filling => self.capacity - self.data.len(),
            BlockState::Encoding | BlockState::Ready => 0,
        }
    }

    /// Whether the block can take no more bytes.
    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Append as much of `bytes` as fits and return how many were taken.
    ///
    /// Returns 0 once the block is full or has been encoded.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.remaining());
        if take > 0 {
            self.data.extend_from_slice(&bytes[..take]);
            self.state = BlockState::Filling;
        }
        take
    }

    /// Remove and return the last `count` bytes written.
    pub fn take_tail(&mut self, count: usize) -> Vec<u8> {
        let split = self.data.len().saturating_sub(count);
        let tail = self.data.split_off(split);
        if self.data.is_empty() && self.state == BlockState::Filling {
            self.state = BlockState::Empty;
        }
        tail
    }

    /// Run the transform chain over the block's bytes.
    ///
    /// Can only succeed once, on a block holding at least one byte.
    pub fn encode(&mut self) -> Result<EncodedBlock> {
        match self.state {
            BlockState::Filling => {}
            BlockState::Empty => {
                return Err(BzError::internal(format!(
                    "block {} encoded without any data",
                    self.seq
                )));
            }
            BlockState::Encoding | BlockState::Ready => {
                return Err(BzError::internal(format!(
                    "block {} encoded more than once",
                    self.seq
                )));
            }
        }
        self.state = BlockState::Encoding;
        let data = std::mem::take(&mut self.data);

        let mut crc = BzCrc::new();
        let mut input_len = 0usize;
        rle::rle1_decode_with(&data, |byte, count| {
            crc.update_run(byte, count);
            input_len += count;
        });
        let crc = crc.finalize();

        let (transformed, origin) = bwt::transform(&data);
        if origin >= 1 << ORIGIN_POINTER_BITS {
            return Err(BzError::encoding_failed(format!(
                "origin pointer {origin} does not fit in {ORIGIN_POINTER_BITS} bits"
            )));
        }

        let (used, positions) = mtf::transform(&transformed);
        let mut symbols = rle::encode_zero_runs(&positions)?;

        // RUNA, RUNB, values 1..used shifted by one, end of block
        let alphabet = used.len() + 2;
        let eob = (alphabet - 1) as u16;
        symbols.push(eob);

        let mut freqs = vec![0u32; alphabet];
        for &sym in &symbols {
            let slot = freqs.get_mut(sym as usize).ok_or_else(|| {
                BzError::internal(format!("symbol {sym} outside alphabet of {alphabet}"))
            })?;
            *slot += 1;
        }
        let book = Book::build(&freqs)?;

        debug!(
            "block {}: {} bytes ({} after RLE), origin {}, {} symbols, alphabet {}, longest code {}",
            self.seq,
            input_len,
            data.len(),
            origin,
            symbols.len(),
            alphabet,
            book.max_len()
        );

        self.state = BlockState::Ready;
        Ok(EncodedBlock {
            seq: self.seq,
            crc,
            origin,
            input_len,
            used,
            symbols,
            book,
        })
    }
}

/// A block ready to be written to the stream.
#[derive(Debug, Clone)]
pub struct EncodedBlock {
    seq: u64,
    crc: u32,
    origin: u32,
    input_len: usize,
    used: UsedBytes,
    symbols: Vec<u16>,
    book: Book,
}

impl EncodedBlock {
    /// Position of this block in the stream.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// CRC of the block's uncompressed bytes.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// BWT origin pointer.
    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Number of uncompressed bytes the block stands for.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Byte values present after the initial run-length pass.
    pub fn used(&self) -> &UsedBytes {
        &self.used
    }

    /// Zero-run coded symbols, ending with the end-of-block symbol.
    pub fn symbols(&self) -> &[u16] {
        &self.symbols
    }

    /// Huffman book for the symbols.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Write the block header, tables and coded symbols.
    pub fn serialize<W: Write>(&self, out: &mut BitWriter<W>) -> Result<()> {
        out.write_u48(BLOCK_MAGIC)?;
        out.write_bits(self.crc, 32)?;
        // Randomised
        out.write_bit(false)?;
        out.write_bits(self.origin, ORIGIN_POINTER_BITS)?;

        let range_map = self.used.range_map();
        out.write_bits(range_map as u32, 16)?;
        for range in 0..16 {
            if range_map & (1 << (15 - range)) != 0 {
                out.write_bits(self.used.range_bitmap(range) as u32, 16)?;
            }
        }

        let selectors = self.symbols.len().div_ceil(SELECTOR_GROUP_SIZE);
        if selectors > MAX_SELECTORS {
            return Err(BzError::encoding_failed(format!(
                "{selectors} selectors exceed the {MAX_SELECTORS} the format allows"
            )));
        }
        out.write_bits(TABLES_PER_BLOCK as u32, 3)?;
        out.write_bits(selectors as u32, 15)?;
        // Every selector picks table 0, which is a single zero bit
        for _ in 0..selectors {
            out.write_bit(false)?;
        }

        let lengths = self.book.lengths();
        for _ in 0..TABLES_PER_BLOCK {
            write_code_lengths(out, &lengths)?;
        }

        for &sym in &self.symbols {
            let code = self.book.code(sym).ok_or_else(|| {
                BzError::internal(format!("no code for symbol {sym} in block {}", self.seq))
            })?;
            out.write_bits(code.bits, code.len)?;
        }

        Ok(())
    }
}

/// Write code lengths as a 5-bit start followed by per-symbol deltas:
/// `10` increments, `11` decrements and `0` moves to the next symbol.
fn write_code_lengths<W: Write>(out: &mut BitWriter<W>, lengths: &[u8]) -> Result<()> {
    let Some(&start) = lengths.first() else {
        return Err(BzError::internal("empty code length table"));
    };
    out.write_bits(start as u32, 5)?;

    let mut current = start;
    for &len in lengths {
        while current < len {
            out.write_bits(0b10, 2)?;
            current += 1;
        }
        while current > len {
            out.write_bits(0b11, 2)?;
            current -= 1;
        }
        out.write_bit(false)?;
    }
    Ok(())
}
