//! Bit-level output for the bzip2 container.
//!
//! bzip2 packs bits most-significant-bit first within each byte, so the
//! first bit written lands in bit 7 of the first output byte. [`BitWriter`]
//! accumulates bits in a fixed-capacity byte cache and hands whole bytes to
//! the underlying writer whenever the cache fills up.
//!
//! # Example
//!
//! ```
//! use bzwrite_core::bitstream::BitWriter;
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output);
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.write_bits(0b11001, 5).unwrap();
//!     writer.write_bit(true).unwrap();
//!     writer.close().unwrap();
//! }
//! assert_eq!(output, vec![0b1011_1001, 0b1000_0000]);
//! ```

use crate::error::{BzError, Result};
use std::io::Write;

/// Default cache capacity in bytes.
pub const DEFAULT_CACHE_BYTES: usize = 1024;

/// A bit-level writer that wraps any `Write` implementation.
///
/// Bits are buffered in a cache of `capacity` bytes. When the cache is full
/// it is flushed before the next bit is accepted. A flush only emits bytes
/// that are completely filled; a trailing partial byte stays in the cache
/// until more bits complete it or [`close`](BitWriter::close) pads it with
/// zero bits.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Byte cache, filled MSB-first.
    cache: Vec<u8>,
    /// Number of bits in the cache not yet handed to the writer.
    bits_unflushed: usize,
    /// Total bits accepted.
    total_bits_written: u64,
    /// Set by `close()`.
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` with the default cache capacity.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            cache: vec![0; DEFAULT_CACHE_BYTES],
            bits_unflushed: 0,
            total_bits_written: 0,
            closed: false,
        }
    }

    /// Create a new `BitWriter` whose cache holds `cache_bytes` bytes.
    pub fn with_capacity(writer: W, cache_bytes: usize) -> Result<Self> {
        if cache_bytes == 0 {
            return Err(BzError::invalid_argument(
                "bit cache capacity must be at least one byte",
            ));
        }
        Ok(Self {
            writer,
            cache: vec![0; cache_bytes],
            bits_unflushed: 0,
            total_bits_written: 0,
            closed: false,
        })
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get the total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Consume this `BitWriter` and return the underlying writer.
    ///
    /// The writer is closed first if that has not happened yet.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.writer)
    }

    #[inline]
    fn capacity_bits(&self) -> usize {
        self.cache.len() * 8
    }

    /// Hand every complete byte in the cache to the writer.
    ///
    /// A trailing partial byte is moved to the front of the cache.
    fn flush_cache(&mut self) -> Result<()> {
        let full_bytes = self.bits_unflushed / 8;
        let remainder = self.bits_unflushed % 8;
        if full_bytes > 0 {
            self.writer.write_all(&self.cache[..full_bytes])?;
        }

        let partial = if remainder > 0 {
            self.cache[full_bytes]
        } else {
            0
        };
        let used = self.bits_unflushed.div_ceil(8).min(self.cache.len());
        self.cache[..used].fill(0);
        self.cache[0] = partial;
        self.bits_unflushed = remainder;
        Ok(())
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        if self.closed {
            return Err(BzError::ClosedWriter);
        }
        if self.bits_unflushed == self.capacity_bits() {
            self.flush_cache()?;
        }

        let idx = self.bits_unflushed >> 3;
        let pos = self.bits_unflushed & 7;
        if bit {
            self.cache[idx] |= 0x80 >> pos;
        }
        self.bits_unflushed += 1;
        self.total_bits_written += 1;
        Ok(())
    }

    /// Write the low `count` bits of `value`, highest bit first.
    ///
    /// # Arguments
    ///
    /// * `value` - The bits to write
    /// * `count` - Number of bits to write (0-32)
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        if count > 32 {
            return Err(BzError::invalid_argument(format!(
                "cannot write {count} bits from a 32-bit value"
            )));
        }
        if self.closed {
            return Err(BzError::ClosedWriter);
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }
        Ok(())
    }

    /// Write a 48-bit value as two 24-bit halves.
    pub fn write_u48(&mut self, value: u64) -> Result<()> {
        self.write_bits((value >> 24) as u32 & 0x00FF_FFFF, 24)?;
        self.write_bits(value as u32 & 0x00FF_FFFF, 24)
    }

    /// Flush any remaining bits, padding the final byte with zeros, and
    /// refuse further writes.
    ///
    /// Closing an already closed writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let bytes = self.bits_unflushed.div_ceil(8);
        if bytes > 0 {
            self.writer.write_all(&self.cache[..bytes])?;
        }
        self.cache.fill(0);
        self.bits_unflushed = 0;
        self.writer.flush()?;
        self.closed = true;
        Ok(())
    }
}
