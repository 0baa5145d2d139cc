//! CRC-32 as used by the bzip2 container.
//!
//! bzip2 uses the CRC-32 polynomial 0x04C11DB7 in its non-reflected form:
//! bytes enter at the top of the register and the table is indexed by the
//! high byte. Each block header carries the CRC of the block's original
//! bytes, and the stream trailer carries a combination of all block CRCs
//! (see [`combine_stream_crc`]).

/// CRC-32/BZIP2 lookup table (polynomial 0x04C11DB7, MSB-first).
const CRC32_BZIP2_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ 0x04C1_1DB7;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32 calculator in the bzip2 variant.
///
/// - Polynomial: 0x04C11DB7
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
/// - Reflected input/output: No
///
/// # Example
///
/// ```
/// use bzwrite_core::crc::BzCrc;
///
/// let mut crc = BzCrc::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.finalize(), 0xFC89_1918);
/// ```
#[derive(Debug, Clone)]
pub struct BzCrc {
    crc: u32,
}

impl BzCrc {
    /// Create a new calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFF_FFFF }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFF_FFFF;
    }

    #[inline(always)]
    fn update_byte(&mut self, byte: u8) {
        let index = ((self.crc >> 24) ^ byte as u32) as usize;
        self.crc = (self.crc << 8) ^ CRC32_BZIP2_TABLE[index];
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Update the CRC with `count` repetitions of `byte`.
    #[inline]
    pub fn update_run(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.update_byte(byte);
        }
    }

    /// Get the current CRC value (without finalizing).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        !self.crc
    }

    /// Compute the CRC for a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for BzCrc {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a block CRC into the running stream CRC.
#[inline]
pub fn combine_stream_crc(stream_crc: u32, block_crc: u32) -> u32 {
    stream_crc.rotate_left(1) ^ block_crc
}
