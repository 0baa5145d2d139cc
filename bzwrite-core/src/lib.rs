//! # bzwrite core
//!
//! Core components for the bzwrite bzip2 stream writer.
//!
//! This crate provides the format-level building blocks the codec crate
//! is assembled from:
//!
//! - [`bitstream`]: MSB-first bit output with a fixed-capacity byte cache
//! - [`crc`]: CRC-32 in the bzip2 variant, plus stream CRC combination
//! - [`error`]: Error types shared by every stage
//!
//! ## Example
//!
//! ```rust
//! use bzwrite_core::bitstream::BitWriter;
//! use bzwrite_core::crc::BzCrc;
//!
//! let mut output = Vec::new();
//! let mut writer = BitWriter::new(&mut output);
//! writer.write_bits(0x42, 8).unwrap();
//! writer.close().unwrap();
//! assert_eq!(output, b"B");
//!
//! let crc = BzCrc::compute(b"123456789");
//! assert_eq!(crc, 0xFC89_1918);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod error;

// Re-exports for convenience
pub use bitstream::BitWriter;
pub use crc::{BzCrc, combine_stream_crc};
pub use error::{BzError, Result};
