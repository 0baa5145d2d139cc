//! Run-length stages for BZip2.
//!
//! BZip2 uses two types of RLE:
//! 1. Initial RLE (rle1): encodes runs of 4+ identical bytes before the BWT
//! 2. Zero-run RLE (rle2): encodes runs of zeros after MTF with RUNA/RUNB

use crate::format::{RLE1_MAX_RUN, RLE1_RUN_THRESHOLD, RUNA, RUNB};
use bzwrite_core::{BzError, Result};

/// Encode `data` with the initial RLE, holding back a run that may still grow.
///
/// Runs of 4 or more identical bytes are encoded as the first 4 bytes
/// followed by a count byte (0-255) of additional repeats. Runs longer than
/// [`RLE1_MAX_RUN`] are split into several such groups.
///
/// The final run of the input could continue in the next chunk, so it is
/// returned as `leftover` instead of being encoded. Callers prepend it to
/// the next chunk, or hand it to [`rle1_finish`] at end of input.
pub fn rle1_encode(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut encoded = Vec::with_capacity(data.len());
    let consumed = encode_runs(data, false, &mut encoded);
    (encoded, data[consumed..].to_vec())
}

/// Encode `data` completely, including its final run.
pub fn rle1_finish(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len() + 1);
    encode_runs(data, true, &mut encoded);
    encoded
}

/// Append the run-length encoding of `data` to `out`.
///
/// Returns how many input bytes were consumed. Unless `is_final` is set,
/// a trailing run shorter than [`RLE1_MAX_RUN`] is left unconsumed.
fn encode_runs(data: &[u8], is_final: bool, out: &mut Vec<u8>) -> usize {
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        let mut run_len = 1;

        while i + run_len < data.len() && data[i + run_len] == byte && run_len < RLE1_MAX_RUN {
            run_len += 1;
        }

        if !is_final && i + run_len == data.len() && run_len < RLE1_MAX_RUN {
            break;
        }

        if run_len >= RLE1_RUN_THRESHOLD {
            out.extend_from_slice(&[byte; RLE1_RUN_THRESHOLD]);
            out.push((run_len - RLE1_RUN_THRESHOLD) as u8);
        } else {
            out.extend(std::iter::repeat_n(byte, run_len));
        }
        i += run_len;
    }

    i
}

/// Initial RLE over a stream that arrives in chunks.
///
/// Holds the bytes of a run that might continue in the next chunk and
/// prepends them to it.
#[derive(Debug, Default)]
pub struct RunLengthEncoder {
    carry: Vec<u8>,
}

impl RunLengthEncoder {
    /// Create an encoder with nothing carried.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one chunk, carrying its trailing run forward.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<u8> {
        if self.carry.is_empty() {
            let (encoded, leftover) = rle1_encode(chunk);
            self.carry = leftover;
            return encoded;
        }

        let mut input = std::mem::take(&mut self.carry);
        input.extend_from_slice(chunk);
        let (encoded, leftover) = rle1_encode(&input);
        self.carry = leftover;
        encoded
    }

    /// Number of bytes currently held back.
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    /// Encode whatever is still carried.
    pub fn finish(self) -> Vec<u8> {
        rle1_finish(&self.carry)
    }
}

/// Walk RLE1-encoded data, reporting each decoded stretch as `(byte, count)`.
///
/// After four identical bytes the next byte is a count of extra repeats;
/// the run counter restarts after every count byte.
pub fn rle1_decode_with(data: &[u8], mut emit: impl FnMut(u8, usize)) {
    let mut last: Option<u8> = None;
    let mut run = 0usize;

    for &byte in data {
        if run == RLE1_RUN_THRESHOLD {
            if let Some(prev) = last {
                emit(prev, byte as usize);
            }
            last = None;
            run = 0;
            continue;
        }

        emit(byte, 1);
        if last == Some(byte) {
            run += 1;
        } else {
            last = Some(byte);
            run = 1;
        }
    }
}

/// Decode RLE1-encoded data.
pub fn rle1_decode(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 2);
    rle1_decode_with(data, |byte, count| {
        result.extend(std::iter::repeat_n(byte, count));
    });
    result
}

/// Encode zeros using RUNA/RUNB encoding.
///
/// - Runs of zeros become RUNA/RUNB digits of the run length in bijective
///   base 2, least significant digit first.
/// - Non-zero MTF values are shifted by +1 past the two run markers.
pub fn encode_zero_runs(data: &[u8]) -> Result<Vec<u16>> {
    let mut result = Vec::with_capacity(data.len());
    let mut zeros = 0usize;

    for &value in data {
        if value == 0 {
            zeros += 1;
            continue;
        }
        push_zero_run(zeros, &mut result)?;
        zeros = 0;
        result.push(value as u16 + 1);
    }
    push_zero_run(zeros, &mut result)?;

    Ok(result)
}

/// Append the RUNA/RUNB digits of a zero run of length `run`.
fn push_zero_run(mut run: usize, out: &mut Vec<u16>) -> Result<()> {
    let mut place = 1usize;
    while run > 0 {
        let (marker, weight) = if run & place != 0 {
            (RUNA, place)
        } else {
            (RUNB, place << 1)
        };
        run = run.checked_sub(weight).ok_or_else(|| {
            BzError::internal(format!(
                "zero run of {run} cannot absorb digit weight {weight}"
            ))
        })?;
        out.push(marker);
        place <<= 1;
    }
    Ok(())
}

/// Decode RUNA/RUNB encoded symbols back to MTF values.
///
/// Decoding stops at the first symbol above `max_value + 1`, which is how
/// the end-of-block symbol terminates a block.
pub fn decode_zero_runs(data: &[u16], max_value: u8) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let sym = data[i];

        if sym == RUNA || sym == RUNB {
            let mut power = 1usize;
            let mut count = 0usize;

            while i < data.len() && (data[i] == RUNA || data[i] == RUNB) {
                count += if data[i] == RUNA { power } else { 2 * power };
                power *= 2;
                i += 1;
            }

            result.resize(result.len() + count, 0);
        } else if sym <= max_value as u16 + 1 {
            result.push((sym - 1) as u8);
            i += 1;
        } else {
            break;
        }
    }

    result
}
