//! Canonical Huffman codes for BZip2.
//!
//! A [`Book`] is built from per-symbol frequencies in three steps:
//!
//! 1. Every symbol, including those that never occur, becomes a leaf.
//! 2. Nodes are kept sorted by frequency; the two lightest are merged and
//!    the result is put back at its sorted position (after any node of equal
//!    frequency) until a single root remains.
//! 3. A breadth-first walk from the root yields each leaf's depth, and
//!    canonical codes are assigned from those depths: shorter codes first,
//!    and within one length in ascending symbol order.
//!
//! If the tree is deeper than the code length limit, frequencies are
//! flattened (`1 + f / 2`) and the tree is rebuilt until it fits. Repeated
//! flattening leaves only weights 1 and 2, whose tree is at most
//! ⌈log2 n⌉ + 1 deep.

use crate::format::{MAX_ALPHA_SIZE, MAX_CODE_LEN};
use bzwrite_core::{BzError, Result};
use log::trace;
use std::fmt;

/// A canonical code: `len` bits of `bits`, written most significant first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    /// Bit pattern, right-aligned.
    pub bits: u32,
    /// Number of bits.
    pub len: u8,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.bits, width = self.len as usize)
    }
}

/// Prefix-free canonical codes for an alphabet, indexed by symbol value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    codes: Vec<Code>,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf(usize),
    Internal { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    freq: u64,
    kind: NodeKind,
}

impl Book {
    /// Build a book limited to [`MAX_CODE_LEN`] bits per code.
    pub fn build(freqs: &[u32]) -> Result<Self> {
        Self::build_with_limit(freqs, MAX_CODE_LEN)
    }

    /// Build a book whose codes are at most `max_len` bits long.
    pub fn build_with_limit(freqs: &[u32], max_len: u8) -> Result<Self> {
        if freqs.is_empty() {
            return Err(BzError::invalid_argument("cannot build a Huffman book for no symbols"));
        }
        if max_len == 0 || max_len > 32 {
            return Err(BzError::invalid_argument(format!(
                "code length limit {max_len} outside 1..=32"
            )));
        }
        if freqs.len() > MAX_ALPHA_SIZE {
            return Err(BzError::encoding_failed(format!(
                "alphabet of {} symbols exceeds {MAX_ALPHA_SIZE}",
                freqs.len()
            )));
        }
        if freqs.len() as u64 > 1u64 << max_len {
            return Err(BzError::encoding_failed(format!(
                "{} symbols cannot be coded in {max_len} bits",
                freqs.len()
            )));
        }

        let mut weights: Vec<u64> = freqs.iter().map(|&f| f as u64).collect();
        let mut attempt = 0;
        loop {
            let depths = leaf_depths(&weights);
            let longest = depths.iter().copied().max().unwrap_or(1);
            if longest <= max_len as usize {
                let lengths: Vec<u8> = depths.iter().map(|&d| d as u8).collect();
                return Self::from_lengths(&lengths);
            }

            attempt += 1;
            trace!("Huffman tree depth {longest} exceeds {max_len}, flattening (attempt {attempt})");
            for w in weights.iter_mut() {
                *w = 1 + *w / 2;
            }
        }
    }

    /// Assign canonical codes to the given code lengths.
    ///
    /// Lengths must be in `1..=32` and must not over-subscribe the code space.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        if lengths.is_empty() {
            return Err(BzError::invalid_argument("empty code length list"));
        }
        if let Some(&bad) = lengths.iter().find(|&&l| l == 0 || l > 32) {
            return Err(BzError::invalid_argument(format!("code length {bad} outside 1..=32")));
        }

        let max_len = lengths.iter().copied().max().unwrap_or(1);
        let mut codes = vec![Code::default(); lengths.len()];
        let mut code = 0u64;

        for len in 1..=max_len {
            for (sym, &l) in lengths.iter().enumerate() {
                if l == len {
                    codes[sym] = Code {
                        bits: code as u32,
                        len,
                    };
                    code += 1;
                }
            }
            if code > 1u64 << len {
                return Err(BzError::encoding_failed(format!(
                    "code lengths over-subscribe {len}-bit codes"
                )));
            }
            code <<= 1;
        }

        Ok(Self { codes })
    }

    /// Code of `symbol`, if it is in the alphabet.
    #[inline]
    pub fn code(&self, symbol: u16) -> Option<Code> {
        self.codes.get(symbol as usize).copied()
    }

    /// All codes, indexed by symbol value.
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Code lengths, indexed by symbol value.
    pub fn lengths(&self) -> Vec<u8> {
        self.codes.iter().map(|c| c.len).collect()
    }

    /// Length of the longest code.
    pub fn max_len(&self) -> u8 {
        self.codes.iter().map(|c| c.len).max().unwrap_or(0)
    }

    /// Alphabet size.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the book has no symbols.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (sym, code) in self.codes.iter().enumerate() {
            writeln!(f, "{sym:3}: {code}")?;
        }
        Ok(())
    }
}

/// Build a Huffman tree over `weights` and return the depth of every leaf.
///
/// A lone symbol gets depth 1 so that it still has a one-bit code.
fn leaf_depths(weights: &[u64]) -> Vec<usize> {
    let n = weights.len();
    if n == 1 {
        return vec![1];
    }

    let mut nodes: Vec<Node> = weights
        .iter()
        .enumerate()
        .map(|(sym, &freq)| Node {
            freq,
            kind: NodeKind::Leaf(sym),
        })
        .collect();

    // Sorted by descending frequency so the lightest nodes pop off the end.
    // Among equal frequencies the lower symbol is merged first.
    let mut queue: Vec<usize> = (0..n).collect();
    queue.sort_by(|&a, &b| nodes[b].freq.cmp(&nodes[a].freq).then(b.cmp(&a)));

    while queue.len() > 1 {
        let (Some(first), Some(second)) = (queue.pop(), queue.pop()) else {
            break;
        };
        let freq = nodes[first].freq + nodes[second].freq;
        nodes.push(Node {
            freq,
            kind: NodeKind::Internal {
                left: first,
                right: second,
            },
        });
        let id = nodes.len() - 1;

        // Merged nodes go behind existing nodes of the same weight.
        let pos = queue.partition_point(|&q| nodes[q].freq > freq);
        queue.insert(pos, id);
    }

    let mut depths = vec![0usize; n];
    let mut level = queue;
    let mut depth = 0usize;
    while !level.is_empty() {
        let mut next = Vec::with_capacity(level.len() * 2);
        for &id in &level {
            match nodes[id].kind {
                NodeKind::Leaf(sym) => depths[sym] = depth,
                NodeKind::Internal { left, right } => {
                    next.push(left);
                    next.push(right);
                }
            }
        }
        level = next;
        depth += 1;
    }

    depths
}
