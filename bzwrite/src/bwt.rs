//! Burrows-Wheeler Transform for BZip2.
//!
//! The BWT is a reversible transformation that groups similar bytes together,
//! making the data more compressible.
//!
//! Rotations are never materialized. They are sorted by prefix doubling:
//! after the round with offset `k`, every rotation carries the rank of its
//! first `2k` bytes, computed from the pair of ranks of its first `k` bytes
//! and of the `k` bytes starting `k` positions later.

use rayon::slice::ParallelSliceMut;
use std::cmp::Ordering;

/// Inputs at least this long are sorted on the rayon pool.
const PARALLEL_SORT_THRESHOLD: usize = 1 << 16;

/// Perform the Burrows-Wheeler Transform.
///
/// Returns the last column of the sorted rotation matrix and the origin
/// pointer: the rank of the unrotated input among all sorted rotations.
pub fn transform(data: &[u8]) -> (Vec<u8>, u32) {
    if data.is_empty() {
        return (Vec::new(), 0);
    }

    let n = data.len();
    let order = sort_rotations(data);

    let mut orig_ptr = 0u32;
    let mut transformed = Vec::with_capacity(n);
    for (rank, &start) in order.iter().enumerate() {
        if start == 0 {
            orig_ptr = rank as u32;
        }
        transformed.push(data[(start + n - 1) % n]);
    }

    (transformed, orig_ptr)
}

/// Sort the start positions of all cyclic rotations of `data`.
///
/// Rotations that compare equal over their full length (periodic input)
/// keep ascending start order.
fn sort_rotations(data: &[u8]) -> Vec<usize> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rank: Vec<u32> = data.iter().map(|&b| b as u32).collect();
    let mut next_rank = vec![0u32; n];

    // Ranks after the first sort cover one byte; each round doubles that.
    let mut span = 1usize;
    loop {
        let k = span % n;
        let key = |i: usize| (rank[i], rank[(i + k) % n]);
        let compare = |&a: &usize, &b: &usize| -> Ordering { key(a).cmp(&key(b)).then(a.cmp(&b)) };

        if n >= PARALLEL_SORT_THRESHOLD {
            order.par_sort_unstable_by(compare);
        } else {
            order.sort_unstable_by(compare);
        }

        next_rank[order[0]] = 0;
        for w in 1..n {
            let bump = (key(order[w - 1]) != key(order[w])) as u32;
            next_rank[order[w]] = next_rank[order[w - 1]] + bump;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        span *= 2;
        if rank[order[n - 1]] as usize == n - 1 || span >= n {
            break;
        }
    }

    order
}

/// Perform inverse Burrows-Wheeler Transform.
/// Reconstructs the original data from the transformed data and origin pointer.
pub fn inverse_transform(data: &[u8], orig_ptr: u32) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }

    let n = data.len();

    // Count occurrences of each byte
    let mut counts = [0usize; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    // Starting positions for each byte in the sorted first column
    let mut cumulative = [0usize; 256];
    let mut total = 0;
    for i in 0..256 {
        cumulative[i] = total;
        total += counts[i];
    }

    // next[row] is the row of the rotation starting one byte later
    let mut next = vec![0usize; n];
    let mut positions = cumulative;

    for (i, &byte) in data.iter().enumerate() {
        next[positions[byte as usize]] = i;
        positions[byte as usize] += 1;
    }

    let mut result = Vec::with_capacity(n);
    let mut idx = next[orig_ptr as usize % n];

    for _ in 0..n {
        result.push(data[idx]);
        idx = next[idx];
    }

    result
}
