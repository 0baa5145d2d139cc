//! Move-to-Front Transform for BZip2.
//!
//! MTF transforms a stream by replacing each byte with its position
//! in a dynamic list. After each byte, that byte is moved to the front
//! of the list. This converts local byte clusters into many zeros.
//!
//! The list only holds the byte values that occur in the block, starting
//! in ascending order, so the output alphabet is as small as the block's
//! set of used bytes.

/// The set of distinct byte values present in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedBytes {
    present: [bool; 256],
}

impl UsedBytes {
    /// Collect the byte values appearing in `data`.
    pub fn from_data(data: &[u8]) -> Self {
        let mut present = [false; 256];
        for &byte in data {
            present[byte as usize] = true;
        }
        Self { present }
    }

    /// Whether `byte` occurs.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.present[byte as usize]
    }

    /// Number of distinct byte values.
    pub fn len(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    /// Whether no byte occurs at all.
    pub fn is_empty(&self) -> bool {
        !self.present.iter().any(|&p| p)
    }

    /// Used byte values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&b| self.present[b as usize])
    }

    /// 16-bit map of which 16-value ranges contain a used byte,
    /// first range in the most significant bit.
    pub fn range_map(&self) -> u16 {
        let mut map = 0u16;
        for range in 0..16 {
            if self.present[range * 16..range * 16 + 16].iter().any(|&p| p) {
                map |= 1 << (15 - range);
            }
        }
        map
    }

    /// 16-bit map of the used bytes within one 16-value range.
    pub fn range_bitmap(&self, range: usize) -> u16 {
        let mut map = 0u16;
        for offset in 0..16 {
            if self.present[range * 16 + offset] {
                map |= 1 << (15 - offset);
            }
        }
        map
    }
}

/// Perform the Move-to-Front transform.
///
/// Returns the set of used bytes and, for every input byte, its position
/// in the front list at the time it was seen.
pub fn transform(data: &[u8]) -> (UsedBytes, Vec<u8>) {
    let used = UsedBytes::from_data(data);
    let mut list: Vec<u8> = used.iter().collect();
    let mut result = Vec::with_capacity(data.len());

    for &byte in data {
        let mut pos = 0;
        while list[pos] != byte {
            pos += 1;
        }
        result.push(pos as u8);

        if pos > 0 {
            list.copy_within(0..pos, 1);
            list[0] = byte;
        }
    }

    (used, result)
}

/// Perform the inverse Move-to-Front transform.
pub fn inverse_transform(used: &UsedBytes, data: &[u8]) -> Vec<u8> {
    let mut list: Vec<u8> = used.iter().collect();
    let mut result = Vec::with_capacity(data.len());

    for &pos in data {
        let pos = pos as usize;
        let byte = list[pos];
        result.push(byte);

        if pos > 0 {
            list.copy_within(0..pos, 1);
            list[0] = byte;
        }
    }

    result
}
