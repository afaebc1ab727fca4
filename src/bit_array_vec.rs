//! Fixed-length list of packed bit arrays.

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::mem;

const BLOCK_BIT_COUNT: usize = mem::size_of::<u64>() * 8;

/// The widest bit array a `BitArrayVec` can hold.
pub const MAX_BIT_COUNT: usize = 32;

/// A fixed-length list of `bit_count`-bit unsigned values packed into a `Vec<u64>`.
///
/// Holds cuckoo fingerprints and Bloom counters alike. A value may straddle two blocks. The value
/// 0 marks an empty slot, and the number of non-empty slots is maintained on every `set`.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct BitArrayVec {
    blocks: Vec<u64>,
    bit_count: usize,
    occupied_len: usize,
    len: usize,
}

impl BitArrayVec {
    fn get_block_count(bit_count: usize, len: usize) -> usize {
        (bit_count * len + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT
    }

    /// Constructs a new `BitArrayVec` of `len` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `bit_count` is 0 or greater than 32.
    pub fn new(bit_count: usize, len: usize) -> Self {
        assert!(bit_count > 0 && bit_count <= MAX_BIT_COUNT);
        BitArrayVec {
            blocks: vec![0; Self::get_block_count(bit_count, len)],
            bit_count,
            occupied_len: 0,
            len,
        }
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1 << self.bit_count) - 1
    }

    /// Returns the value at `index`, or 0 if the slot is empty.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len);
        let bit_offset = index * self.bit_count;
        let block_index = bit_offset / BLOCK_BIT_COUNT;
        let shift = bit_offset % BLOCK_BIT_COUNT;
        let low_bit_count = BLOCK_BIT_COUNT - shift;

        let mut value = self.blocks[block_index] >> shift;
        if low_bit_count < self.bit_count {
            value |= self.blocks[block_index + 1] << low_bit_count;
        }
        (value & self.mask()) as u32
    }

    /// Sets the slot at `index` to `value`. Bits above `bit_count` are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: u32) {
        let prev_is_empty = self.get(index) == 0;
        let mask = self.mask();
        let value = u64::from(value) & mask;
        let bit_offset = index * self.bit_count;
        let block_index = bit_offset / BLOCK_BIT_COUNT;
        let shift = bit_offset % BLOCK_BIT_COUNT;
        let low_bit_count = BLOCK_BIT_COUNT - shift;

        self.blocks[block_index] &= !(mask << shift);
        self.blocks[block_index] |= value << shift;
        if low_bit_count < self.bit_count {
            self.blocks[block_index + 1] &= !(mask >> low_bit_count);
            self.blocks[block_index + 1] |= value >> low_bit_count;
        }

        let curr_is_empty = value == 0;
        if prev_is_empty != curr_is_empty {
            if curr_is_empty {
                self.occupied_len -= 1;
            } else {
                self.occupied_len += 1;
            }
        }
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            *block = 0;
        }
        self.occupied_len = 0;
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Returns the number of non-empty slots.
    pub fn occupied_len(&self) -> usize {
        self.occupied_len
    }

    /// Returns an iterator over every slot, empty slots included.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(move |index| self.get(index))
    }

    /// Returns the number of bits in each slot.
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }
}

#[cfg(test)]
mod tests {
    use super::BitArrayVec;

    #[test]
    fn test_new() {
        let bav = BitArrayVec::new(10, 16);
        assert_eq!(bav.capacity(), 16);
        assert_eq!(bav.bit_count(), 10);
        assert_eq!(bav.occupied_len(), 0);
        assert!((0..16).all(|index| bav.get(index) == 0));
    }

    #[test]
    #[should_panic]
    fn test_new_too_wide() {
        BitArrayVec::new(33, 1);
    }

    #[test]
    fn test_set_straddles_blocks() {
        // 7 * 10 bits puts index 6 across the first block boundary
        let mut bav = BitArrayVec::new(10, 16);
        bav.set(5, 0x3FF);
        bav.set(6, 0x2AB);
        bav.set(7, 0x155);

        assert_eq!(bav.get(5), 0x3FF);
        assert_eq!(bav.get(6), 0x2AB);
        assert_eq!(bav.get(7), 0x155);
        assert_eq!(bav.get(4), 0);
        assert_eq!(bav.get(8), 0);
        assert_eq!(bav.occupied_len(), 3);
    }

    #[test]
    fn test_set_truncates() {
        let mut bav = BitArrayVec::new(4, 4);
        bav.set(1, 0xF3);
        assert_eq!(bav.get(1), 0x3);
        assert_eq!(bav.get(0), 0);
        assert_eq!(bav.get(2), 0);
    }

    #[test]
    fn test_occupied_len() {
        let mut bav = BitArrayVec::new(32, 8);
        bav.set(0, 1);
        bav.set(0, 2);
        assert_eq!(bav.occupied_len(), 1);

        bav.set(7, u32::max_value());
        assert_eq!(bav.get(7), u32::max_value());
        assert_eq!(bav.occupied_len(), 2);

        bav.set(0, 0);
        assert_eq!(bav.occupied_len(), 1);

        bav.clear();
        assert_eq!(bav.occupied_len(), 0);
        assert_eq!(bav.get(7), 0);
    }

    #[test]
    fn test_iter() {
        let mut bav = BitArrayVec::new(3, 5);
        bav.set(1, 7);
        bav.set(3, 2);
        assert_eq!(bav.iter().collect::<Vec<u32>>(), vec![0, 7, 0, 2, 0]);
    }

    #[test]
    fn test_every_width() {
        for bit_count in 1..=32 {
            let mut bav = BitArrayVec::new(bit_count, 100);
            let mask = ((1u64 << bit_count) - 1) as u32;
            for index in 0..100 {
                bav.set(index, (index as u32).wrapping_mul(0x9E37_79B9) | 1);
            }
            for index in 0..100 {
                assert_eq!(
                    bav.get(index),
                    ((index as u32).wrapping_mul(0x9E37_79B9) | 1) & mask,
                );
            }
            assert_eq!(bav.occupied_len(), 100);
        }
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_bounds() {
        let bav = BitArrayVec::new(8, 4);
        bav.get(4);
    }
}
