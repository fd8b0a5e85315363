//! Bitmap-backed block allocator

use crate::error::{Result, VolError};

use super::BlockIndex;

const WORD_BITS: u32 = u64::BITS;

/// Split a block index into (word position, bit position)
fn decompose(index: BlockIndex) -> (usize, u32) {
    ((index / WORD_BITS) as usize, index % WORD_BITS)
}

/// Free/used bitmap over a fixed pool of blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAllocator {
    /// Packed usage bits, one per block
    words: Vec<u64>,
    /// Number of addressable blocks
    capacity: u32,
    /// Blocks currently free (kept in step with `words`)
    free: u32,
}

impl BlockAllocator {
    /// Create an allocator with every block free
    pub fn new(capacity: u32) -> Self {
        let word_count = capacity.div_ceil(WORD_BITS) as usize;
        let mut words = vec![0u64; word_count];

        // Mark the padding bits of the last word as used so scans never hand
        // them out.
        let tail = capacity % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last = !((1u64 << tail) - 1);
            }
        }

        Self {
            words,
            capacity,
            free: capacity,
        }
    }

    /// Allocate `count` blocks, lowest free indices first
    ///
    /// Returns the chosen indices in increasing order. Fails with
    /// `InsufficientSpace` before touching the bitmap when fewer than `count`
    /// blocks are free.
    pub fn allocate(&mut self, count: u64) -> Result<Vec<BlockIndex>> {
        if count > u64::from(self.free) {
            return Err(VolError::InsufficientSpace {
                requested: count,
                available: u64::from(self.free),
            });
        }

        let count = count as usize;
        let mut chosen = Vec::with_capacity(count);

        'scan: for (word_pos, word) in self.words.iter_mut().enumerate() {
            while *word != u64::MAX {
                if chosen.len() == count {
                    break 'scan;
                }
                let bit = word.trailing_ones();
                *word |= 1u64 << bit;
                chosen.push(word_pos as u32 * WORD_BITS + bit);
            }
            if chosen.len() == count {
                break;
            }
        }

        self.free -= chosen.len() as u32;
        debug_assert_eq!(chosen.len(), count, "free counter out of step with bitmap");

        Ok(chosen)
    }

    /// Return blocks to the pool
    ///
    /// Releasing a block that is not allocated is a caller bug: it trips a
    /// debug assertion, is reported, and is otherwise ignored.
    pub fn release(&mut self, indices: &[BlockIndex]) {
        for &index in indices {
            if !self.is_allocated(index) {
                tracing::error!(index, capacity = self.capacity, "release of a block that is not allocated");
                debug_assert!(false, "block {} released while free", index);
                continue;
            }
            let (word_pos, bit) = decompose(index);
            self.words[word_pos] &= !(1u64 << bit);
            self.free += 1;
        }
    }

    /// Mark a specific set of blocks as used (image load)
    ///
    /// All-or-nothing: out-of-range, already-used or repeated indices fail
    /// with `Corrupt` and leave the bitmap unchanged.
    pub fn claim(&mut self, indices: &[BlockIndex]) -> Result<()> {
        let mut staged = self.words.clone();

        for &index in indices {
            if index >= self.capacity {
                return Err(VolError::Corrupt(format!(
                    "block {} outside pool of {} blocks",
                    index, self.capacity
                )));
            }
            let (word_pos, bit) = decompose(index);
            let mask = 1u64 << bit;
            if staged[word_pos] & mask != 0 {
                return Err(VolError::Corrupt(format!(
                    "block {} claimed twice",
                    index
                )));
            }
            staged[word_pos] |= mask;
        }

        self.words = staged;
        self.free -= indices.len() as u32;
        Ok(())
    }

    /// Whether `index` is currently allocated (false when out of range)
    pub fn is_allocated(&self, index: BlockIndex) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (word_pos, bit) = decompose(index);
        self.words[word_pos] >> bit & 1 == 1
    }

    /// Number of free blocks
    pub fn free_count(&self) -> u32 {
        self.free
    }

    /// Number of allocated blocks
    pub fn used_count(&self) -> u32 {
        self.capacity - self.free
    }

    /// Total number of blocks in the pool
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
