//! Capacity-bounded membership bitset.
//!
//! One mask type serves every group tier: the capacity is fixed when the
//! mask is created and every operation stays inside it. Storage is a
//! fixed-size word array (no heap), large enough for the biggest tier.
//!
//! ## Layout
//!
//! `words[i]` holds indices `(i*32)..((i+1)*32)`.
//! Bit 0 of `words[0]` = index 0, bit 31 of `words[0]` = index 31,
//! bit 0 of `words[1]` = index 32, etc. Bits at or beyond the capacity are
//! always zero.

use heapless::Vec as FixedVec;

use crate::consts::{MASK_MAX_WORDS, MASK_WORD_BITS, MAX_OBJ_SLOTS, mask_words};
use crate::error::{BoardObjError, BoardObjResult};
use crate::tier::GroupTier;

/// Membership bitset with a capacity fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardObjMask {
    capacity: u16,
    words: FixedVec<u32, MASK_MAX_WORDS>,
}

impl BoardObjMask {
    /// Create an empty mask of `capacity` bits.
    ///
    /// # Errors
    /// `CapacityExceeded` if `capacity` is larger than the biggest tier.
    pub fn new(capacity: usize) -> BoardObjResult<Self> {
        if capacity > MAX_OBJ_SLOTS {
            return Err(BoardObjError::CapacityExceeded {
                requested: capacity,
                capacity: MAX_OBJ_SLOTS,
            });
        }
        let mut words = FixedVec::new();
        words
            .resize(mask_words(capacity), 0)
            .map_err(|_| BoardObjError::CapacityExceeded {
                requested: capacity,
                capacity: MAX_OBJ_SLOTS,
            })?;
        Ok(Self {
            capacity: capacity as u16,
            words,
        })
    }

    /// Create an empty mask sized for a tier.
    ///
    /// # Errors
    /// `UnsupportedTier` if the tier is compiled out.
    pub fn for_tier(tier: GroupTier) -> BoardObjResult<Self> {
        Self::new(tier.capacity()?)
    }

    /// Build a mask with the given indices set.
    pub fn from_indices(
        capacity: usize,
        indices: impl IntoIterator<Item = u16>,
    ) -> BoardObjResult<Self> {
        let mut mask = Self::new(capacity)?;
        for idx in indices {
            mask.set(idx)?;
        }
        Ok(mask)
    }

    /// Declared capacity in bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Backing words (exactly `ceil(capacity / 32)` of them).
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Read one bit. Indices outside the capacity read as clear.
    #[inline]
    pub fn get(&self, idx: u16) -> bool {
        let idx = idx as usize;
        if idx >= self.capacity() {
            return false;
        }
        (self.words[idx / MASK_WORD_BITS] >> (idx % MASK_WORD_BITS)) & 1 == 1
    }

    /// Set one bit.
    ///
    /// # Errors
    /// `CapacityExceeded` if `idx` is outside the capacity.
    pub fn set(&mut self, idx: u16) -> BoardObjResult<()> {
        let i = self.check_index(idx)?;
        self.words[i / MASK_WORD_BITS] |= 1u32 << (i % MASK_WORD_BITS);
        Ok(())
    }

    /// Clear one bit.
    ///
    /// # Errors
    /// `CapacityExceeded` if `idx` is outside the capacity.
    pub fn clear(&mut self, idx: u16) -> BoardObjResult<()> {
        let i = self.check_index(idx)?;
        self.words[i / MASK_WORD_BITS] &= !(1u32 << (i % MASK_WORD_BITS));
        Ok(())
    }

    /// Clear every bit.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Set every bit inside the capacity.
    pub fn set_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = u32::MAX);
        self.trim();
    }

    /// Population count.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest set index.
    pub fn lowest(&self) -> Option<u16> {
        self.iter().next()
    }

    /// Highest set index.
    pub fn highest(&self) -> Option<u16> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| (i * MASK_WORD_BITS + (31 - w.leading_zeros() as usize)) as u16)
    }

    /// `self &= other`.
    ///
    /// # Errors
    /// `InvalidArgument` if the capacities differ.
    pub fn and(&mut self, other: &Self) -> BoardObjResult<()> {
        self.check_same_capacity(other)?;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= *b;
        }
        Ok(())
    }

    /// `self |= other`.
    ///
    /// # Errors
    /// `InvalidArgument` if the capacities differ.
    pub fn or(&mut self, other: &Self) -> BoardObjResult<()> {
        self.check_same_capacity(other)?;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= *b;
        }
        Ok(())
    }

    /// True if every bit set in `self` is also set in `other`.
    ///
    /// Masks of different capacity compare bit by bit; a bit beyond
    /// `other`'s capacity makes `self` not a subset.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Iterate set indices in ascending order.
    pub fn iter(&self) -> SetBits<'_> {
        SetBits {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Import a wire mask of `src_capacity` bits.
    ///
    /// Bits at or beyond `src_capacity` in the last source word are ignored.
    ///
    /// # Errors
    /// - `CapacityExceeded` if `src_capacity` exceeds this mask's capacity.
    /// - `BufferTooSmall` if `words` holds fewer words than `src_capacity` needs.
    pub fn import_words(&mut self, words: &[u32], src_capacity: usize) -> BoardObjResult<()> {
        if src_capacity > self.capacity() {
            return Err(BoardObjError::CapacityExceeded {
                requested: src_capacity,
                capacity: self.capacity(),
            });
        }
        let needed = mask_words(src_capacity);
        if words.len() < needed {
            return Err(BoardObjError::BufferTooSmall {
                required: needed * 4,
                available: words.len() * 4,
            });
        }
        self.clear_all();
        for (dst, src) in self.words.iter_mut().zip(words[..needed].iter()) {
            *dst = *src;
        }
        let tail = src_capacity % MASK_WORD_BITS;
        if tail != 0 {
            self.words[needed - 1] &= (1u32 << tail) - 1;
        }
        Ok(())
    }

    /// Export into wire words, zero-filling words past this mask.
    ///
    /// # Errors
    /// `BufferTooSmall` if `out` cannot hold this mask's capacity.
    pub fn export_words(&self, out: &mut [u32]) -> BoardObjResult<()> {
        if out.len() < self.words.len() {
            return Err(BoardObjError::BufferTooSmall {
                required: self.words.len() * 4,
                available: out.len() * 4,
            });
        }
        out.iter_mut().for_each(|w| *w = 0);
        out[..self.words.len()].copy_from_slice(&self.words);
        Ok(())
    }

    fn check_index(&self, idx: u16) -> BoardObjResult<usize> {
        let i = idx as usize;
        if i >= self.capacity() {
            return Err(BoardObjError::CapacityExceeded {
                requested: i + 1,
                capacity: self.capacity(),
            });
        }
        Ok(i)
    }

    fn check_same_capacity(&self, other: &Self) -> BoardObjResult<()> {
        if self.capacity != other.capacity {
            return Err(BoardObjError::InvalidArgument {
                reason: "mask capacities differ",
            });
        }
        Ok(())
    }

    fn trim(&mut self) {
        let tail = self.capacity() % MASK_WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u32 << tail) - 1;
            }
        }
    }
}

/// Ascending iterator over the set indices of a [`BoardObjMask`].
pub struct SetBits<'a> {
    words: &'a [u32],
    word_idx: usize,
    current: u32,
}

impl Iterator for SetBits<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some((self.word_idx * MASK_WORD_BITS + bit) as u16);
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }
}

impl<'a> IntoIterator for &'a BoardObjMask {
    type Item = u16;
    type IntoIter = SetBits<'a>;

    fn into_iter(self) -> SetBits<'a> {
        self.iter()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
