//! System-wide constants for the BOARDOBJ workspace.
//!
//! Single source of truth for all numeric limits and wire sizes.

/// Largest group capacity of any tier (E2048).
pub const MAX_OBJ_SLOTS: usize = 2048;

/// Bits per membership mask word on the wire and in memory.
pub const MASK_WORD_BITS: usize = 32;

/// Number of `u32` words needed for the largest mask: `2048 / 32 = 64`.
pub const MASK_MAX_WORDS: usize = MAX_OBJ_SLOTS / MASK_WORD_BITS;

/// Size of the fixed part of a group header on the wire, in bytes.
pub const GRP_HEADER_FIXED_SIZE: usize = 8;

/// Size of the identity part of every wire entry, in bytes.
pub const ENTRY_HEADER_SIZE: usize = 4;

/// Default scratch buffer size in bytes.
pub const DEFAULT_SCRATCH_SIZE: usize = 4096;

/// Default byte budget for the object allocator (64 KiB).
pub const DEFAULT_DMEM_BUDGET: usize = 64 * 1024;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/boardobj/config.toml";

/// Number of mask words for a given bit capacity.
#[inline]
pub const fn mask_words(capacity: usize) -> usize {
    capacity.div_ceil(MASK_WORD_BITS)
}
