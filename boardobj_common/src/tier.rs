//! Group capacity tiers.
//!
//! A group's tier is fixed where the group is declared and decides the
//! capacity of its slot array and membership mask. Tiers E512 and larger
//! can be compiled out through cargo features; asking for the capacity of a
//! disabled tier is a state error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::mask_words;
use crate::error::{BoardObjError, BoardObjResult};

/// Group capacity tier, discriminant = wire `group_type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum GroupTier {
    /// Up to 32 objects.
    E32 = 0x01,
    /// Up to 255 objects.
    E255 = 0x02,
    /// Up to 512 objects.
    E512 = 0x03,
    /// Up to 1024 objects.
    E1024 = 0x04,
    /// Up to 2048 objects.
    E2048 = 0x05,
}

impl GroupTier {
    /// All tiers, enabled or not, in ascending capacity order.
    pub const ALL: [Self; 5] = [Self::E32, Self::E255, Self::E512, Self::E1024, Self::E2048];

    /// Convert from raw `u8` wire code. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::E32),
            0x02 => Some(Self::E255),
            0x03 => Some(Self::E512),
            0x04 => Some(Self::E1024),
            0x05 => Some(Self::E2048),
            _ => None,
        }
    }

    /// Nominal capacity, regardless of whether the tier is compiled in.
    #[inline]
    pub const fn nominal_capacity(self) -> usize {
        match self {
            Self::E32 => 32,
            Self::E255 => 255,
            Self::E512 => 512,
            Self::E1024 => 1024,
            Self::E2048 => 2048,
        }
    }

    /// Whether this tier is compiled into the build.
    #[inline]
    pub const fn is_enabled(self) -> bool {
        match self {
            Self::E32 | Self::E255 => true,
            Self::E512 => cfg!(feature = "tier-e512"),
            Self::E1024 => cfg!(feature = "tier-e1024"),
            Self::E2048 => cfg!(feature = "tier-e2048"),
        }
    }

    /// Capacity of an enabled tier.
    ///
    /// # Errors
    /// `BoardObjError::UnsupportedTier` if the tier is compiled out.
    pub fn capacity(self) -> BoardObjResult<usize> {
        if self.is_enabled() {
            Ok(self.nominal_capacity())
        } else {
            Err(BoardObjError::UnsupportedTier { raw: self as u8 })
        }
    }

    /// Number of `u32` words in this tier's wire mask.
    #[inline]
    pub const fn mask_words(self) -> usize {
        mask_words(self.nominal_capacity())
    }

    /// Largest enabled tier of this build.
    pub fn largest_enabled() -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|t| t.is_enabled())
            .unwrap_or(Self::E255)
    }
}

/// Capacity of the tier named by a raw wire code.
///
/// # Errors
/// `BoardObjError::UnsupportedTier` for unknown codes and disabled tiers.
pub fn tier_capacity(raw: u8) -> BoardObjResult<usize> {
    GroupTier::from_u8(raw)
        .ok_or(BoardObjError::UnsupportedTier { raw })?
        .capacity()
}

impl fmt::Display for GroupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.nominal_capacity())
    }
}
