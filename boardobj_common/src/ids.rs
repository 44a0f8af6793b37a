//! Class and object type identifiers.
//!
//! A [`ClassId`] names a family of board objects that share one group (clock
//! domains, thermal channels, ...). A [`BoardObjType`] names one level of a
//! class hierarchy: concrete types, virtual super-types and interfaces all
//! share the same tag space within a class.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Group class identifier, as carried in byte 1 of every group header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u8);

impl ClassId {
    /// Raw wire value.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {:#04x}", self.0)
    }
}

/// Object type tag within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardObjType(pub u8);

impl BoardObjType {
    /// The generic base object every concrete type derives from.
    ///
    /// Never a concrete type. On the wire and in resident tables an entry
    /// carrying this tag denotes an empty slot.
    pub const BASE: Self = Self(0x00);

    /// Raw wire value.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// True for the reserved base tag.
    #[inline]
    pub const fn is_base(self) -> bool {
        self.0 == Self::BASE.0
    }
}

impl fmt::Display for BoardObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {:#04x}", self.0)
    }
}
