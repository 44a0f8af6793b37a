//! Group serialization protocol.
//!
//! Two engines move group state across the shared surface:
//!
//! - **Set** reads a group header and one entry per requested slot and
//!   constructs or updates the objects.
//! - **GetStatus** reads a group header, then fills and writes back one
//!   entry per requested slot from the live objects.
//!
//! Each engine has a per-entry form (one surface transfer per entry, staged
//! through local scratch) and a bulk ("auto") form that works on a resident
//! copy of the whole header + entry region.
//!
//! # Module Structure
//!
//! - [`class`] - Per-class construct/query callbacks
//! - [`buffer`] - Header/entry staging for both transfer forms
//! - [`set`] - Set engines and source-driven construction
//! - [`get_status`] - GetStatus engines

pub mod buffer;
pub mod class;
pub mod get_status;
pub mod set;

use boardobj::config::OverwritePolicy;

use crate::alloc::ObjAllocator;
use crate::grp::BoardObjGrp;

pub use class::BoardObjGrpClass;
pub use get_status::{grp_get_status, grp_get_status_auto};
pub use set::{grp_construct_from_src, grp_set, grp_set_auto};

/// Everything an engine works on besides the transfer itself.
pub struct GrpEnv<'a> {
    /// Target group.
    pub grp: &'a mut BoardObjGrp,
    /// Class callbacks of the group.
    pub class: &'a mut dyn BoardObjGrpClass,
    /// Object memory.
    pub alloc: &'a mut dyn ObjAllocator,
    /// What UPDATE does to live objects.
    pub policy: OverwritePolicy,
}

/// Where a group's wire data lives on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardObjGrpLocation {
    /// Surface offset of the group header.
    pub offset: usize,
    /// Header size, including mask and class-specific fields.
    pub header_size: usize,
    /// Size of one entry, including its 4-byte entry header.
    pub entry_size: usize,
    /// Largest `obj_slots` the host may declare.
    pub max_slots: u16,
}

impl BoardObjGrpLocation {
    /// Surface offset of entry `idx`.
    #[inline]
    pub const fn entry_offset(&self, idx: u16) -> usize {
        self.offset + self.header_size + idx as usize * self.entry_size
    }

    /// Bytes spanned by the header and `obj_slots` entries.
    #[inline]
    pub const fn region_size(&self, obj_slots: u16) -> usize {
        self.header_size + obj_slots as usize * self.entry_size
    }
}
