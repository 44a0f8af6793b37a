//! CLK_DOMAIN class.
//!
//! ```text
//! BASE
//! └── CLK_DOMAIN (0x01, virtual)
//!     └── 3X (0x02, virtual)
//!         ├── 3X_FIXED (0x03)
//!         └── 3X_PROG (0x04, virtual, embeds PROG 0x07)
//!             ├── 35_PRIMARY (0x05)
//!             └── 35_SECONDARY (0x06)
//! ```
//!
//! Entry fields, after the entry header, in level order:
//!
//! | Level      | Fields                                                          |
//! |------------|-----------------------------------------------------------------|
//! | CLK_DOMAIN | `api_domain: u32`, `perf_domain_idx: u8`                        |
//! | 3X         | `noise_aware: bool`                                             |
//! | 3X_FIXED   | `freq_mhz: u16`                                                 |
//! | 3X_PROG    | `prog_idx_first: u8`, `prog_idx_last: u8`, `delta_min_mhz: i16`, `delta_max_mhz: i16` |
//! | 35_PRIMARY | `secondary_mask: u32`                                           |
//! | 35_SECONDARY | `primary_idx: u8`                                             |
//!
//! Header extension: `cntr_sample_period_ms: u16`. Status: `freq_khz: u32`.

use std::any::Any;
use std::mem::{offset_of, size_of};

use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::tier::GroupTier;
use boardobj::wire::{WireReader, WireWriter};
use tracing::debug;

use super::{concrete, concrete_mut};
use crate::grp::BoardObjGrp;
use crate::iface::{BoardObjIface, BoardObjInterface, InterfaceVirtualTable};
use crate::obj::{BoardObjBase, BoardObject, unchecked_cast};
use crate::protocol::{BoardObjGrpClass, BoardObjGrpLocation};
use crate::vtable::BoardObjVirtualTable;

pub const CLASS_ID: ClassId = ClassId(0x02);

pub const TYPE_CLK_DOMAIN: BoardObjType = BoardObjType(0x01);
pub const TYPE_3X: BoardObjType = BoardObjType(0x02);
pub const TYPE_3X_FIXED: BoardObjType = BoardObjType(0x03);
pub const TYPE_3X_PROG: BoardObjType = BoardObjType(0x04);
pub const TYPE_35_PRIMARY: BoardObjType = BoardObjType(0x05);
pub const TYPE_35_SECONDARY: BoardObjType = BoardObjType(0x06);
pub const IFACE_PROG: BoardObjType = BoardObjType(0x07);

pub const HEADER_SIZE: usize = 16;
pub const ENTRY_SIZE: usize = 20;

/// Surface placement of the group.
pub const LOCATION: BoardObjGrpLocation = BoardObjGrpLocation {
    offset: 0x0000,
    header_size: HEADER_SIZE,
    entry_size: ENTRY_SIZE,
    max_slots: 32,
};

// ─── Levels ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain {
    pub super_: BoardObjBase,
    pub api_domain: u32,
    pub perf_domain_idx: u8,
    /// Last frequency reported to the host.
    pub freq_khz: u32,
}

impl ClkDomain {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: base,
            api_domain: 0,
            perf_domain_idx: 0,
            freq_khz: 0,
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.api_domain = r.read_u32()?;
        self.perf_domain_idx = r.read_u8()?;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        w.write_u32(self.api_domain)?;
        w.write_u8(self.perf_domain_idx)
    }
}

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain3x {
    pub super_: ClkDomain,
    pub noise_aware: bool,
}

impl ClkDomain3x {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: ClkDomain::new(base),
            noise_aware: false,
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.super_.set(r)?;
        self.noise_aware = r.read_bool()?;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        self.super_.export(w)?;
        w.write_bool(self.noise_aware)
    }
}

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain3xFixed {
    pub super_: ClkDomain3x,
    pub freq_mhz: u16,
}

impl ClkDomain3xFixed {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: ClkDomain3x::new(base),
            freq_mhz: 0,
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.super_.set(r)?;
        self.freq_mhz = r.read_u16()?;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        self.super_.export(w)?;
        w.write_u16(self.freq_mhz)
    }
}

/// PROG interface: programmable frequency range of a domain.
#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomainProg {
    pub iface: BoardObjInterface,
    pub prog_idx_first: u8,
    pub prog_idx_last: u8,
    pub delta_min_mhz: i16,
    pub delta_max_mhz: i16,
}

// SAFETY: `#[repr(C)]` led by `BoardObjInterface`; every embedding type
// describes it with an `InterfaceVirtualTable` tagged `IFACE_PROG`.
unsafe impl BoardObjIface for ClkDomainProg {
    const IFACE_TYPE: BoardObjType = IFACE_PROG;
}

impl ClkDomainProg {
    fn new(vtable: &'static InterfaceVirtualTable) -> Self {
        Self {
            iface: BoardObjInterface::new(vtable),
            prog_idx_first: 0,
            prog_idx_last: 0,
            delta_min_mhz: 0,
            delta_max_mhz: 0,
        }
    }

    /// Number of programming entries covered by the domain.
    pub fn prog_count(&self) -> u16 {
        u16::from(self.prog_idx_last) - u16::from(self.prog_idx_first) + 1
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        let first = r.read_u8()?;
        let last = r.read_u8()?;
        let delta_min = r.read_i16()?;
        let delta_max = r.read_i16()?;
        if first > last {
            return Err(BoardObjError::InvalidArgument {
                reason: "clock programming range is inverted",
            });
        }
        if delta_min > delta_max {
            return Err(BoardObjError::InvalidArgument {
                reason: "frequency delta range is inverted",
            });
        }
        self.prog_idx_first = first;
        self.prog_idx_last = last;
        self.delta_min_mhz = delta_min;
        self.delta_max_mhz = delta_max;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        w.write_u8(self.prog_idx_first)?;
        w.write_u8(self.prog_idx_last)?;
        w.write_i16(self.delta_min_mhz)?;
        w.write_i16(self.delta_max_mhz)
    }
}

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain3xProg {
    pub super_: ClkDomain3x,
    pub prog: ClkDomainProg,
}

impl ClkDomain3xProg {
    fn new(base: BoardObjBase, prog_vtable: &'static InterfaceVirtualTable) -> Self {
        Self {
            super_: ClkDomain3x::new(base),
            prog: ClkDomainProg::new(prog_vtable),
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.super_.set(r)?;
        self.prog.set(r)
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        self.super_.export(w)?;
        self.prog.export(w)
    }
}

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain35Primary {
    pub super_: ClkDomain3xProg,
    /// Slots of the secondaries following this primary.
    pub secondary_mask: u32,
}

impl ClkDomain35Primary {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: ClkDomain3xProg::new(base, &PRIMARY_PROG),
            secondary_mask: 0,
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.super_.set(r)?;
        let mask = r.read_u32()?;
        let own = 1u32.checked_shl(self.super_.super_.super_.super_.grp_idx() as u32);
        if own.is_some_and(|bit| mask & bit != 0) {
            return Err(BoardObjError::InvalidArgument {
                reason: "primary domain lists itself as secondary",
            });
        }
        self.secondary_mask = mask;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        self.super_.export(w)?;
        w.write_u32(self.secondary_mask)
    }
}

#[derive(Debug, Clone)]
#[repr(C)]
pub struct ClkDomain35Secondary {
    pub super_: ClkDomain3xProg,
    pub primary_idx: u8,
}

impl ClkDomain35Secondary {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: ClkDomain3xProg::new(base, &SECONDARY_PROG),
            primary_idx: 0,
        }
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        self.super_.set(r)?;
        self.primary_idx = r.read_u8()?;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        self.super_.export(w)?;
        w.write_u8(self.primary_idx)
    }
}

crate::impl_board_object!(ClkDomain3xFixed, super_.super_.super_);
crate::impl_board_object!(ClkDomain35Primary, super_.super_.super_.super_);
crate::impl_board_object!(ClkDomain35Secondary, super_.super_.super_.super_);

// ─── Virtual tables ─────────────────────────────────────────────────

static PRIMARY_PROG: InterfaceVirtualTable =
    // SAFETY: offset of the PROG interface inside `ClkDomain35Primary`,
    // listed only by `PrimaryVtable`.
    unsafe { InterfaceVirtualTable::new(IFACE_PROG, offset_of!(ClkDomain35Primary, super_.prog)) };

static SECONDARY_PROG: InterfaceVirtualTable =
    // SAFETY: as above, for `ClkDomain35Secondary` and `SecondaryVtable`.
    unsafe {
        InterfaceVirtualTable::new(IFACE_PROG, offset_of!(ClkDomain35Secondary, super_.prog))
    };

static PRIMARY_IFACES: [&InterfaceVirtualTable; 1] = [&PRIMARY_PROG];
static SECONDARY_IFACES: [&InterfaceVirtualTable; 1] = [&SECONDARY_PROG];

/// Virtual table of one concrete type: its own tag plus the field path of
/// every ancestor level.
macro_rules! clk_vtable {
    (
        $vt:ident, $ty:ty, $tag:expr,
        interfaces: $ifaces:expr,
        levels: { $($level:expr => $($field:ident).+),* $(,)? }
    ) => {
        struct $vt;

        impl BoardObjVirtualTable for $vt {
            fn class_id(&self) -> ClassId {
                CLASS_ID
            }

            fn obj_type(&self) -> BoardObjType {
                $tag
            }

            fn dynamic_cast<'a>(
                &self,
                obj: &'a dyn BoardObject,
                requested: BoardObjType,
            ) -> Option<&'a dyn Any> {
                let obj = obj.as_any().downcast_ref::<$ty>()?;
                if requested == $tag {
                    return Some(obj);
                }
                $(
                    if requested == $level {
                        return Some(&obj.$($field).+);
                    }
                )*
                None
            }

            fn dynamic_cast_mut<'a>(
                &self,
                obj: &'a mut dyn BoardObject,
                requested: BoardObjType,
            ) -> Option<&'a mut dyn Any> {
                let obj = obj.as_any_mut().downcast_mut::<$ty>()?;
                if requested == $tag {
                    return Some(obj);
                }
                $(
                    if requested == $level {
                        return Some(&mut obj.$($field).+);
                    }
                )*
                None
            }

            fn interfaces(&self) -> &'static [&'static InterfaceVirtualTable] {
                $ifaces
            }
        }
    };
}

clk_vtable!(FixedVtable, ClkDomain3xFixed, TYPE_3X_FIXED,
    interfaces: &[],
    levels: {
        TYPE_3X => super_,
        TYPE_CLK_DOMAIN => super_.super_,
        BoardObjType::BASE => super_.super_.super_,
    }
);

clk_vtable!(PrimaryVtable, ClkDomain35Primary, TYPE_35_PRIMARY,
    interfaces: &PRIMARY_IFACES,
    levels: {
        TYPE_3X_PROG => super_,
        TYPE_3X => super_.super_,
        TYPE_CLK_DOMAIN => super_.super_.super_,
        BoardObjType::BASE => super_.super_.super_.super_,
    }
);

clk_vtable!(SecondaryVtable, ClkDomain35Secondary, TYPE_35_SECONDARY,
    interfaces: &SECONDARY_IFACES,
    levels: {
        TYPE_3X_PROG => super_,
        TYPE_3X => super_.super_,
        TYPE_CLK_DOMAIN => super_.super_.super_,
        BoardObjType::BASE => super_.super_.super_.super_,
    }
);

static FIXED_VTABLE: FixedVtable = FixedVtable;
static PRIMARY_VTABLE: PrimaryVtable = PrimaryVtable;
static SECONDARY_VTABLE: SecondaryVtable = SecondaryVtable;

static VTABLES: [&dyn BoardObjVirtualTable; 3] =
    [&FIXED_VTABLE, &PRIMARY_VTABLE, &SECONDARY_VTABLE];

// ─── Class ──────────────────────────────────────────────────────────

/// Callbacks of the CLK_DOMAIN group.
#[derive(Debug, Default)]
pub struct ClkDomainClass {
    cntr_sample_period_ms: u16,
}

impl ClkDomainClass {
    /// Counter sampling period from the last Set header.
    pub fn cntr_sample_period_ms(&self) -> u16 {
        self.cntr_sample_period_ms
    }
}

impl BoardObjGrpClass for ClkDomainClass {
    fn class_id(&self) -> ClassId {
        CLASS_ID
    }

    fn tier(&self) -> GroupTier {
        GroupTier::E32
    }

    fn vtables(&self) -> &'static [&'static dyn BoardObjVirtualTable] {
        &VTABLES
    }

    fn header_construct(
        &mut self,
        _grp: &BoardObjGrp,
        ext: &mut WireReader<'_>,
    ) -> BoardObjResult<()> {
        self.cntr_sample_period_ms = ext.read_u16()?;
        debug!(period_ms = self.cntr_sample_period_ms, "clk domain header");
        Ok(())
    }

    fn obj_size(&self, obj_type: BoardObjType) -> BoardObjResult<usize> {
        match obj_type {
            TYPE_3X_FIXED => Ok(size_of::<ClkDomain3xFixed>()),
            TYPE_35_PRIMARY => Ok(size_of::<ClkDomain35Primary>()),
            TYPE_35_SECONDARY => Ok(size_of::<ClkDomain35Secondary>()),
            _ => Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type,
            }),
        }
    }

    fn obj_alloc(&self, base: BoardObjBase) -> BoardObjResult<Box<dyn BoardObject>> {
        match base.obj_type() {
            TYPE_3X_FIXED => Ok(Box::new(ClkDomain3xFixed::new(base))),
            TYPE_35_PRIMARY => Ok(Box::new(ClkDomain35Primary::new(base))),
            TYPE_35_SECONDARY => Ok(Box::new(ClkDomain35Secondary::new(base))),
            obj_type => Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type,
            }),
        }
    }

    fn obj_set(&self, obj: &mut dyn BoardObject, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        match obj.obj_type() {
            TYPE_3X_FIXED => concrete_mut::<ClkDomain3xFixed>(obj)?.set(r),
            TYPE_35_PRIMARY => concrete_mut::<ClkDomain35Primary>(obj)?.set(r),
            TYPE_35_SECONDARY => concrete_mut::<ClkDomain35Secondary>(obj)?.set(r),
            obj_type => Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type,
            }),
        }
    }

    fn obj_export(&self, obj: &dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        match obj.obj_type() {
            TYPE_3X_FIXED => concrete::<ClkDomain3xFixed>(obj)?.export(w),
            TYPE_35_PRIMARY => concrete::<ClkDomain35Primary>(obj)?.export(w),
            TYPE_35_SECONDARY => concrete::<ClkDomain35Secondary>(obj)?.export(w),
            obj_type => Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type,
            }),
        }
    }

    fn obj_query(&self, obj: &mut dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        if obj.obj_type() == TYPE_3X_FIXED {
            let fixed = concrete_mut::<ClkDomain3xFixed>(obj)?;
            fixed.super_.super_.freq_khz = u32::from(fixed.freq_mhz) * 1000;
        }
        if !obj.as_any().is::<ClkDomain3xFixed>()
            && !obj.as_any().is::<ClkDomain35Primary>()
            && !obj.as_any().is::<ClkDomain35Secondary>()
        {
            return Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type: obj.obj_type(),
            });
        }
        // SAFETY: every concrete type above is `#[repr(C)]` with a
        // `ClkDomain` prefix.
        let domain: &ClkDomain = unsafe { unchecked_cast(&*obj) };
        w.write_u32(domain.freq_khz)
    }
}
