//! The runtime: registries, groups and command entry points.
//!
//! [`Runtime`] is the single owner of every group and is passed by
//! reference to whatever drives it. It holds:
//!
//! - the virtual table registry,
//! - one group per registered class, with that class's callbacks,
//! - the dispatch table,
//! - the scratch buffer shared by all commands,
//! - the object allocator.
//!
//! A fatal error (an entry whose type differs from the live object in its
//! slot) halts the runtime: the error is logged and every later command
//! fails with `Halted`.

use std::any::Any;
use std::collections::HashMap;

use boardobj::config::OverwritePolicy;
use boardobj::consts::GRP_HEADER_FIXED_SIZE;
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::mask::BoardObjMask;
use boardobj::tier::GroupTier;
use boardobj::wire::GrpHeaderRaw;
use boardobj_surface::Surface;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::alloc::{DmemBudget, ObjAllocator};
use crate::config::RuntimeSettings;
use crate::dispatch::{BoardObjGrpCmd, DispatchEntry, DispatchTable, GrpCmdCtx, GrpTransfer, TransferMode};
use crate::grp::BoardObjGrp;
use crate::iter::BoardObjIter;
use crate::protocol::{BoardObjGrpClass, GrpEnv, grp_construct_from_src};
use crate::source::BoardObjGrpSrc;
use crate::vtable::VtableRegistry;

struct GroupSlot {
    grp: BoardObjGrp,
    class: Box<dyn BoardObjGrpClass>,
}

/// Serializable view of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub class_id: ClassId,
    pub tier: GroupTier,
    pub constructed: bool,
    pub obj_slots: u16,
    /// Occupied slots with their concrete types.
    pub objects: Vec<ObjectSummary>,
}

/// Serializable view of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub grp_idx: u16,
    pub obj_type: BoardObjType,
}

/// BOARDOBJ runtime.
pub struct Runtime {
    vtables: VtableRegistry,
    groups: HashMap<ClassId, GroupSlot>,
    dispatch: DispatchTable,
    scratch: Vec<u8>,
    alloc: DmemBudget,
    policy: OverwritePolicy,
    halted: bool,
}

impl Runtime {
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            vtables: VtableRegistry::new(),
            groups: HashMap::new(),
            dispatch: DispatchTable::new(),
            scratch: vec![0; settings.scratch_size],
            alloc: DmemBudget::new(settings.dmem_budget),
            policy: settings.overwrite_policy,
            halted: false,
        }
    }

    /// Register a class: its virtual tables and an unconstructed group.
    ///
    /// # Errors
    /// `UnsupportedTier` if the class's tier is compiled out.
    ///
    /// # Panics
    /// Panics if the class or one of its virtual tables is already registered.
    pub fn register_class(&mut self, class: Box<dyn BoardObjGrpClass>) -> BoardObjResult<()> {
        let class_id = class.class_id();
        if self.groups.contains_key(&class_id) {
            panic!("{class_id} is already registered");
        }
        let grp = BoardObjGrp::new(class.tier())?;
        for vtable in class.vtables() {
            self.vtables.register(*vtable);
        }
        info!(class = %class_id, tier = %class.tier(), "class registered");
        self.groups.insert(class_id, GroupSlot { grp, class });
        Ok(())
    }

    /// Register a dispatch table row.
    ///
    /// # Panics
    /// Panics if the class/command pair is already registered.
    pub fn register_cmd(&mut self, class: ClassId, cmd: BoardObjGrpCmd, entry: DispatchEntry) {
        self.dispatch.register(class, cmd, entry);
    }

    pub fn vtables(&self) -> &VtableRegistry {
        &self.vtables
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Group of a registered class.
    pub fn group(&self, class: ClassId) -> Option<&BoardObjGrp> {
        self.groups.get(&class).map(|s| &s.grp)
    }

    /// Group of a registered class, for domain logic.
    pub fn group_mut(&mut self, class: ClassId) -> Option<&mut BoardObjGrp> {
        self.groups.get_mut(&class).map(|s| &mut s.grp)
    }

    /// Group and virtual tables together, for mutable casts.
    pub fn group_with_vtables(
        &mut self,
        class: ClassId,
    ) -> Option<(&mut BoardObjGrp, &VtableRegistry)> {
        let slot = self.groups.get_mut(&class)?;
        Some((&mut slot.grp, &self.vtables))
    }

    /// Iterate a class's group with checked casts to `requested`.
    pub fn iter<'a, T: Any>(
        &'a self,
        class: ClassId,
        requested: BoardObjType,
        filter: Option<&'a BoardObjMask>,
    ) -> Option<BoardObjIter<'a, T>> {
        let grp = self.group(class)?;
        Some(BoardObjIter::new(grp, &self.vtables, class, requested, filter))
    }

    /// Allocator state.
    pub fn dmem(&self) -> &DmemBudget {
        &self.alloc
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Summaries of all groups, ordered by class.
    pub fn summaries(&self) -> Vec<GroupSummary> {
        let mut out: Vec<GroupSummary> = self
            .groups
            .iter()
            .map(|(class_id, slot)| GroupSummary {
                class_id: *class_id,
                tier: slot.grp.tier(),
                constructed: slot.grp.is_constructed(),
                obj_slots: slot.grp.obj_slots(),
                objects: slot
                    .grp
                    .mask()
                    .iter()
                    .filter_map(|idx| slot.grp.get(idx))
                    .map(|obj| ObjectSummary {
                        grp_idx: obj.grp_idx(),
                        obj_type: obj.obj_type(),
                    })
                    .collect(),
            })
            .collect();
        out.sort_by_key(|s| s.class_id);
        out
    }

    /// Handle one host command against `surface`.
    ///
    /// # Errors
    /// - `Halted` after a fatal error.
    /// - `NotSupported` for an unknown command id or an unregistered class.
    /// - `BufferTooSmall` if the header or bulk region exceeds the scratch.
    /// - `CapacityExceeded` if the header declares more than `max_slots`.
    /// - Any error of the Set / GetStatus engines.
    pub fn dispatch(
        &mut self,
        surface: &mut dyn Surface,
        class_raw: u8,
        cmd_raw: u8,
    ) -> BoardObjResult<()> {
        let class_id = ClassId(class_raw);
        let result = self.dispatch_inner(surface, class_id, cmd_raw);
        match &result {
            Ok(()) => debug!(class = %class_id, cmd = cmd_raw, "command complete"),
            Err(e) if e.is_fatal() => {
                self.halted = true;
                error!(class = %class_id, cmd = cmd_raw, "FATAL: {e}; runtime halted");
            }
            Err(e) => warn!(class = %class_id, cmd = cmd_raw, status = e.status(), "command failed: {e}"),
        }
        result
    }

    fn dispatch_inner(
        &mut self,
        surface: &mut dyn Surface,
        class_id: ClassId,
        cmd_raw: u8,
    ) -> BoardObjResult<()> {
        if self.halted {
            return Err(BoardObjError::Halted);
        }
        let not_supported = BoardObjError::NotSupported {
            class: class_id,
            cmd: cmd_raw,
        };
        let cmd = BoardObjGrpCmd::from_u8(cmd_raw).ok_or(not_supported.clone())?;
        let entry = *self.dispatch.get(class_id, cmd).ok_or(not_supported.clone())?;
        let slot = self.groups.get_mut(&class_id).ok_or(not_supported)?;
        let loc = entry.location;

        if loc.header_size > self.scratch.len() {
            return Err(BoardObjError::BufferTooSmall {
                required: loc.header_size,
                available: self.scratch.len(),
            });
        }
        let mut fixed = [0u8; GRP_HEADER_FIXED_SIZE];
        surface
            .read(loc.offset, &mut fixed)
            .map_err(|e| BoardObjError::transfer(loc.offset, fixed.len(), e))?;
        let obj_slots = GrpHeaderRaw::decode(&fixed)?.obj_slots;
        if obj_slots > loc.max_slots {
            return Err(BoardObjError::CapacityExceeded {
                requested: obj_slots as usize,
                capacity: loc.max_slots as usize,
            });
        }

        let env = GrpEnv {
            grp: &mut slot.grp,
            class: slot.class.as_mut(),
            alloc: &mut self.alloc,
            policy: self.policy,
        };

        match entry.mode {
            TransferMode::PerEntry => {
                let mut ctx = GrpCmdCtx {
                    env,
                    transfer: GrpTransfer::PerEntry {
                        surface,
                        location: loc,
                        scratch: &mut self.scratch,
                    },
                };
                (entry.handler)(&mut ctx)
            }
            TransferMode::Bulk => {
                let size = loc.region_size(obj_slots);
                if size > self.scratch.len() {
                    return Err(BoardObjError::BufferTooSmall {
                        required: size,
                        available: self.scratch.len(),
                    });
                }
                let region = &mut self.scratch[..size];
                surface
                    .read(loc.offset, region)
                    .map_err(|e| BoardObjError::transfer(loc.offset, size, e))?;

                let result = {
                    let mut ctx = GrpCmdCtx {
                        env,
                        transfer: GrpTransfer::Bulk {
                            region: &mut *region,
                            location: loc,
                        },
                    };
                    (entry.handler)(&mut ctx)
                };
                if cmd == BoardObjGrpCmd::GetStatus {
                    surface
                        .write(loc.offset, region)
                        .map_err(|e| BoardObjError::transfer(loc.offset, size, e))?;
                }
                result
            }
        }
    }

    /// Construct a class's group from a non-RPC source.
    ///
    /// Produces the same group state a wire Set of the same data would.
    ///
    /// # Errors
    /// - `Halted` after a fatal error.
    /// - `UnsupportedSource` for an unknown or disabled source kind.
    /// - `NotSupported` if the source's class is not registered.
    /// - Any error of the Set engine.
    pub fn self_init(&mut self, src: &BoardObjGrpSrc) -> BoardObjResult<()> {
        if self.halted {
            return Err(BoardObjError::Halted);
        }
        let class_id = src.class_id()?;
        let slot = self
            .groups
            .get_mut(&class_id)
            .ok_or(BoardObjError::NotSupported {
                class: class_id,
                cmd: BoardObjGrpCmd::Set as u8,
            })?;
        let mut env = GrpEnv {
            grp: &mut slot.grp,
            class: slot.class.as_mut(),
            alloc: &mut self.alloc,
            policy: self.policy,
        };
        let result = grp_construct_from_src(&mut env, src);
        if let Err(e) = &result {
            if e.is_fatal() {
                self.halted = true;
                error!(class = %class_id, "FATAL: {e}; runtime halted");
            } else {
                warn!(class = %class_id, "self-init failed: {e}");
            }
        }
        result
    }

    /// Register the default Set and GetStatus rows for a class.
    pub fn register_default_cmds(
        &mut self,
        class: ClassId,
        location: crate::protocol::BoardObjGrpLocation,
        mode: TransferMode,
    ) {
        for cmd in [BoardObjGrpCmd::Set, BoardObjGrpCmd::GetStatus] {
            self.register_cmd(class, cmd, DispatchEntry::new(cmd, location, mode));
        }
    }
}
