//! Command dispatch table.
//!
//! Maps `(class, command)` to a handler plus the surface location of the
//! class's group data and the transfer mode used for it.

use std::collections::HashMap;

use boardobj::error::BoardObjResult;
use boardobj::ids::ClassId;
use boardobj_surface::Surface;

use crate::protocol::{
    BoardObjGrpLocation, GrpEnv, grp_get_status, grp_get_status_auto, grp_set, grp_set_auto,
};

/// Group command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoardObjGrpCmd {
    /// Construct or update a group.
    Set = 0x00,
    /// Report group status.
    GetStatus = 0x01,
}

impl BoardObjGrpCmd {
    /// Convert from raw `u8`. Returns `None` for out-of-range ids.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Set),
            0x01 => Some(Self::GetStatus),
            _ => None,
        }
    }
}

/// How a command moves its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// One surface transfer per header and per entry.
    PerEntry,
    /// One transfer of the whole region into scratch, entries addressed in place.
    Bulk,
}

/// Transfer side of a command context.
pub enum GrpTransfer<'a> {
    PerEntry {
        surface: &'a mut dyn Surface,
        location: BoardObjGrpLocation,
        scratch: &'a mut [u8],
    },
    Bulk {
        /// Resident copy of the header and `obj_slots` entries.
        region: &'a mut [u8],
        location: BoardObjGrpLocation,
    },
}

/// Everything a handler runs on.
pub struct GrpCmdCtx<'a> {
    pub env: GrpEnv<'a>,
    pub transfer: GrpTransfer<'a>,
}

/// Command handler.
pub type GrpCmdHandler = fn(&mut GrpCmdCtx<'_>) -> BoardObjResult<()>;

/// One dispatch table row.
#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    pub handler: GrpCmdHandler,
    pub location: BoardObjGrpLocation,
    pub mode: TransferMode,
}

impl DispatchEntry {
    /// Row running the default handler of `cmd`.
    pub fn new(cmd: BoardObjGrpCmd, location: BoardObjGrpLocation, mode: TransferMode) -> Self {
        let handler: GrpCmdHandler = match cmd {
            BoardObjGrpCmd::Set => cmd_set,
            BoardObjGrpCmd::GetStatus => cmd_get_status,
        };
        Self {
            handler,
            location,
            mode,
        }
    }
}

/// Default Set handler.
pub fn cmd_set(ctx: &mut GrpCmdCtx<'_>) -> BoardObjResult<()> {
    match &mut ctx.transfer {
        GrpTransfer::PerEntry {
            surface,
            location,
            scratch,
        } => grp_set(&mut ctx.env, &mut **surface, location, scratch),
        GrpTransfer::Bulk { region, location } => grp_set_auto(
            &mut ctx.env,
            region,
            location.header_size,
            location.entry_size,
        ),
    }
}

/// Default GetStatus handler.
pub fn cmd_get_status(ctx: &mut GrpCmdCtx<'_>) -> BoardObjResult<()> {
    match &mut ctx.transfer {
        GrpTransfer::PerEntry {
            surface,
            location,
            scratch,
        } => grp_get_status(&mut ctx.env, &mut **surface, location, scratch),
        GrpTransfer::Bulk { region, location } => grp_get_status_auto(
            &mut ctx.env,
            region,
            location.header_size,
            location.entry_size,
        ),
    }
}

/// `(class, command)` → [`DispatchEntry`].
pub struct DispatchTable {
    entries: HashMap<(ClassId, BoardObjGrpCmd), DispatchEntry>,
}

impl DispatchTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a row.
    ///
    /// # Panics
    /// Panics if the class/command pair is already registered.
    pub fn register(&mut self, class: ClassId, cmd: BoardObjGrpCmd, entry: DispatchEntry) {
        if self.entries.contains_key(&(class, cmd)) {
            panic!("Command {cmd:?} for {class} is already registered");
        }
        self.entries.insert((class, cmd), entry);
    }

    pub fn get(&self, class: ClassId, cmd: BoardObjGrpCmd) -> Option<&DispatchEntry> {
        self.entries.get(&(class, cmd))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
