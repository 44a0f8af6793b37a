//! Prelude module for common re-exports.
//!
//! ```rust
//! use boardobj_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, OverwritePolicy, SharedConfig};

// ─── Identity ───────────────────────────────────────────────────────
pub use crate::ids::{BoardObjType, ClassId};
pub use crate::mask::BoardObjMask;
pub use crate::tier::GroupTier;

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{
    BoardObjError, BoardObjResult, CastError, CastFailure, ErrorKind, status_of,
};

// ─── Wire ───────────────────────────────────────────────────────────
pub use crate::consts::{ENTRY_HEADER_SIZE, GRP_HEADER_FIXED_SIZE, MAX_OBJ_SLOTS};
pub use crate::wire::{
    BoardObjGrpHeader, EntryHeader, GrpFlags, SetType, WireReader, WireWriter,
};
