//! Error taxonomy for BOARDOBJ operations.
//!
//! Every [`BoardObjError`] variant belongs to exactly one [`ErrorKind`]; the
//! kind's discriminant is the status code returned to the host driver in
//! the command reply. [`CastError`] is kept apart because checked casts
//! report failure as a value, not as a propagated error.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ids::{BoardObjType, ClassId};

/// Status category, discriminant = reply status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ErrorKind {
    /// Null/invalid parameter, identity mismatch on update.
    Argument = 0x01,
    /// Malformed or mismatched header, unsupported tier, group not constructed.
    State = 0x02,
    /// Capacity or buffer size exceeded.
    Range = 0x03,
    /// Surface copy failed.
    Transfer = 0x04,
    /// Checked downcast target not reachable.
    Cast = 0x05,
    /// No memory for a new object.
    Allocation = 0x06,
    /// No handler registered for class/command.
    NotSupported = 0x07,
}

impl ErrorKind {
    /// Status code reported for success.
    pub const OK_STATUS: u8 = 0x00;

    /// Reply status code.
    #[inline]
    pub const fn status(self) -> u8 {
        self as u8
    }
}

/// Why a checked cast failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastFailure {
    /// Object class differs from the requested class.
    ClassMismatch { requested: ClassId, actual: ClassId },
    /// Object class differs from the class of the group holding it.
    ForeignGroup { group: Option<ClassId>, actual: ClassId },
    /// No virtual table registered for the object's concrete type.
    NoVirtualTable,
    /// Requested type is not on the concrete type's path.
    NotOnPath,
    /// Requested tag resolved, but to a different Rust type than asked for.
    RepresentationMismatch,
}

/// Checked downcast failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastError {
    /// Slot index of the object that failed to cast.
    pub index: u16,
    /// Concrete type of that object.
    pub actual: BoardObjType,
    /// Type tag that was requested.
    pub requested: BoardObjType,
    /// Failure reason.
    pub failure: CastFailure,
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot cast object {} ({}) to {}: {:?}",
            self.index, self.actual, self.requested, self.failure
        )
    }
}

impl std::error::Error for CastError {}

/// Errors returned by group construction, query, dispatch and sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardObjError {
    // ─── Argument ───────────────────────────────────────────────────
    /// Generic invalid parameter.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong.
        reason: &'static str,
    },

    /// Incoming entry type differs from the live object's type. **Fatal.**
    #[error("Object {index}: incoming {incoming} does not match existing {existing}")]
    IdentityMismatch {
        /// Slot index.
        index: u16,
        /// Type of the live object.
        existing: BoardObjType,
        /// Type carried by the entry.
        incoming: BoardObjType,
    },

    /// Incoming entry slot index differs from the live object's index.
    #[error("Slot index mismatch: expected {expected}, entry carries {actual}")]
    IndexMismatch {
        /// Index of the slot being processed.
        expected: u16,
        /// Index carried by the entry or object.
        actual: u16,
    },

    /// Entry names a type the class does not implement.
    #[error("Unknown object type: {obj_type} in {class}")]
    UnknownType {
        /// Owning class.
        class: ClassId,
        /// Offending type.
        obj_type: BoardObjType,
    },

    /// UPDATE attempted to change fields under the reject policy.
    #[error("Object {index}: overwrite of configured fields rejected")]
    OverwriteRejected {
        /// Slot index.
        index: u16,
    },

    /// Source kind not recognized or not enabled.
    #[error("Unsupported group source kind {kind:#04x}")]
    UnsupportedSource {
        /// Raw source kind.
        kind: u8,
    },

    // ─── State ──────────────────────────────────────────────────────
    /// Header field differs from the constructed group.
    #[error("Header mismatch on {field}: expected {expected}, got {actual}")]
    HeaderMismatch {
        /// Field name.
        field: &'static str,
        /// Value held by the group.
        expected: u32,
        /// Value carried by the header.
        actual: u32,
    },

    /// Incoming mask violates the declared set semantics.
    #[error("Mask mismatch: {reason}")]
    MaskMismatch {
        /// Which rule was violated.
        reason: &'static str,
    },

    /// Header is structurally invalid.
    #[error("Malformed header: {reason}")]
    MalformedHeader {
        /// What was wrong.
        reason: &'static str,
    },

    /// Unknown or disabled capacity tier.
    #[error("Unsupported group tier {raw:#04x}")]
    UnsupportedTier {
        /// Raw wire group type.
        raw: u8,
    },

    /// Group used before its first successful construction.
    #[error("Group {class} has not been constructed")]
    NotConstructed {
        /// Group class.
        class: ClassId,
    },

    /// Runtime halted after a fatal identity mismatch.
    #[error("Runtime halted after fatal error")]
    Halted,

    // ─── Range ──────────────────────────────────────────────────────
    /// Requested slots exceed a capacity.
    #[error("Capacity exceeded: {requested} > {capacity}")]
    CapacityExceeded {
        /// Requested count or index.
        requested: usize,
        /// Available capacity.
        capacity: usize,
    },

    /// Buffer too small for a header, entry or bulk region.
    #[error("Buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        required: usize,
        /// Bytes available.
        available: usize,
    },

    // ─── Transfer ───────────────────────────────────────────────────
    /// Surface copy failed.
    #[error("Transfer of {size} bytes at {offset:#x} failed: {reason}")]
    Transfer {
        /// Surface offset.
        offset: usize,
        /// Transfer size.
        size: usize,
        /// Underlying surface error.
        reason: String,
    },

    // ─── Cast ───────────────────────────────────────────────────────
    /// Checked cast failed inside a status-threading loop.
    #[error("{0}")]
    Cast(#[from] CastError),

    // ─── Allocation ─────────────────────────────────────────────────
    /// Allocator budget exhausted.
    #[error("Out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Bytes left in the budget.
        available: usize,
    },

    // ─── NotSupported ───────────────────────────────────────────────
    /// No handler registered for class/command.
    #[error("No handler for {class}, command {cmd:#04x}")]
    NotSupported {
        /// Requested class.
        class: ClassId,
        /// Raw command id.
        cmd: u8,
    },
}

impl BoardObjError {
    /// Wrap a surface failure.
    pub fn transfer(offset: usize, size: usize, reason: impl fmt::Display) -> Self {
        Self::Transfer {
            offset,
            size,
            reason: reason.to_string(),
        }
    }

    /// Taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. }
            | Self::IdentityMismatch { .. }
            | Self::IndexMismatch { .. }
            | Self::UnknownType { .. }
            | Self::OverwriteRejected { .. }
            | Self::UnsupportedSource { .. } => ErrorKind::Argument,
            Self::HeaderMismatch { .. }
            | Self::MaskMismatch { .. }
            | Self::MalformedHeader { .. }
            | Self::UnsupportedTier { .. }
            | Self::NotConstructed { .. }
            | Self::Halted => ErrorKind::State,
            Self::CapacityExceeded { .. } | Self::BufferTooSmall { .. } => ErrorKind::Range,
            Self::Transfer { .. } => ErrorKind::Transfer,
            Self::Cast(_) => ErrorKind::Cast,
            Self::OutOfMemory { .. } => ErrorKind::Allocation,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
        }
    }

    /// True for errors after which the runtime must stop serving commands.
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::IdentityMismatch { .. })
    }

    /// Reply status code.
    #[inline]
    pub const fn status(&self) -> u8 {
        self.kind().status()
    }
}

/// Result type for BOARDOBJ operations.
pub type BoardObjResult<T> = Result<T, BoardObjError>;

/// Reply status code for a command outcome.
pub fn status_of<T>(result: &BoardObjResult<T>) -> u8 {
    match result {
        Ok(_) => ErrorKind::OK_STATUS,
        Err(e) => e.status(),
    }
}
