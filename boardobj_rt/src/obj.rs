//! Board object identity and casts.
//!
//! Every board object starts with a [`BoardObjBase`]. Class hierarchies are
//! built by composition: each level is a `#[repr(C)]` struct whose first
//! field, `super_`, is its parent level, so the base always sits at offset 0
//! and every ancestor is a prefix of its descendants.
//!
//! Two kinds of downcast exist and they are deliberately separate:
//!
//! - [`unchecked_cast`] / [`unchecked_cast_mut`] reinterpret the object as a
//!   prefix type with no runtime check. The caller must know the concrete
//!   type statically.
//! - [`checked_cast`] / [`checked_cast_any`] verify the class against the
//!   requested class and the owning group, then ask the concrete type's
//!   virtual table whether the requested type lies on its path.

use std::any::Any;

use boardobj::error::{CastError, CastFailure};
use boardobj::ids::{BoardObjType, ClassId};

use crate::grp::BoardObjGrp;
use crate::vtable::VtableRegistry;

/// Identity shared by every board object.
///
/// Fields are fixed when the object is allocated and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BoardObjBase {
    class_id: ClassId,
    obj_type: BoardObjType,
    grp_idx: u16,
}

impl BoardObjBase {
    pub const fn new(class_id: ClassId, obj_type: BoardObjType, grp_idx: u16) -> Self {
        Self {
            class_id,
            obj_type,
            grp_idx,
        }
    }

    #[inline]
    pub const fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Concrete type tag.
    #[inline]
    pub const fn obj_type(&self) -> BoardObjType {
        self.obj_type
    }

    /// Slot index inside the owning group.
    #[inline]
    pub const fn grp_idx(&self) -> u16 {
        self.grp_idx
    }
}

/// A live board object owned by a group.
///
/// Implement with [`impl_board_object!`](crate::impl_board_object).
pub trait BoardObject: Any + 'static {
    /// Identity block.
    fn base(&self) -> &BoardObjBase;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    #[inline]
    fn class_id(&self) -> ClassId {
        self.base().class_id()
    }

    #[inline]
    fn obj_type(&self) -> BoardObjType {
        self.base().obj_type()
    }

    #[inline]
    fn grp_idx(&self) -> u16 {
        self.base().grp_idx()
    }
}

impl std::fmt::Debug for dyn BoardObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardObject")
            .field("class_id", &self.class_id())
            .field("obj_type", &self.obj_type())
            .field("grp_idx", &self.grp_idx())
            .finish()
    }
}

/// Implement [`BoardObject`] for a concrete type given the field path to its base.
///
/// ```ignore
/// impl_board_object!(ClkDomain3xFixed, super_.super_.super_);
/// ```
#[macro_export]
macro_rules! impl_board_object {
    ($ty:ty, $($field:ident).+) => {
        impl $crate::obj::BoardObject for $ty {
            #[inline]
            fn base(&self) -> &$crate::obj::BoardObjBase {
                &self.$($field).+
            }

            #[inline]
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }
    };
}

// ─── Unchecked casts ────────────────────────────────────────────────

/// Reinterpret `obj` as `T` without any check.
///
/// # Safety
/// The concrete type of `obj` must be `T`, or a `#[repr(C)]` type that
/// contains `T` as its leading `super_` chain.
#[inline]
pub unsafe fn unchecked_cast<T: Any>(obj: &dyn BoardObject) -> &T {
    // SAFETY: upheld by the caller; `T` is a layout prefix of the object.
    unsafe { &*(obj as *const dyn BoardObject as *const T) }
}

/// Mutable form of [`unchecked_cast`].
///
/// # Safety
/// Same contract as [`unchecked_cast`].
#[inline]
pub unsafe fn unchecked_cast_mut<T: Any>(obj: &mut dyn BoardObject) -> &mut T {
    // SAFETY: upheld by the caller; `T` is a layout prefix of the object.
    unsafe { &mut *(obj as *mut dyn BoardObject as *mut T) }
}

// ─── Checked casts ──────────────────────────────────────────────────

fn cast_error(obj: &dyn BoardObject, requested: BoardObjType, failure: CastFailure) -> CastError {
    CastError {
        index: obj.grp_idx(),
        actual: obj.obj_type(),
        requested,
        failure,
    }
}

/// Class checks shared by every checked cast.
pub(crate) fn check_class(
    grp_class: Option<ClassId>,
    obj: &dyn BoardObject,
    class: ClassId,
    requested: BoardObjType,
) -> Result<(), CastError> {
    if obj.class_id() != class {
        return Err(cast_error(
            obj,
            requested,
            CastFailure::ClassMismatch {
                requested: class,
                actual: obj.class_id(),
            },
        ));
    }
    if grp_class != Some(obj.class_id()) {
        return Err(cast_error(
            obj,
            requested,
            CastFailure::ForeignGroup {
                group: grp_class,
                actual: obj.class_id(),
            },
        ));
    }
    Ok(())
}

/// Checked cast to the level tagged `requested`, as an untyped reference.
///
/// # Errors
/// A [`CastError`] describing the first failed check.
pub fn checked_cast_any<'a>(
    grp: &BoardObjGrp,
    vtables: &VtableRegistry,
    obj: &'a dyn BoardObject,
    class: ClassId,
    requested: BoardObjType,
) -> Result<&'a dyn Any, CastError> {
    check_class(grp.class_id(), obj, class, requested)?;
    let vtable = vtables
        .get(obj.class_id(), obj.obj_type())
        .ok_or_else(|| cast_error(obj, requested, CastFailure::NoVirtualTable))?;
    vtable
        .dynamic_cast(obj, requested)
        .ok_or_else(|| cast_error(obj, requested, CastFailure::NotOnPath))
}

/// Checked cast to the level tagged `requested`, typed as `T`.
///
/// # Errors
/// As [`checked_cast_any`], plus `RepresentationMismatch` when the level
/// exists but is not a `T`.
pub fn checked_cast<'a, T: Any>(
    grp: &BoardObjGrp,
    vtables: &VtableRegistry,
    obj: &'a dyn BoardObject,
    class: ClassId,
    requested: BoardObjType,
) -> Result<&'a T, CastError> {
    let any = checked_cast_any(grp, vtables, obj, class, requested)?;
    any.downcast_ref::<T>()
        .ok_or_else(|| cast_error(obj, requested, CastFailure::RepresentationMismatch))
}

/// Mutable checked cast of an object already detached from its group borrow.
///
/// `grp_class` is the class of the group the object lives in.
pub(crate) fn checked_cast_mut<'a, T: Any>(
    grp_class: Option<ClassId>,
    vtables: &VtableRegistry,
    obj: &'a mut dyn BoardObject,
    class: ClassId,
    requested: BoardObjType,
) -> Result<&'a mut T, CastError> {
    check_class(grp_class, obj, class, requested)?;
    let (index, actual) = (obj.grp_idx(), obj.obj_type());
    let err = |failure| CastError {
        index,
        actual,
        requested,
        failure,
    };
    let vtable = vtables
        .get(obj.class_id(), actual)
        .ok_or(err(CastFailure::NoVirtualTable))?;
    vtable
        .dynamic_cast_mut(obj, requested)
        .ok_or(err(CastFailure::NotOnPath))?
        .downcast_mut::<T>()
        .ok_or(err(CastFailure::RepresentationMismatch))
}
