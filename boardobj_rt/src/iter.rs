//! Traversal of a group's live objects with checked casts.
//!
//! Iteration is always in ascending slot order and only visits occupied
//! slots, optionally narrowed by a caller-supplied mask. Each step yields
//! the slot index together with the cast result; the consumer decides
//! whether a failed cast ends the walk.

use std::any::Any;
use std::marker::PhantomData;

use boardobj::error::{BoardObjError, BoardObjResult, CastError};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::mask::{BoardObjMask, SetBits};

use crate::grp::BoardObjGrp;
use crate::obj::checked_cast;
use crate::vtable::VtableRegistry;

/// Lazy walk over a group yielding `(slot, Result<&T, CastError>)`.
pub struct BoardObjIter<'a, T> {
    grp: &'a BoardObjGrp,
    vtables: &'a VtableRegistry,
    class: ClassId,
    requested: BoardObjType,
    filter: Option<&'a BoardObjMask>,
    occupied: SetBits<'a>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Any> BoardObjIter<'a, T> {
    /// Walk `grp`, casting every visited object to the level tagged `requested`.
    pub fn new(
        grp: &'a BoardObjGrp,
        vtables: &'a VtableRegistry,
        class: ClassId,
        requested: BoardObjType,
        filter: Option<&'a BoardObjMask>,
    ) -> Self {
        Self {
            grp,
            vtables,
            class,
            requested,
            filter,
            occupied: grp.mask().iter(),
            _marker: PhantomData,
        }
    }
}

impl<'a, T: Any> Iterator for BoardObjIter<'a, T> {
    type Item = (u16, Result<&'a T, CastError>);

    fn next(&mut self) -> Option<Self::Item> {
        for idx in self.occupied.by_ref() {
            if self.filter.is_some_and(|m| !m.get(idx)) {
                continue;
            }
            if let Some(obj) = self.grp.get(idx) {
                let cast = checked_cast(self.grp, self.vtables, obj, self.class, self.requested);
                return Some((idx, cast));
            }
        }
        None
    }
}

/// Run `body` on every visited object, stopping at the first failure.
///
/// A failed cast stops the walk with `BoardObjError::Cast`; an error from
/// `body` stops it with that error.
pub fn try_for_each_cast<T, F>(
    grp: &BoardObjGrp,
    vtables: &VtableRegistry,
    class: ClassId,
    requested: BoardObjType,
    filter: Option<&BoardObjMask>,
    mut body: F,
) -> BoardObjResult<()>
where
    T: Any,
    F: FnMut(u16, &T) -> BoardObjResult<()>,
{
    for (idx, cast) in BoardObjIter::<T>::new(grp, vtables, class, requested, filter) {
        body(idx, cast?)?;
    }
    Ok(())
}

/// Mutable form of [`try_for_each_cast`].
pub fn for_each_cast_mut<T, F>(
    grp: &mut BoardObjGrp,
    vtables: &VtableRegistry,
    class: ClassId,
    requested: BoardObjType,
    filter: Option<&BoardObjMask>,
    mut body: F,
) -> BoardObjResult<()>
where
    T: Any,
    F: FnMut(u16, &mut T) -> BoardObjResult<()>,
{
    let occupied = grp.mask().clone();
    for idx in occupied.iter() {
        if filter.is_some_and(|m| !m.get(idx)) {
            continue;
        }
        if let Some(cast) = grp.cast_mut::<T>(vtables, idx, class, requested) {
            body(idx, cast.map_err(BoardObjError::Cast)?)?;
        }
    }
    Ok(())
}
