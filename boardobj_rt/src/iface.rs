//! Interfaces: capability blocks embedded inside board objects.
//!
//! An interface is a `#[repr(C)]` struct whose first field is a
//! [`BoardObjInterface`]. It is embedded inline at a fixed byte offset of
//! its owning object. The offset is recorded once per concrete type in a
//! static [`InterfaceVirtualTable`], so interface instances carry no
//! back-pointer of their own.
//!
//! Capability lookup goes through the owner's virtual table and yields a
//! [`BoardObjIfaceRef`], which can reach both the interface and, by
//! subtracting the offset, the owning object's base.

use std::marker::PhantomData;

use boardobj::ids::BoardObjType;

use crate::obj::{BoardObjBase, BoardObject};

/// Per-concrete-type description of one embedded interface.
#[derive(Debug)]
pub struct InterfaceVirtualTable {
    iface_type: BoardObjType,
    offset: usize,
}

impl InterfaceVirtualTable {
    /// Describe an interface tagged `iface_type` embedded at `offset`.
    ///
    /// # Safety
    /// `offset` must be the byte offset (as given by `core::mem::offset_of!`)
    /// of a [`BoardObjInterface`]-led interface inside a `#[repr(C)]` object
    /// whose leading `super_` chain ends in [`BoardObjBase`], and the table
    /// may only be listed by that object type's virtual table.
    pub const unsafe fn new(iface_type: BoardObjType, offset: usize) -> Self {
        Self { iface_type, offset }
    }

    #[inline]
    pub const fn iface_type(&self) -> BoardObjType {
        self.iface_type
    }

    /// Byte offset of the interface from the start of its owner.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Header embedded at the start of every interface.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct BoardObjInterface {
    vtable: &'static InterfaceVirtualTable,
}

impl BoardObjInterface {
    pub const fn new(vtable: &'static InterfaceVirtualTable) -> Self {
        Self { vtable }
    }

    #[inline]
    pub fn vtable(&self) -> &'static InterfaceVirtualTable {
        self.vtable
    }

    #[inline]
    pub fn iface_type(&self) -> BoardObjType {
        self.vtable.iface_type
    }
}

/// An interface type that can be reached through [`BoardObjIfaceRef::cast`].
///
/// # Safety
/// `Self` must be `#[repr(C)]` with a [`BoardObjInterface`] as first field,
/// and every object embedding it must describe it with an
/// [`InterfaceVirtualTable`] tagged [`Self::IFACE_TYPE`].
pub unsafe trait BoardObjIface: Sized + 'static {
    const IFACE_TYPE: BoardObjType;
}

/// Handle to an interface found by capability lookup.
#[derive(Clone, Copy)]
pub struct BoardObjIfaceRef<'a> {
    /// Start of the owning object; carries provenance over all of it.
    owner: *const u8,
    vtable: &'static InterfaceVirtualTable,
    _marker: PhantomData<&'a dyn BoardObject>,
}

impl<'a> BoardObjIfaceRef<'a> {
    /// Locate the interface described by `vtable` inside `obj`.
    ///
    /// # Safety
    /// `vtable` must be one listed by the virtual table of `obj`'s concrete type.
    pub(crate) unsafe fn new(obj: &'a dyn BoardObject, vtable: &'static InterfaceVirtualTable) -> Self {
        Self {
            owner: obj as *const dyn BoardObject as *const u8,
            vtable,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn iface_type(&self) -> BoardObjType {
        self.vtable.iface_type
    }

    /// The embedded interface header.
    pub fn interface(&self) -> &'a BoardObjInterface {
        // SAFETY: the vtable offset addresses a `BoardObjInterface` inside
        // the owner, and `owner` is derived from a reference to the whole
        // object that lives for `'a`.
        unsafe { &*(self.owner.add(self.vtable.offset) as *const BoardObjInterface) }
    }

    /// Navigate from the interface back to its owner's base.
    pub fn object(&self) -> &'a BoardObjBase {
        let iface = self.interface() as *const BoardObjInterface as *const u8;
        // SAFETY: `iface` lies `offset` bytes into the owner and the owner
        // starts with its `BoardObjBase`.
        unsafe { &*(iface.sub(self.interface().vtable().offset) as *const BoardObjBase) }
    }

    /// Typed access, checked against the interface tag.
    pub fn cast<I: BoardObjIface>(&self) -> Option<&'a I> {
        if self.vtable.iface_type != I::IFACE_TYPE {
            return None;
        }
        // SAFETY: `I` starts with the `BoardObjInterface` found at this
        // offset, per the `BoardObjIface` contract.
        Some(unsafe { &*(self.owner.add(self.vtable.offset) as *const I) })
    }
}

impl std::fmt::Debug for BoardObjIfaceRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardObjIfaceRef")
            .field("iface_type", &self.vtable.iface_type)
            .field("offset", &self.vtable.offset)
            .finish()
    }
}
