//! Virtual tables and their registry.
//!
//! One virtual table exists per concrete object type. It answers two
//! questions about an object of that type: "what is your level tagged `R`?"
//! (dynamic cast) and "do you embed the interface tagged `I`?" (capability
//! lookup). Tables are `'static`, immutable and registered once at startup.

use std::any::Any;
use std::collections::HashMap;

use boardobj::ids::{BoardObjType, ClassId};

use crate::iface::{BoardObjIfaceRef, InterfaceVirtualTable};
use crate::obj::BoardObject;

/// Per-concrete-type dispatch table.
pub trait BoardObjVirtualTable: Sync {
    /// Class this table belongs to.
    fn class_id(&self) -> ClassId;

    /// Concrete type this table describes.
    fn obj_type(&self) -> BoardObjType;

    /// Level of `obj` tagged `requested`, or `None` if it is not on the path.
    ///
    /// `obj` is always of this table's concrete type when called through
    /// the registry; implementations still downcast and return `None` on a
    /// mismatch.
    fn dynamic_cast<'a>(&self, obj: &'a dyn BoardObject, requested: BoardObjType)
    -> Option<&'a dyn Any>;

    /// Mutable form of [`dynamic_cast`](Self::dynamic_cast).
    fn dynamic_cast_mut<'a>(
        &self,
        obj: &'a mut dyn BoardObject,
        requested: BoardObjType,
    ) -> Option<&'a mut dyn Any>;

    /// Interfaces embedded by this concrete type.
    fn interfaces(&self) -> &'static [&'static InterfaceVirtualTable] {
        &[]
    }

    /// Capability lookup.
    fn iface_lookup<'a>(
        &self,
        obj: &'a dyn BoardObject,
        iface_type: BoardObjType,
    ) -> Option<BoardObjIfaceRef<'a>> {
        if obj.obj_type() != self.obj_type() || obj.class_id() != self.class_id() {
            return None;
        }
        let vtable = self
            .interfaces()
            .iter()
            .find(|t| t.iface_type() == iface_type)?;
        // SAFETY: `vtable` is listed by the table of `obj`'s concrete type.
        Some(unsafe { BoardObjIfaceRef::new(obj, vtable) })
    }
}

/// Registry of virtual tables keyed by `(class, concrete type)`.
///
/// Constructed at startup and passed by reference. No global state.
pub struct VtableRegistry {
    tables: HashMap<(ClassId, BoardObjType), &'static dyn BoardObjVirtualTable>,
}

impl VtableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Register a table.
    ///
    /// # Panics
    /// Panics if a table for the same class and type is already registered.
    pub fn register(&mut self, table: &'static dyn BoardObjVirtualTable) {
        let key = (table.class_id(), table.obj_type());
        if self.tables.contains_key(&key) {
            panic!("Virtual table for {} {} is already registered", key.0, key.1);
        }
        self.tables.insert(key, table);
    }

    /// Look up the table of a concrete type.
    pub fn get(
        &self,
        class: ClassId,
        obj_type: BoardObjType,
    ) -> Option<&'static dyn BoardObjVirtualTable> {
        self.tables.get(&(class, obj_type)).copied()
    }

    /// Capability lookup through the object's own table.
    pub fn iface_lookup<'a>(
        &self,
        obj: &'a dyn BoardObject,
        iface_type: BoardObjType,
    ) -> Option<BoardObjIfaceRef<'a>> {
        self.get(obj.class_id(), obj.obj_type())?
            .iface_lookup(obj, iface_type)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for VtableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
