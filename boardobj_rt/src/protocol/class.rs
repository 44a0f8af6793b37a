//! Per-class callbacks driven by the protocol engines.

use boardobj::error::BoardObjResult;
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::tier::GroupTier;
use boardobj::wire::{WireReader, WireWriter};

use crate::grp::BoardObjGrp;
use crate::obj::{BoardObjBase, BoardObject};
use crate::vtable::BoardObjVirtualTable;

/// Behaviour of one object class.
///
/// The engines own all generic work: header validation, mask semantics,
/// identity checks, slot bookkeeping and transfers. A class only decodes and
/// encodes its own fields.
///
/// Entry callbacks receive a reader or writer positioned just past the
/// entry header and bounded by the entry size.
pub trait BoardObjGrpClass: Send {
    /// Class identifier carried in every header and object.
    fn class_id(&self) -> ClassId;

    /// Capacity tier of the class's group.
    fn tier(&self) -> GroupTier;

    /// Virtual tables of every concrete type in the class.
    fn vtables(&self) -> &'static [&'static dyn BoardObjVirtualTable];

    /// Consume the class-specific header fields of a Set.
    fn header_construct(
        &mut self,
        _grp: &BoardObjGrp,
        _ext: &mut WireReader<'_>,
    ) -> BoardObjResult<()> {
        Ok(())
    }

    /// Whether GetStatus calls [`header_query`](Self::header_query).
    fn has_header_query(&self) -> bool {
        false
    }

    /// Fill the class-specific header fields of a GetStatus reply.
    fn header_query(
        &mut self,
        _grp: &BoardObjGrp,
        _ext: &mut WireWriter<'_>,
    ) -> BoardObjResult<()> {
        Ok(())
    }

    /// Bytes of object memory a concrete type needs.
    ///
    /// # Errors
    /// `UnknownType` for types the class cannot instantiate.
    fn obj_size(&self, obj_type: BoardObjType) -> BoardObjResult<usize>;

    /// Allocate an object with the given identity and default fields.
    fn obj_alloc(&self, base: BoardObjBase) -> BoardObjResult<Box<dyn BoardObject>>;

    /// Apply configuration fields from an entry.
    fn obj_set(&self, obj: &mut dyn BoardObject, fields: &mut WireReader<'_>)
    -> BoardObjResult<()>;

    /// Encode the object's current configuration fields exactly as
    /// [`obj_set`](Self::obj_set) would read them.
    fn obj_export(&self, obj: &dyn BoardObject, fields: &mut WireWriter<'_>)
    -> BoardObjResult<()>;

    /// Encode status fields for a GetStatus reply.
    fn obj_query(&self, obj: &mut dyn BoardObject, fields: &mut WireWriter<'_>)
    -> BoardObjResult<()>;
}
