//! Fixed-capacity sparse object groups.
//!
//! A group is declared with a capacity tier and starts unconstructed: no
//! class, no slot array. The first successful Set adopts the header's class
//! and slot count and allocates a slot array sized to the tier capacity.
//! From then on the class and slot count never change, slots are filled in
//! place, and nothing is ever removed.
//!
//! The membership mask bit `i` is set iff slot `i` holds an object.

use std::any::Any;
use std::mem::size_of;

use boardobj::error::{BoardObjError, BoardObjResult, CastError};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::mask::BoardObjMask;
use boardobj::tier::GroupTier;

use crate::obj::{BoardObject, checked_cast_mut};
use crate::vtable::VtableRegistry;

/// One slot of a group's slot array.
pub type BoardObjSlot = Option<Box<dyn BoardObject>>;

/// Sparse collection of board objects of one class.
pub struct BoardObjGrp {
    tier: GroupTier,
    capacity: usize,
    class_id: Option<ClassId>,
    obj_slots: u16,
    objects: Vec<BoardObjSlot>,
    mask: BoardObjMask,
}

impl BoardObjGrp {
    /// Create an unconstructed group of the given tier.
    ///
    /// # Errors
    /// `UnsupportedTier` if the tier is compiled out.
    pub fn new(tier: GroupTier) -> BoardObjResult<Self> {
        let capacity = tier.capacity()?;
        Ok(Self {
            tier,
            capacity,
            class_id: None,
            obj_slots: 0,
            objects: Vec::new(),
            mask: BoardObjMask::new(capacity)?,
        })
    }

    #[inline]
    pub fn tier(&self) -> GroupTier {
        self.tier
    }

    /// Tier capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Class adopted on construction.
    #[inline]
    pub fn class_id(&self) -> Option<ClassId> {
        self.class_id
    }

    /// Slot count adopted on construction, 0 before.
    #[inline]
    pub fn obj_slots(&self) -> u16 {
        self.obj_slots
    }

    #[inline]
    pub fn is_constructed(&self) -> bool {
        self.class_id.is_some()
    }

    /// Occupied slots.
    #[inline]
    pub fn mask(&self) -> &BoardObjMask {
        &self.mask
    }

    /// Number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.mask.count()
    }

    /// True if no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// True if slot `idx` holds an object.
    #[inline]
    pub fn is_valid(&self, idx: u16) -> bool {
        self.mask.get(idx)
    }

    /// Highest occupied slot.
    #[inline]
    pub fn max_index(&self) -> Option<u16> {
        self.mask.highest()
    }

    /// Object in slot `idx`.
    pub fn get(&self, idx: u16) -> Option<&dyn BoardObject> {
        match self.objects.get(idx as usize) {
            Some(Some(obj)) => Some(&**obj),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, idx: u16) -> Option<&mut dyn BoardObject> {
        match self.objects.get_mut(idx as usize) {
            Some(Some(obj)) => Some(&mut **obj),
            _ => None,
        }
    }

    /// Checked mutable cast of the object in slot `idx`.
    ///
    /// `None` for an empty slot.
    pub fn cast_mut<T: Any>(
        &mut self,
        vtables: &VtableRegistry,
        idx: u16,
        class: ClassId,
        requested: BoardObjType,
    ) -> Option<Result<&mut T, CastError>> {
        let grp_class = self.class_id;
        let obj = self.get_mut(idx)?;
        Some(checked_cast_mut(grp_class, vtables, obj, class, requested))
    }

    /// Bytes charged to the allocator for the slot array.
    #[inline]
    pub fn slot_array_size(&self) -> usize {
        self.capacity * size_of::<BoardObjSlot>()
    }

    /// Adopt identity and allocate the slot array.
    pub(crate) fn construct(&mut self, class_id: ClassId, obj_slots: u16) -> BoardObjResult<()> {
        if self.is_constructed() {
            return Err(BoardObjError::InvalidArgument {
                reason: "group already constructed",
            });
        }
        if obj_slots as usize > self.capacity {
            return Err(BoardObjError::CapacityExceeded {
                requested: obj_slots as usize,
                capacity: self.capacity,
            });
        }
        self.objects = std::iter::repeat_with(|| None).take(self.capacity).collect();
        self.obj_slots = obj_slots;
        self.class_id = Some(class_id);
        Ok(())
    }

    /// Place a freshly allocated object in its slot.
    pub(crate) fn insert(&mut self, obj: Box<dyn BoardObject>) -> BoardObjResult<()> {
        let idx = obj.grp_idx();
        if Some(obj.class_id()) != self.class_id {
            return Err(BoardObjError::InvalidArgument {
                reason: "object class differs from group class",
            });
        }
        if idx >= self.obj_slots {
            return Err(BoardObjError::CapacityExceeded {
                requested: idx as usize + 1,
                capacity: self.obj_slots as usize,
            });
        }
        let slot = &mut self.objects[idx as usize];
        if slot.is_some() {
            return Err(BoardObjError::InvalidArgument {
                reason: "slot already occupied",
            });
        }
        *slot = Some(obj);
        self.mask.set(idx)
    }
}

impl std::fmt::Debug for BoardObjGrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardObjGrp")
            .field("tier", &self.tier)
            .field("class_id", &self.class_id)
            .field("obj_slots", &self.obj_slots)
            .field("occupied", &self.mask.count())
            .finish()
    }
}
