//! THERM_CHANNEL class: one concrete type, `DEVICE`.
//!
//! Entry fields: `therm_device_idx: u8`, `scaling: i16` (Q8.8), `offset: i32`,
//! `temp_min: i32`, `temp_max: i32`. Status: `temp: i32`. The GetStatus
//! header extension reports the channel count as `u16`.

use std::any::Any;
use std::mem::size_of;

use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::tier::GroupTier;
use boardobj::wire::{WireReader, WireWriter};

use super::{concrete, concrete_mut};
use crate::grp::BoardObjGrp;
use crate::obj::{BoardObjBase, BoardObject};
use crate::protocol::{BoardObjGrpClass, BoardObjGrpLocation};
use crate::vtable::BoardObjVirtualTable;

pub const CLASS_ID: ClassId = ClassId(0x0B);

pub const TYPE_DEVICE: BoardObjType = BoardObjType(0x01);

pub const HEADER_SIZE: usize = 44;
pub const ENTRY_SIZE: usize = 20;

pub const LOCATION: BoardObjGrpLocation = BoardObjGrpLocation {
    offset: 0x0400,
    header_size: HEADER_SIZE,
    entry_size: ENTRY_SIZE,
    max_slots: 64,
};

/// A thermal channel reading one sensor device.
#[derive(Debug, Clone)]
#[repr(C)]
pub struct ThermChannelDevice {
    pub super_: BoardObjBase,
    pub therm_device_idx: u8,
    /// Q8.8 gain applied to raw samples.
    pub scaling: i16,
    pub offset: i32,
    pub temp_min: i32,
    pub temp_max: i32,
    /// Last converted sample.
    pub temp: i32,
}

crate::impl_board_object!(ThermChannelDevice, super_);

impl ThermChannelDevice {
    fn new(base: BoardObjBase) -> Self {
        Self {
            super_: base,
            therm_device_idx: 0,
            scaling: 0x100,
            offset: 0,
            temp_min: i32::MIN,
            temp_max: i32::MAX,
            temp: 0,
        }
    }

    /// Convert a raw sample and cache it as the channel temperature.
    pub fn record_sample(&mut self, raw: i32) -> i32 {
        let scaled = (i64::from(raw) * i64::from(self.scaling)) >> 8;
        let temp = (scaled + i64::from(self.offset))
            .clamp(i64::from(self.temp_min), i64::from(self.temp_max));
        self.temp = temp as i32;
        self.temp
    }

    fn set(&mut self, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        let therm_device_idx = r.read_u8()?;
        let scaling = r.read_i16()?;
        let offset = r.read_i32()?;
        let temp_min = r.read_i32()?;
        let temp_max = r.read_i32()?;
        if temp_min > temp_max {
            return Err(BoardObjError::InvalidArgument {
                reason: "temperature limits are inverted",
            });
        }
        self.therm_device_idx = therm_device_idx;
        self.scaling = scaling;
        self.offset = offset;
        self.temp_min = temp_min;
        self.temp_max = temp_max;
        Ok(())
    }

    fn export(&self, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        w.write_u8(self.therm_device_idx)?;
        w.write_i16(self.scaling)?;
        w.write_i32(self.offset)?;
        w.write_i32(self.temp_min)?;
        w.write_i32(self.temp_max)
    }
}

struct DeviceVtable;

impl BoardObjVirtualTable for DeviceVtable {
    fn class_id(&self) -> ClassId {
        CLASS_ID
    }

    fn obj_type(&self) -> BoardObjType {
        TYPE_DEVICE
    }

    fn dynamic_cast<'a>(
        &self,
        obj: &'a dyn BoardObject,
        requested: BoardObjType,
    ) -> Option<&'a dyn Any> {
        let dev = obj.as_any().downcast_ref::<ThermChannelDevice>()?;
        match requested {
            TYPE_DEVICE => Some(dev),
            BoardObjType::BASE => Some(&dev.super_),
            _ => None,
        }
    }

    fn dynamic_cast_mut<'a>(
        &self,
        obj: &'a mut dyn BoardObject,
        requested: BoardObjType,
    ) -> Option<&'a mut dyn Any> {
        let dev = obj.as_any_mut().downcast_mut::<ThermChannelDevice>()?;
        match requested {
            TYPE_DEVICE => Some(dev),
            BoardObjType::BASE => Some(&mut dev.super_),
            _ => None,
        }
    }
}

static DEVICE_VTABLE: DeviceVtable = DeviceVtable;
static VTABLES: [&dyn BoardObjVirtualTable; 1] = [&DEVICE_VTABLE];

/// Callbacks of the THERM_CHANNEL group.
#[derive(Debug, Default)]
pub struct ThermChannelClass;

impl BoardObjGrpClass for ThermChannelClass {
    fn class_id(&self) -> ClassId {
        CLASS_ID
    }

    fn tier(&self) -> GroupTier {
        GroupTier::E255
    }

    fn vtables(&self) -> &'static [&'static dyn BoardObjVirtualTable] {
        &VTABLES
    }

    fn has_header_query(&self) -> bool {
        true
    }

    fn header_query(&mut self, grp: &BoardObjGrp, ext: &mut WireWriter<'_>) -> BoardObjResult<()> {
        ext.write_u16(grp.len() as u16)
    }

    fn obj_size(&self, obj_type: BoardObjType) -> BoardObjResult<usize> {
        match obj_type {
            TYPE_DEVICE => Ok(size_of::<ThermChannelDevice>()),
            _ => Err(BoardObjError::UnknownType {
                class: CLASS_ID,
                obj_type,
            }),
        }
    }

    fn obj_alloc(&self, base: BoardObjBase) -> BoardObjResult<Box<dyn BoardObject>> {
        self.obj_size(base.obj_type())?;
        Ok(Box::new(ThermChannelDevice::new(base)))
    }

    fn obj_set(&self, obj: &mut dyn BoardObject, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        concrete_mut::<ThermChannelDevice>(obj)?.set(r)
    }

    fn obj_export(&self, obj: &dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        concrete::<ThermChannelDevice>(obj)?.export(w)
    }

    fn obj_query(&self, obj: &mut dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        w.write_i32(concrete::<ThermChannelDevice>(obj)?.temp)
    }
}
