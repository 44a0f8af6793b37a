//! GetStatus results reach the surface even when a class callback fails.

use std::any::Any;
use std::mem::size_of;

use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::tier::GroupTier;
use boardobj::wire::{WireReader, WireWriter};
use boardobj_rt::config::RuntimeSettings;
use boardobj_rt::dispatch::TransferMode;
use boardobj_rt::grp::BoardObjGrp;
use boardobj_rt::host::{GrpCmdBuilder, read_entry, read_header_ext};
use boardobj_rt::obj::{BoardObjBase, BoardObject};
use boardobj_rt::protocol::{BoardObjGrpClass, BoardObjGrpLocation};
use boardobj_rt::runtime::Runtime;
use boardobj_rt::vtable::BoardObjVirtualTable;
use boardobj_surface::MemSurface;

use super::fixtures::{GET_STATUS, SET, surface};

const GAUGE_CLASS: ClassId = ClassId(0x30);
const TYPE_GAUGE: BoardObjType = BoardObjType(0x01);

/// Reading that makes the status query fail.
const FAULTED: u32 = 0xDEAD;
/// Written into the header extension before a failing header query returns.
const HEADER_MARKER: u16 = 0xBEEF;

const LOCATION: BoardObjGrpLocation = BoardObjGrpLocation {
    offset: 0x1000,
    header_size: 16,
    entry_size: 8,
    max_slots: 8,
};

#[derive(Debug)]
#[repr(C)]
struct Gauge {
    super_: BoardObjBase,
    reading: u32,
}

boardobj_rt::impl_board_object!(Gauge, super_);

struct GaugeVtable;

impl BoardObjVirtualTable for GaugeVtable {
    fn class_id(&self) -> ClassId {
        GAUGE_CLASS
    }

    fn obj_type(&self) -> BoardObjType {
        TYPE_GAUGE
    }

    fn dynamic_cast<'a>(
        &self,
        obj: &'a dyn BoardObject,
        requested: BoardObjType,
    ) -> Option<&'a dyn Any> {
        let gauge = obj.as_any().downcast_ref::<Gauge>()?;
        match requested {
            TYPE_GAUGE => Some(gauge),
            BoardObjType::BASE => Some(&gauge.super_),
            _ => None,
        }
    }

    fn dynamic_cast_mut<'a>(
        &self,
        obj: &'a mut dyn BoardObject,
        requested: BoardObjType,
    ) -> Option<&'a mut dyn Any> {
        let gauge = obj.as_any_mut().downcast_mut::<Gauge>()?;
        match requested {
            TYPE_GAUGE => Some(gauge),
            BoardObjType::BASE => Some(&mut gauge.super_),
            _ => None,
        }
    }
}

static GAUGE_VTABLE: GaugeVtable = GaugeVtable;
static VTABLES: [&dyn BoardObjVirtualTable; 1] = [&GAUGE_VTABLE];

struct GaugeClass {
    header_fails: bool,
}

fn gauge(obj: &dyn BoardObject) -> BoardObjResult<&Gauge> {
    obj.as_any().downcast_ref::<Gauge>().ok_or(BoardObjError::InvalidArgument {
        reason: "not a gauge",
    })
}

impl BoardObjGrpClass for GaugeClass {
    fn class_id(&self) -> ClassId {
        GAUGE_CLASS
    }

    fn tier(&self) -> GroupTier {
        GroupTier::E32
    }

    fn vtables(&self) -> &'static [&'static dyn BoardObjVirtualTable] {
        &VTABLES
    }

    fn has_header_query(&self) -> bool {
        true
    }

    fn header_query(&mut self, _grp: &BoardObjGrp, ext: &mut WireWriter<'_>) -> BoardObjResult<()> {
        ext.write_u16(HEADER_MARKER)?;
        if self.header_fails {
            return Err(BoardObjError::InvalidArgument {
                reason: "header query failed",
            });
        }
        Ok(())
    }

    fn obj_size(&self, obj_type: BoardObjType) -> BoardObjResult<usize> {
        match obj_type {
            TYPE_GAUGE => Ok(size_of::<Gauge>()),
            _ => Err(BoardObjError::UnknownType {
                class: GAUGE_CLASS,
                obj_type,
            }),
        }
    }

    fn obj_alloc(&self, base: BoardObjBase) -> BoardObjResult<Box<dyn BoardObject>> {
        self.obj_size(base.obj_type())?;
        Ok(Box::new(Gauge {
            super_: base,
            reading: 0,
        }))
    }

    fn obj_set(&self, obj: &mut dyn BoardObject, r: &mut WireReader<'_>) -> BoardObjResult<()> {
        let reading = r.read_u32()?;
        let gauge = obj
            .as_any_mut()
            .downcast_mut::<Gauge>()
            .ok_or(BoardObjError::InvalidArgument {
                reason: "not a gauge",
            })?;
        gauge.reading = reading;
        Ok(())
    }

    fn obj_export(&self, obj: &dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        w.write_u32(gauge(obj)?.reading)
    }

    fn obj_query(&self, obj: &mut dyn BoardObject, w: &mut WireWriter<'_>) -> BoardObjResult<()> {
        let reading = gauge(obj)?.reading;
        if reading == FAULTED {
            return Err(BoardObjError::InvalidArgument {
                reason: "gauge faulted",
            });
        }
        w.write_u32(reading)
    }
}

fn gauge_cmd() -> GrpCmdBuilder {
    GrpCmdBuilder::new(GroupTier::E32, GAUGE_CLASS, 3).unwrap()
}

/// Gauges at slots 0..3 reading 10, faulted, 30.
fn gauges(header_fails: bool, mode: TransferMode) -> (Runtime, MemSurface) {
    let mut rt = Runtime::new(&RuntimeSettings::default());
    rt.register_class(Box::new(GaugeClass { header_fails })).unwrap();
    rt.register_default_cmds(GAUGE_CLASS, LOCATION, mode);

    let mut surface = surface();
    let mut cmd = gauge_cmd();
    for (idx, reading) in [(0u16, 10u32), (1, FAULTED), (2, 30)] {
        cmd = cmd.entry(idx, TYPE_GAUGE, &reading.to_le_bytes()).unwrap();
    }
    cmd.stage(&mut surface, &LOCATION).unwrap();
    rt.dispatch(&mut surface, GAUGE_CLASS.raw(), SET).unwrap();
    (rt, surface)
}

fn reading_at(surface: &MemSurface, idx: u16) -> u32 {
    let (_, fields) = read_entry(surface, &LOCATION, idx).unwrap();
    u32::from_le_bytes(fields[..4].try_into().unwrap())
}

#[test]
fn failed_header_query_still_writes_header() {
    for mode in [TransferMode::PerEntry, TransferMode::Bulk] {
        let (mut rt, mut surface) = gauges(true, mode);
        gauge_cmd()
            .query(0)
            .unwrap()
            .stage(&mut surface, &LOCATION)
            .unwrap();

        let err = rt
            .dispatch(&mut surface, GAUGE_CLASS.raw(), GET_STATUS)
            .unwrap_err();
        assert!(matches!(err, BoardObjError::InvalidArgument { .. }), "{mode:?}");

        let ext = read_header_ext(&surface, &LOCATION, GroupTier::E32).unwrap();
        assert_eq!(u16::from_le_bytes([ext[0], ext[1]]), HEADER_MARKER, "{mode:?}");
        // Entries are not queried after a header failure.
        assert_eq!(reading_at(&surface, 0), 0, "{mode:?}");
        assert!(!rt.is_halted());
    }
}

#[test]
fn failed_entry_query_keeps_earlier_entries() {
    for mode in [TransferMode::PerEntry, TransferMode::Bulk] {
        let (mut rt, mut surface) = gauges(false, mode);
        gauge_cmd()
            .query(0)
            .unwrap()
            .query(1)
            .unwrap()
            .query(2)
            .unwrap()
            .stage(&mut surface, &LOCATION)
            .unwrap();

        let err = rt
            .dispatch(&mut surface, GAUGE_CLASS.raw(), GET_STATUS)
            .unwrap_err();
        assert!(
            matches!(err, BoardObjError::InvalidArgument { reason: "gauge faulted" }),
            "{mode:?}"
        );

        let (entry, _) = read_entry(&surface, &LOCATION, 0).unwrap();
        assert_eq!(entry.obj_type, TYPE_GAUGE, "{mode:?}");
        assert_eq!(reading_at(&surface, 0), 10, "{mode:?}");
        assert_eq!(reading_at(&surface, 2), 0, "{mode:?}");

        let ext = read_header_ext(&surface, &LOCATION, GroupTier::E32).unwrap();
        assert_eq!(u16::from_le_bytes([ext[0], ext[1]]), HEADER_MARKER, "{mode:?}");
    }
}
