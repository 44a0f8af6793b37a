//! Group construction from resident configuration tables.

use boardobj::error::{BoardObjError, ErrorKind};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::tier::GroupTier;
use boardobj_rt::classes::clk_domain::{self, TYPE_3X_FIXED, TYPE_35_PRIMARY};
use boardobj_rt::classes::therm_channel;
use boardobj_rt::dispatch::TransferMode;
use boardobj_rt::host::read_entry;
use boardobj_rt::runtime::Runtime;
use boardobj_rt::source::{BoardObjGrpSrc, ResidentTableBuilder};
use boardobj_surface::MemSurface;

use super::fixtures::*;

/// Slot 0 primary, slot 1 disabled, slot 2 fixed, slot 3 absent.
fn clk_table() -> BoardObjGrpSrc {
    let table = ResidentTableBuilder::new(
        clk_domain::CLASS_ID,
        GroupTier::E32,
        4,
        clk_domain::ENTRY_SIZE,
    )
    .header_ext(&SAMPLE_PERIOD_MS.to_le_bytes())
    .entry(TYPE_35_PRIMARY, &primary_fields(10, 0))
    .disabled()
    .entry(TYPE_3X_FIXED, &fixed_fields(11, 810))
    .build()
    .unwrap();
    BoardObjGrpSrc::ResidentTable(table)
}

fn status_of_slots(rt: &mut Runtime, slots: &[u16]) -> Vec<Vec<u8>> {
    let mut surface = surface();
    let mut query = clk_cmd(4);
    for &idx in slots {
        query = query.query(idx).unwrap();
    }
    send(rt, &mut surface, &query, &clk_domain::LOCATION, CLK, GET_STATUS).unwrap();
    slots
        .iter()
        .map(|&idx| read_entry(&surface, &clk_domain::LOCATION, idx).unwrap().1)
        .collect()
}

#[test]
fn resident_table_matches_wire_set() {
    let mut from_table = runtime(TransferMode::PerEntry);
    from_table.self_init(&clk_table()).unwrap();

    let mut from_wire = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let cmd = clk_cmd(4)
        .entry(0, TYPE_35_PRIMARY, &primary_fields(10, 0))
        .unwrap()
        .entry(2, TYPE_3X_FIXED, &fixed_fields(11, 810))
        .unwrap();
    send(&mut from_wire, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap();

    assert_eq!(from_table.summaries(), from_wire.summaries());
    assert_eq!(from_table.dmem().used(), from_wire.dmem().used());

    let grp = from_table.group(clk_domain::CLASS_ID).unwrap();
    assert!(grp.is_constructed());
    assert_eq!(grp.obj_slots(), 4);
    assert_eq!(grp.mask().iter().collect::<Vec<_>>(), [0, 2]);

    assert_eq!(
        status_of_slots(&mut from_table, &[0, 2]),
        status_of_slots(&mut from_wire, &[0, 2])
    );
}

#[test]
fn update_after_self_init() {
    let mut rt = runtime(TransferMode::Bulk);
    rt.self_init(&clk_table()).unwrap();

    let mut surface = surface();
    let update = clk_cmd(4)
        .update()
        .entry(2, TYPE_3X_FIXED, &fixed_fields(11, 1620))
        .unwrap();
    send(&mut rt, &mut surface, &update, &clk_domain::LOCATION, CLK, SET).unwrap();

    let status = status_of_slots(&mut rt, &[2]);
    assert_eq!(u32::from_le_bytes(status[0][..4].try_into().unwrap()), 1_620_000);

    // The disabled slot stays outside the group.
    let add = clk_cmd(4)
        .update()
        .entry(1, TYPE_3X_FIXED, &fixed_fields(12, 100))
        .unwrap();
    let err = send(&mut rt, &mut surface, &add, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert!(matches!(err, BoardObjError::MaskMismatch { .. }));
}

#[test]
fn unsupported_source_kind() {
    let mut rt = runtime(TransferMode::PerEntry);
    let err = rt
        .self_init(&BoardObjGrpSrc::Unsupported { kind: 0x7f })
        .unwrap_err();
    assert_eq!(err, BoardObjError::UnsupportedSource { kind: 0x7f });
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert!(!rt.is_halted());
}

#[test]
fn table_for_unregistered_class() {
    let mut rt = runtime(TransferMode::PerEntry);
    let table = ResidentTableBuilder::new(ClassId(0x30), GroupTier::E32, 1, 8)
        .entry(BoardObjType(1), &[0; 4])
        .build()
        .unwrap();
    let err = rt.self_init(&BoardObjGrpSrc::ResidentTable(table)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[test]
fn table_tier_must_match_class() {
    let mut rt = runtime(TransferMode::PerEntry);
    let table = ResidentTableBuilder::new(
        therm_channel::CLASS_ID,
        GroupTier::E32,
        1,
        therm_channel::ENTRY_SIZE,
    )
    .entry(therm_channel::TYPE_DEVICE, &therm_fields(0, 0, 10))
    .build()
    .unwrap();
    let err = rt.self_init(&BoardObjGrpSrc::ResidentTable(table)).unwrap_err();
    assert!(matches!(
        err,
        BoardObjError::HeaderMismatch {
            field: "group_type",
            ..
        }
    ));
    assert!(!rt.group(therm_channel::CLASS_ID).unwrap().is_constructed());
}

#[test]
fn identity_conflict_with_wire_state_halts() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = MemSurface::new(4096);
    // Same membership as the table, but slot 0 is a fixed domain.
    let cmd = clk_cmd(4)
        .entry(0, TYPE_3X_FIXED, &fixed_fields(10, 100))
        .unwrap()
        .entry(2, TYPE_3X_FIXED, &fixed_fields(11, 810))
        .unwrap();
    send(&mut rt, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap();

    let err = rt.self_init(&clk_table()).unwrap_err();
    assert!(err.is_fatal());
    assert!(rt.is_halted());
    assert_eq!(rt.self_init(&clk_table()).unwrap_err(), BoardObjError::Halted);
    assert_eq!(
        rt.dispatch(&mut surface, CLK, GET_STATUS).unwrap_err(),
        BoardObjError::Halted
    );
}
