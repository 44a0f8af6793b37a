//! Set / GetStatus behaviour through the per-entry dispatch path.

use boardobj::config::OverwritePolicy;
use boardobj::error::{BoardObjError, ErrorKind};
use boardobj::ids::ClassId;
use boardobj::mask::BoardObjMask;
use boardobj::tier::GroupTier;
use boardobj::wire::{BoardObjGrpHeader, EntryHeader};
use boardobj_rt::classes::clk_domain::{
    self, ClkDomain3xFixed, ClkDomain35Primary, TYPE_3X_FIXED, TYPE_35_PRIMARY,
};
use boardobj_rt::alloc::ObjAllocator;
use boardobj_rt::classes::therm_channel::{self, ThermChannelDevice};
use boardobj_rt::config::RuntimeSettings;
use boardobj_rt::dispatch::TransferMode;
use boardobj_rt::host::{GrpCmdBuilder, read_entry, read_header_ext};
use boardobj_rt::runtime::Runtime;
use boardobj_surface::Surface;

use super::fixtures::*;

fn primary(rt: &Runtime, idx: u16) -> ClkDomain35Primary {
    rt.group(clk_domain::CLASS_ID)
        .and_then(|g| g.get(idx))
        .and_then(|o| o.as_any().downcast_ref::<ClkDomain35Primary>())
        .cloned()
        .expect("primary in slot")
}

#[test]
fn scenario_a_sparse_init() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);

    let grp = rt.group(clk_domain::CLASS_ID).expect("registered");
    assert!(grp.is_constructed());
    assert_eq!(grp.obj_slots(), 32);
    for idx in [0, 2] {
        let obj = grp.get(idx).expect("occupied");
        assert_eq!(obj.obj_type(), TYPE_35_PRIMARY);
        assert_eq!(obj.grp_idx(), idx);
    }
    assert!(grp.get(1).is_none());
    assert!((3..32).all(|idx| grp.get(idx).is_none()));
    assert_eq!(
        *grp.mask(),
        BoardObjMask::from_indices(32, [0, 2]).expect("in range")
    );
    assert_eq!(grp.max_index(), Some(2));
    assert!(!grp.is_empty());
    assert_eq!(primary(&rt, 2).super_.super_.super_.api_domain, 12);
}

#[test]
fn scenario_b_update_subset_then_reject_non_subset() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);
    let slot2 = primary(&rt, 2);

    let update = clk_cmd(32)
        .update()
        .entry(0, TYPE_35_PRIMARY, &primary_fields(99, 0))
        .unwrap();
    send(&mut rt, &mut surface, &update, &clk_domain::LOCATION, CLK, SET).unwrap();
    assert_eq!(primary(&rt, 0).super_.super_.super_.api_domain, 99);
    assert_eq!(
        primary(&rt, 2).super_.super_.super_.api_domain,
        slot2.super_.super_.super_.api_domain
    );

    let before = rt.summaries();
    let bad = clk_cmd(32)
        .update()
        .entry(5, TYPE_35_PRIMARY, &primary_fields(1, 0))
        .unwrap();
    let err = send(&mut rt, &mut surface, &bad, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(matches!(err, BoardObjError::MaskMismatch { .. }));
    assert_eq!(rt.summaries(), before);
    assert!(!rt.is_halted());
}

#[test]
fn scenario_c_status_before_construction() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let query = clk_cmd(32).query(0).unwrap();
    let err = send(&mut rt, &mut surface, &query, &clk_domain::LOCATION, CLK, GET_STATUS)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(matches!(err, BoardObjError::NotConstructed { .. }));
}

#[test]
fn slot_count_beyond_tier_leaves_group_unconstructed() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let cmd = clk_cmd(33);
    let err = send(&mut rt, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(!rt.group(clk_domain::CLASS_ID).unwrap().is_constructed());
}

#[test]
fn identity_is_invariant_after_construction() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);

    let resized = clk_cmd(16)
        .entry(0, TYPE_35_PRIMARY, &primary_fields(10, 0))
        .unwrap()
        .entry(2, TYPE_35_PRIMARY, &primary_fields(12, 0))
        .unwrap();
    let err = send(&mut rt, &mut surface, &resized, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert_eq!(
        err,
        BoardObjError::HeaderMismatch {
            field: "obj_slots",
            expected: 32,
            actual: 16,
        }
    );

    let foreign = GrpCmdBuilder::new(GroupTier::E32, ClassId(0x0B), 32).unwrap();
    let err = send(&mut rt, &mut surface, &foreign, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert!(matches!(
        err,
        BoardObjError::HeaderMismatch {
            field: "class_id",
            ..
        }
    ));

    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    assert_eq!(grp.obj_slots(), 32);
    assert_eq!(grp.class_id(), Some(clk_domain::CLASS_ID));
}

#[test]
fn init_on_constructed_group_needs_same_mask() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);

    let same = clk_cmd(32)
        .entry(0, TYPE_35_PRIMARY, &primary_fields(20, 0))
        .unwrap()
        .entry(2, TYPE_35_PRIMARY, &primary_fields(22, 0))
        .unwrap();
    send(&mut rt, &mut surface, &same, &clk_domain::LOCATION, CLK, SET).unwrap();
    assert_eq!(primary(&rt, 2).super_.super_.super_.api_domain, 22);

    let subset = clk_cmd(32)
        .entry(0, TYPE_35_PRIMARY, &primary_fields(20, 0))
        .unwrap();
    let err = send(&mut rt, &mut surface, &subset, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert!(matches!(err, BoardObjError::MaskMismatch { .. }));
}

#[test]
fn identical_update_is_idempotent() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);
    let before = (primary(&rt, 0), primary(&rt, 2));

    let update = clk_cmd(32)
        .update()
        .entry(0, TYPE_35_PRIMARY, &primary_fields(10, 0))
        .unwrap()
        .entry(2, TYPE_35_PRIMARY, &primary_fields(12, 0))
        .unwrap();
    for _ in 0..2 {
        send(&mut rt, &mut surface, &update, &clk_domain::LOCATION, CLK, SET).unwrap();
    }

    let after = (primary(&rt, 0), primary(&rt, 2));
    assert_eq!(format!("{before:?}"), format!("{after:?}"));
    assert_eq!(rt.group(clk_domain::CLASS_ID).unwrap().len(), 2);
}

#[test]
fn status_round_trip_keeps_identity() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let set = clk_cmd(4)
        .entry(1, TYPE_3X_FIXED, &fixed_fields(3, 1500))
        .unwrap()
        .entry(3, TYPE_35_PRIMARY, &primary_fields(4, 0))
        .unwrap();
    send(&mut rt, &mut surface, &set, &clk_domain::LOCATION, CLK, SET).unwrap();

    let query = clk_cmd(4)
        .copy_in()
        .entry(1, TYPE_3X_FIXED, &fixed_fields(3, 1500))
        .unwrap()
        .entry(3, TYPE_35_PRIMARY, &primary_fields(4, 0))
        .unwrap();
    send(&mut rt, &mut surface, &query, &clk_domain::LOCATION, CLK, GET_STATUS).unwrap();

    let (hdr, fields) = read_entry(&surface, &clk_domain::LOCATION, 1).unwrap();
    assert_eq!(
        hdr,
        EntryHeader {
            obj_type: TYPE_3X_FIXED,
            grp_idx: 1
        }
    );
    assert_eq!(u32::from_le_bytes(fields[..4].try_into().unwrap()), 1_500_000);
    // Copy-in keeps whatever the class did not write.
    assert_eq!(&fields[4..8], &fixed_fields(3, 1500)[4..8]);

    let (hdr, _) = read_entry(&surface, &clk_domain::LOCATION, 3).unwrap();
    assert_eq!(hdr.obj_type, TYPE_35_PRIMARY);
    assert_eq!(hdr.grp_idx, 3);
}

#[test]
fn status_without_copy_in_stamps_identity_on_zeroed_entries() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let set = clk_cmd(4)
        .entry(2, TYPE_3X_FIXED, &fixed_fields(3, 200))
        .unwrap();
    send(&mut rt, &mut surface, &set, &clk_domain::LOCATION, CLK, SET).unwrap();

    // Leave garbage where the reply will go.
    let garbage = clk_cmd(4)
        .entry(2, TYPE_35_PRIMARY, &[0xAA; 16])
        .unwrap();
    garbage.stage(&mut surface, &clk_domain::LOCATION).unwrap();
    let query = clk_cmd(4).query(2).unwrap();
    let image = query.encode(&clk_domain::LOCATION).unwrap();
    surface
        .write(clk_domain::LOCATION.offset, &image[..clk_domain::HEADER_SIZE])
        .unwrap();
    rt.dispatch(&mut surface, CLK, GET_STATUS).unwrap();

    let (hdr, fields) = read_entry(&surface, &clk_domain::LOCATION, 2).unwrap();
    assert_eq!(hdr.obj_type, TYPE_3X_FIXED);
    assert_eq!(hdr.grp_idx, 2);
    assert_eq!(u32::from_le_bytes(fields[..4].try_into().unwrap()), 200_000);
    assert!(fields[4..].iter().all(|&b| b == 0));
}

#[test]
fn empty_mask_is_header_only() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    send(&mut rt, &mut surface, &clk_cmd(8), &clk_domain::LOCATION, CLK, SET).unwrap();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    assert!(grp.is_constructed());
    assert!(grp.is_empty());
    assert_eq!(grp.max_index(), None);

    send(&mut rt, &mut surface, &clk_cmd(8), &clk_domain::LOCATION, CLK, GET_STATUS).unwrap();
}

#[test]
fn header_query_reports_channel_count() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let set = therm_cmd(8)
        .entry(0, therm_channel::TYPE_DEVICE, &therm_fields(0, -40, 125))
        .unwrap()
        .entry(5, therm_channel::TYPE_DEVICE, &therm_fields(1, -40, 125))
        .unwrap()
        .entry(7, therm_channel::TYPE_DEVICE, &therm_fields(2, -40, 125))
        .unwrap();
    send(&mut rt, &mut surface, &set, &therm_channel::LOCATION, THERM, SET).unwrap();

    let query = therm_cmd(8).query(5).unwrap();
    send(&mut rt, &mut surface, &query, &therm_channel::LOCATION, THERM, GET_STATUS).unwrap();

    let ext = read_header_ext(&surface, &therm_channel::LOCATION, GroupTier::E255).unwrap();
    assert_eq!(u16::from_le_bytes([ext[0], ext[1]]), 3);
    // The fixed header and mask are written back unchanged.
    let mut raw = vec![0u8; therm_channel::HEADER_SIZE];
    surface.read(therm_channel::LOCATION.offset, &mut raw).unwrap();
    assert_eq!(BoardObjGrpHeader::decode(&raw).unwrap(), query.header());
}

#[test]
fn failed_entry_keeps_earlier_entries() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let cmd = clk_cmd(4)
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap()
        .entry(1, clk_domain::TYPE_3X, &fixed_fields(1, 100))
        .unwrap()
        .entry(2, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap();
    let err = send(&mut rt, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert!(matches!(err, BoardObjError::UnknownType { .. }));
    assert_eq!(err.kind(), ErrorKind::Argument);

    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    assert!(grp.get(0).is_some());
    assert!(grp.get(1).is_none());
    assert!(grp.get(2).is_none());
    assert!(!rt.is_halted());
}

#[test]
fn type_mismatch_halts_runtime() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    scenario_a(&mut rt, &mut surface);

    let update = clk_cmd(32)
        .update()
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap();
    let err = send(&mut rt, &mut surface, &update, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert!(err.is_fatal());
    assert!(rt.is_halted());
    assert_eq!(rt.group(clk_domain::CLASS_ID).unwrap().get(0).unwrap().obj_type(), TYPE_35_PRIMARY);

    let query = therm_cmd(1);
    let err = send(&mut rt, &mut surface, &query, &therm_channel::LOCATION, THERM, SET).unwrap_err();
    assert_eq!(err, BoardObjError::Halted);
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn reject_policy_refuses_changed_fields() {
    let settings = RuntimeSettings {
        overwrite_policy: OverwritePolicy::Reject,
        ..RuntimeSettings::default()
    };
    let mut rt = runtime_with(settings, TransferMode::PerEntry);
    let mut surface = surface();
    let init = clk_cmd(2)
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap();
    send(&mut rt, &mut surface, &init, &clk_domain::LOCATION, CLK, SET).unwrap();

    let same = clk_cmd(2)
        .update()
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap();
    send(&mut rt, &mut surface, &same, &clk_domain::LOCATION, CLK, SET).unwrap();

    let changed = clk_cmd(2)
        .update()
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 250))
        .unwrap();
    let err = send(&mut rt, &mut surface, &changed, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert_eq!(err, BoardObjError::OverwriteRejected { index: 0 });
    assert_eq!(err.kind(), ErrorKind::Argument);

    let fixed = rt
        .group(clk_domain::CLASS_ID)
        .and_then(|g| g.get(0))
        .and_then(|o| o.as_any().downcast_ref::<ClkDomain3xFixed>())
        .unwrap();
    assert_eq!(fixed.freq_mhz, 100);
}

#[test]
fn overwrite_policy_applies_changed_fields() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let init = clk_cmd(2)
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap();
    send(&mut rt, &mut surface, &init, &clk_domain::LOCATION, CLK, SET).unwrap();

    let changed = clk_cmd(2)
        .update()
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 250))
        .unwrap();
    send(&mut rt, &mut surface, &changed, &clk_domain::LOCATION, CLK, SET).unwrap();

    let fixed = rt
        .group(clk_domain::CLASS_ID)
        .and_then(|g| g.get(0))
        .and_then(|o| o.as_any().downcast_ref::<ClkDomain3xFixed>())
        .unwrap();
    assert_eq!(fixed.freq_mhz, 250);
}

#[test]
fn exhausted_budget_leaves_slot_empty() {
    let sizing = runtime(TransferMode::PerEntry);
    let slot_array = sizing.group(clk_domain::CLASS_ID).unwrap().slot_array_size();
    let settings = RuntimeSettings {
        dmem_budget: slot_array + std::mem::size_of::<ClkDomain3xFixed>(),
        ..RuntimeSettings::default()
    };
    let mut rt = runtime_with(settings, TransferMode::PerEntry);
    let mut surface = surface();

    let cmd = clk_cmd(4)
        .entry(0, TYPE_3X_FIXED, &fixed_fields(1, 100))
        .unwrap()
        .entry(1, TYPE_3X_FIXED, &fixed_fields(2, 100))
        .unwrap();
    let err = send(&mut rt, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Allocation);

    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    assert!(grp.get(0).is_some());
    assert!(grp.get(1).is_none());
    assert!(!grp.is_valid(1));
    assert_eq!(rt.dmem().available(), 0);
}

#[test]
fn invalid_fields_are_argument_errors() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let cmd = therm_cmd(1)
        .entry(0, therm_channel::TYPE_DEVICE, &therm_fields(0, 50, -50))
        .unwrap();
    let err = send(&mut rt, &mut surface, &cmd, &therm_channel::LOCATION, THERM, SET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn rejected_entry_is_not_charged() {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let bad = therm_cmd(1)
        .entry(0, therm_channel::TYPE_DEVICE, &therm_fields(0, 50, -50))
        .unwrap();
    send(&mut rt, &mut surface, &bad, &therm_channel::LOCATION, THERM, SET).unwrap_err();

    let slot_array = rt.group(therm_channel::CLASS_ID).unwrap().slot_array_size();
    assert_eq!(rt.dmem().used(), slot_array);
    assert!(rt.group(therm_channel::CLASS_ID).unwrap().get(0).is_none());

    let mut fresh = runtime(TransferMode::PerEntry);
    let good = therm_cmd(1)
        .entry(0, therm_channel::TYPE_DEVICE, &therm_fields(0, -50, 50))
        .unwrap();
    send(&mut fresh, &mut surface, &good, &therm_channel::LOCATION, THERM, SET).unwrap();
    assert_eq!(
        fresh.dmem().used(),
        slot_array + std::mem::size_of::<ThermChannelDevice>()
    );
}
