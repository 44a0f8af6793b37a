//! Checked and unchecked casts, and interface lookup, on wire-built objects.

use boardobj::error::CastFailure;
use boardobj::ids::{BoardObjType, ClassId};
use boardobj_rt::classes::clk_domain::{
    self, ClkDomain, ClkDomain3x, ClkDomain3xFixed, ClkDomain3xProg, ClkDomain35Primary,
    ClkDomainProg, IFACE_PROG, TYPE_3X, TYPE_3X_FIXED, TYPE_3X_PROG, TYPE_35_PRIMARY,
    TYPE_35_SECONDARY, TYPE_CLK_DOMAIN,
};
use boardobj_rt::classes::therm_channel;
use boardobj_rt::dispatch::TransferMode;
use boardobj_rt::obj::{BoardObjBase, checked_cast, checked_cast_any, unchecked_cast};
use boardobj_rt::runtime::Runtime;
use proptest::prelude::*;

use super::fixtures::*;

const PRIMARY_SLOT: u16 = 0;
const SECONDARY_SLOT: u16 = 1;
const FIXED_SLOT: u16 = 2;

/// One object of each concrete CLK_DOMAIN type.
fn populated() -> Runtime {
    let mut rt = runtime(TransferMode::PerEntry);
    let mut surface = surface();
    let cmd = clk_cmd(4)
        .entry(PRIMARY_SLOT, TYPE_35_PRIMARY, &primary_fields(7, 1 << SECONDARY_SLOT))
        .unwrap()
        .entry(SECONDARY_SLOT, TYPE_35_SECONDARY, &secondary_fields(7, 0))
        .unwrap()
        .entry(FIXED_SLOT, TYPE_3X_FIXED, &fixed_fields(8, 405))
        .unwrap();
    send(&mut rt, &mut surface, &cmd, &clk_domain::LOCATION, CLK, SET).unwrap();
    rt
}

/// Levels reachable from each concrete type, base included.
fn path_of(concrete: BoardObjType) -> &'static [BoardObjType] {
    match concrete {
        TYPE_3X_FIXED => &[BoardObjType::BASE, TYPE_CLK_DOMAIN, TYPE_3X, TYPE_3X_FIXED],
        TYPE_35_PRIMARY => &[
            BoardObjType::BASE,
            TYPE_CLK_DOMAIN,
            TYPE_3X,
            TYPE_3X_PROG,
            TYPE_35_PRIMARY,
        ],
        TYPE_35_SECONDARY => &[
            BoardObjType::BASE,
            TYPE_CLK_DOMAIN,
            TYPE_3X,
            TYPE_3X_PROG,
            TYPE_35_SECONDARY,
        ],
        _ => &[],
    }
}

proptest! {
    #[test]
    fn cast_succeeds_exactly_on_path(
        slot in prop_oneof![Just(PRIMARY_SLOT), Just(SECONDARY_SLOT), Just(FIXED_SLOT)],
        requested in 0u8..=10,
    ) {
        let rt = populated();
        let grp = rt.group(clk_domain::CLASS_ID).unwrap();
        let obj = grp.get(slot).unwrap();
        let requested = BoardObjType(requested);

        let result = checked_cast_any(grp, rt.vtables(), obj, clk_domain::CLASS_ID, requested);
        if path_of(obj.obj_type()).contains(&requested) {
            prop_assert!(result.is_ok());
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.failure, CastFailure::NotOnPath);
            prop_assert_eq!(err.index, slot);
            prop_assert_eq!(err.requested, requested);
        }
    }
}

#[test]
fn typed_levels_share_identity() {
    let rt = populated();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    let vt = rt.vtables();
    let obj = grp.get(PRIMARY_SLOT).unwrap();

    let primary: &ClkDomain35Primary =
        checked_cast(grp, vt, obj, clk_domain::CLASS_ID, TYPE_35_PRIMARY).unwrap();
    assert_eq!(primary.secondary_mask, 1 << SECONDARY_SLOT);

    let prog: &ClkDomain3xProg =
        checked_cast(grp, vt, obj, clk_domain::CLASS_ID, TYPE_3X_PROG).unwrap();
    assert_eq!(prog.prog.prog_count(), 4);

    let three_x: &ClkDomain3x = checked_cast(grp, vt, obj, clk_domain::CLASS_ID, TYPE_3X).unwrap();
    assert!(three_x.noise_aware);

    let domain: &ClkDomain =
        checked_cast(grp, vt, obj, clk_domain::CLASS_ID, TYPE_CLK_DOMAIN).unwrap();
    assert_eq!(domain.api_domain, 7);

    let base: &BoardObjBase =
        checked_cast(grp, vt, obj, clk_domain::CLASS_ID, BoardObjType::BASE).unwrap();
    assert_eq!(base.grp_idx(), PRIMARY_SLOT);
    assert_eq!(base.obj_type(), TYPE_35_PRIMARY);

    // Every level is a prefix of the same allocation.
    let base_addr = base as *const BoardObjBase as usize;
    assert_eq!(primary as *const ClkDomain35Primary as usize, base_addr);
    assert_eq!(domain as *const ClkDomain as usize, base_addr);
}

#[test]
fn level_with_wrong_rust_type_is_representation_mismatch() {
    let rt = populated();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    let obj = grp.get(FIXED_SLOT).unwrap();
    let err = checked_cast::<ClkDomain35Primary>(
        grp,
        rt.vtables(),
        obj,
        clk_domain::CLASS_ID,
        TYPE_3X,
    )
    .unwrap_err();
    assert_eq!(err.failure, CastFailure::RepresentationMismatch);
}

#[test]
fn unchecked_cast_reads_prefix_levels() {
    let rt = populated();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    let obj = grp.get(FIXED_SLOT).unwrap();

    // SAFETY: slot FIXED_SLOT holds a `ClkDomain3xFixed`.
    let fixed: &ClkDomain3xFixed = unsafe { unchecked_cast(obj) };
    assert_eq!(fixed.freq_mhz, 405);
    // SAFETY: `ClkDomain` is the leading level of every CLK_DOMAIN object.
    let domain: &ClkDomain = unsafe { unchecked_cast(obj) };
    assert_eq!(domain.api_domain, 8);
    // SAFETY: every board object starts with its base.
    let base: &BoardObjBase = unsafe { unchecked_cast(obj) };
    assert_eq!(base.grp_idx(), FIXED_SLOT);
}

#[test]
fn prog_interface_lookup() {
    let rt = populated();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();

    for slot in [PRIMARY_SLOT, SECONDARY_SLOT] {
        let obj = grp.get(slot).unwrap();
        let iface = rt.vtables().iface_lookup(obj, IFACE_PROG).unwrap();
        assert_eq!(iface.iface_type(), IFACE_PROG);
        assert_eq!(iface.object().grp_idx(), slot);
        assert_eq!(iface.object().obj_type(), obj.obj_type());

        let prog = iface.cast::<ClkDomainProg>().unwrap();
        assert_eq!((prog.prog_idx_first, prog.prog_idx_last), (0, 3));
        assert_eq!((prog.delta_min_mhz, prog.delta_max_mhz), (-100, 100));
    }

    let fixed = grp.get(FIXED_SLOT).unwrap();
    assert!(rt.vtables().iface_lookup(fixed, IFACE_PROG).is_none());

    let primary = grp.get(PRIMARY_SLOT).unwrap();
    assert!(rt.vtables().iface_lookup(primary, TYPE_3X_PROG).is_none());
}

#[test]
fn class_checks_precede_path_checks() {
    let rt = populated();
    let grp = rt.group(clk_domain::CLASS_ID).unwrap();
    let obj = grp.get(PRIMARY_SLOT).unwrap();

    let err =
        checked_cast_any(grp, rt.vtables(), obj, therm_channel::CLASS_ID, TYPE_CLK_DOMAIN)
            .unwrap_err();
    assert_eq!(
        err.failure,
        CastFailure::ClassMismatch {
            requested: therm_channel::CLASS_ID,
            actual: clk_domain::CLASS_ID,
        }
    );

    // A CLK object presented as a member of the (unconstructed) THERM group.
    let therm = rt.group(therm_channel::CLASS_ID).unwrap();
    let err = checked_cast_any(therm, rt.vtables(), obj, clk_domain::CLASS_ID, TYPE_CLK_DOMAIN)
        .unwrap_err();
    assert_eq!(
        err.failure,
        CastFailure::ForeignGroup {
            group: None,
            actual: clk_domain::CLASS_ID,
        }
    );

    let err = checked_cast_any(grp, rt.vtables(), obj, ClassId(0x7F), BoardObjType::BASE)
        .unwrap_err();
    assert!(matches!(err.failure, CastFailure::ClassMismatch { .. }));
}
