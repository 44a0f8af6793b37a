//! Set: construct or update a group from wire data.
//!
//! Processing order is fixed: header, header validation, class header
//! fields, then one entry per set mask bit in ascending slot order. The
//! first error stops processing and is returned as is. Entries handled
//! before the error stay applied.

use boardobj::config::OverwritePolicy;
use boardobj::consts::ENTRY_HEADER_SIZE;
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::wire::{BoardObjGrpHeader, EntryHeader, SetType, WireReader, WireWriter};
use boardobj_surface::Surface;
use tracing::{debug, info, warn};

use super::buffer::{GrpBuffer, ResidentBuffer, SurfaceBuffer};
use super::{BoardObjGrpLocation, GrpEnv};
use crate::obj::BoardObjBase;
use crate::source::BoardObjGrpSrc;

/// Set with one surface transfer per header and per entry.
///
/// # Errors
/// - Range: header or entry larger than `scratch`, slot count beyond the tier.
/// - Transfer: a surface copy failed.
/// - State: malformed header, or header/mask inconsistent with the group.
/// - Argument: identity mismatch on an existing object (type mismatch is fatal).
/// - Allocation: object memory exhausted.
pub fn grp_set(
    env: &mut GrpEnv<'_>,
    surface: &mut dyn Surface,
    loc: &BoardObjGrpLocation,
    scratch: &mut [u8],
) -> BoardObjResult<()> {
    let mut buf = SurfaceBuffer::new(surface, *loc, scratch)?;
    construct(env, &mut buf)
}

/// Set over a resident copy of the header and all entries.
///
/// `region` starts with the header; entry `i` lives at
/// `header_size + i * entry_size`.
pub fn grp_set_auto(
    env: &mut GrpEnv<'_>,
    region: &mut [u8],
    header_size: usize,
    entry_size: usize,
) -> BoardObjResult<()> {
    let mut buf = ResidentBuffer::new(region, header_size, entry_size)?;
    construct(env, &mut buf)
}

/// Construct a group from a non-RPC source with INIT semantics.
///
/// Runs the same header checks and class callbacks as a wire Set.
pub fn grp_construct_from_src(env: &mut GrpEnv<'_>, src: &BoardObjGrpSrc) -> BoardObjResult<()> {
    let header = src.header_data_get()?;
    apply_header(env, &header.header)?;
    env.class
        .header_construct(&*env.grp, &mut WireReader::new(header.ext))?;

    for idx in header.header.mask.iter() {
        let entry = src.entry_data_get(idx)?;
        construct_entry(env, SetType::Init, entry.header, entry.fields)?;
    }
    info!(
        class = %env.class.class_id(),
        objects = env.grp.len(),
        "group constructed from source"
    );
    Ok(())
}

fn construct<B: GrpBuffer>(env: &mut GrpEnv<'_>, buf: &mut B) -> BoardObjResult<()> {
    buf.load_header()?;
    let hdr = BoardObjGrpHeader::decode(buf.header())?;
    apply_header(env, &hdr)?;

    let ext_start = BoardObjGrpHeader::encoded_len(hdr.tier);
    env.class
        .header_construct(&*env.grp, &mut WireReader::new(&buf.header()[ext_start..]))?;

    let set_type = hdr.set_type();
    debug!(
        class = %hdr.class_id,
        entries = hdr.mask.count(),
        ?set_type,
        "set"
    );

    for idx in hdr.mask.iter() {
        let entry = buf.load_entry(idx, true)?;
        EntryHeader::stamp_index(entry, idx)?;
        let entry_header = EntryHeader::decode(entry)?;
        construct_entry(env, set_type, entry_header, &entry[ENTRY_HEADER_SIZE..])?;
    }
    Ok(())
}

/// Validate a decoded header against the group, constructing it on first use.
pub(crate) fn apply_header(env: &mut GrpEnv<'_>, hdr: &BoardObjGrpHeader) -> BoardObjResult<()> {
    let grp_tier = env.grp.tier();
    if hdr.tier != grp_tier {
        return Err(BoardObjError::HeaderMismatch {
            field: "group_type",
            expected: grp_tier as u32,
            actual: hdr.tier as u32,
        });
    }
    let class_id = env.class.class_id();
    if hdr.class_id != class_id {
        return Err(BoardObjError::HeaderMismatch {
            field: "class_id",
            expected: class_id.raw() as u32,
            actual: hdr.class_id.raw() as u32,
        });
    }

    if !env.grp.is_constructed() {
        env.alloc.alloc(env.grp.slot_array_size())?;
        env.grp.construct(hdr.class_id, hdr.obj_slots)?;
        info!(
            class = %hdr.class_id,
            tier = %hdr.tier,
            obj_slots = hdr.obj_slots,
            "group constructed"
        );
        return Ok(());
    }

    if env.grp.class_id() != Some(hdr.class_id) {
        return Err(BoardObjError::HeaderMismatch {
            field: "class_id",
            expected: env.grp.class_id().map_or(0, |c| c.raw() as u32),
            actual: hdr.class_id.raw() as u32,
        });
    }
    if env.grp.obj_slots() != hdr.obj_slots {
        return Err(BoardObjError::HeaderMismatch {
            field: "obj_slots",
            expected: env.grp.obj_slots() as u32,
            actual: hdr.obj_slots as u32,
        });
    }

    match hdr.set_type() {
        SetType::Init if hdr.mask != *env.grp.mask() => Err(BoardObjError::MaskMismatch {
            reason: "INIT mask differs from group membership",
        }),
        SetType::Update if !hdr.mask.is_subset_of(env.grp.mask()) => {
            Err(BoardObjError::MaskMismatch {
                reason: "UPDATE mask is not a subset of group membership",
            })
        }
        _ => Ok(()),
    }
}

/// Construct or update the object in slot `entry.grp_idx`.
pub(crate) fn construct_entry(
    env: &mut GrpEnv<'_>,
    set_type: SetType,
    entry: EntryHeader,
    fields: &[u8],
) -> BoardObjResult<()> {
    let idx = entry.grp_idx;
    let policy = env.policy;

    if let Some(obj) = env.grp.get_mut(idx) {
        if obj.obj_type() != entry.obj_type {
            return Err(BoardObjError::IdentityMismatch {
                index: idx,
                existing: obj.obj_type(),
                incoming: entry.obj_type,
            });
        }
        if obj.grp_idx() != idx {
            return Err(BoardObjError::IndexMismatch {
                expected: idx,
                actual: obj.grp_idx(),
            });
        }

        if set_type == SetType::Update && policy == OverwritePolicy::Reject {
            let mut current = vec![0u8; fields.len()];
            let mut writer = WireWriter::new(&mut current);
            env.class.obj_export(&*obj, &mut writer)?;
            let used = writer.position();
            if current[..used] != fields[..used] {
                warn!(idx, "overwrite of configured object rejected");
                return Err(BoardObjError::OverwriteRejected { index: idx });
            }
            return Ok(());
        }

        debug!(idx, obj_type = %entry.obj_type, "entry updated");
        return env.class.obj_set(obj, &mut WireReader::new(fields));
    }

    if entry.obj_type.is_base() {
        return Err(BoardObjError::UnknownType {
            class: env.class.class_id(),
            obj_type: entry.obj_type,
        });
    }
    let size = env.class.obj_size(entry.obj_type)?;
    let base = BoardObjBase::new(env.class.class_id(), entry.obj_type, idx);
    let mut obj = env.class.obj_alloc(base)?;
    env.class.obj_set(&mut *obj, &mut WireReader::new(fields))?;

    env.alloc.alloc(size)?;
    env.grp.insert(obj)?;
    debug!(idx, obj_type = %entry.obj_type, size, "entry constructed");
    Ok(())
}
