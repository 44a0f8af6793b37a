//! GetStatus: report live object state back to the host.

use boardobj::consts::ENTRY_HEADER_SIZE;
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::wire::{BoardObjGrpHeader, EntryHeader, WireWriter};
use boardobj_surface::Surface;
use tracing::{debug, warn};

use super::buffer::{GrpBuffer, ResidentBuffer, SurfaceBuffer};
use super::{BoardObjGrpLocation, GrpEnv};

/// GetStatus with one surface transfer per header and per entry.
///
/// Every queried entry gets its `type` and `grp_idx` from the live object
/// before the class query runs. With copy-in clear the rest of the entry
/// starts zeroed.
///
/// # Errors
/// - State: group never constructed, header inconsistent with the group,
///   or queried mask naming empty slots.
/// - Range / Transfer as for Set.
pub fn grp_get_status(
    env: &mut GrpEnv<'_>,
    surface: &mut dyn Surface,
    loc: &BoardObjGrpLocation,
    scratch: &mut [u8],
) -> BoardObjResult<()> {
    let mut buf = SurfaceBuffer::new(surface, *loc, scratch)?;
    query(env, &mut buf)
}

/// GetStatus over a resident copy of the header and all entries.
///
/// Results are written into `region`; the caller copies it back.
pub fn grp_get_status_auto(
    env: &mut GrpEnv<'_>,
    region: &mut [u8],
    header_size: usize,
    entry_size: usize,
) -> BoardObjResult<()> {
    let mut buf = ResidentBuffer::new(region, header_size, entry_size)?;
    query(env, &mut buf)
}

fn query<B: GrpBuffer>(env: &mut GrpEnv<'_>, buf: &mut B) -> BoardObjResult<()> {
    let class_id = env.class.class_id();
    if !env.grp.is_constructed() {
        warn!(class = %class_id, "status requested before construction");
        return Err(BoardObjError::NotConstructed { class: class_id });
    }

    buf.load_header()?;
    let hdr = BoardObjGrpHeader::decode(buf.header())?;
    check_header(env, &hdr)?;

    if env.class.has_header_query() {
        let ext_start = BoardObjGrpHeader::encoded_len(hdr.tier);
        let result = env
            .class
            .header_query(&*env.grp, &mut WireWriter::new(&mut buf.header()[ext_start..]));
        buf.store_header()?;
        result?;
    }

    let copy_in = hdr.copy_in();
    debug!(class = %class_id, entries = hdr.mask.count(), copy_in, "get status");

    for idx in hdr.mask.iter() {
        let entry = buf.load_entry(idx, copy_in)?;
        let obj = env.grp.get_mut(idx).ok_or(BoardObjError::InvalidArgument {
            reason: "queried slot is empty",
        })?;
        EntryHeader {
            obj_type: obj.obj_type(),
            grp_idx: obj.grp_idx(),
        }
        .encode(entry)?;
        env.class
            .obj_query(obj, &mut WireWriter::new(&mut entry[ENTRY_HEADER_SIZE..]))?;
        buf.store_entry(idx)?;
    }
    Ok(())
}

fn check_header(env: &GrpEnv<'_>, hdr: &BoardObjGrpHeader) -> BoardObjResult<()> {
    let grp = &*env.grp;
    if hdr.tier != grp.tier() {
        return Err(BoardObjError::HeaderMismatch {
            field: "group_type",
            expected: grp.tier() as u32,
            actual: hdr.tier as u32,
        });
    }
    if grp.class_id() != Some(hdr.class_id) {
        return Err(BoardObjError::HeaderMismatch {
            field: "class_id",
            expected: grp.class_id().map_or(0, |c| c.raw() as u32),
            actual: hdr.class_id.raw() as u32,
        });
    }
    if hdr.obj_slots != grp.obj_slots() {
        return Err(BoardObjError::HeaderMismatch {
            field: "obj_slots",
            expected: grp.obj_slots() as u32,
            actual: hdr.obj_slots as u32,
        });
    }
    if !hdr.mask.is_subset_of(grp.mask()) {
        return Err(BoardObjError::MaskMismatch {
            reason: "queried mask names empty slots",
        });
    }
    Ok(())
}
