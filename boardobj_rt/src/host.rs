//! Host-side command staging.
//!
//! The host driver writes a group header and entries into the shared
//! surface before raising a command, and reads entries back after
//! GetStatus. [`GrpCmdBuilder`] does the former, [`read_entry`] and
//! [`read_header_ext`] the latter. Used by the binary, tests and benches.

use boardobj::consts::ENTRY_HEADER_SIZE;
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::mask::BoardObjMask;
use boardobj::tier::GroupTier;
use boardobj::wire::{BoardObjGrpHeader, EntryHeader, GrpFlags};
use boardobj_surface::Surface;

use crate::protocol::BoardObjGrpLocation;

struct StagedEntry {
    idx: u16,
    header: EntryHeader,
    fields: Vec<u8>,
}

/// Builds the surface image of one group command.
pub struct GrpCmdBuilder {
    tier: GroupTier,
    class_id: ClassId,
    obj_slots: u16,
    flags: GrpFlags,
    mask: BoardObjMask,
    ext: Vec<u8>,
    entries: Vec<StagedEntry>,
}

impl GrpCmdBuilder {
    /// Start an INIT command with an empty mask.
    ///
    /// # Errors
    /// `UnsupportedTier` if `tier` is compiled out.
    pub fn new(tier: GroupTier, class_id: ClassId, obj_slots: u16) -> BoardObjResult<Self> {
        Ok(Self {
            tier,
            class_id,
            obj_slots,
            flags: GrpFlags::empty(),
            mask: BoardObjMask::for_tier(tier)?,
            ext: Vec::new(),
            entries: Vec::new(),
        })
    }

    /// Request UPDATE semantics.
    pub fn update(mut self) -> Self {
        self.flags |= GrpFlags::UPDATE;
        self
    }

    /// Ask GetStatus to pre-populate entries from the surface.
    pub fn copy_in(mut self) -> Self {
        self.flags |= GrpFlags::GET_STATUS_COPY_IN;
        self
    }

    /// Class-specific header fields.
    pub fn header_ext(mut self, ext: &[u8]) -> Self {
        self.ext = ext.to_vec();
        self
    }

    /// Stage an entry for slot `idx` and set its mask bit.
    ///
    /// The entry header carries `idx`; use [`entry_raw`](Self::entry_raw)
    /// to stage a different `grp_idx`.
    pub fn entry(self, idx: u16, obj_type: BoardObjType, fields: &[u8]) -> BoardObjResult<Self> {
        self.entry_raw(idx, EntryHeader { obj_type, grp_idx: idx }, fields)
    }

    /// Stage an entry with an arbitrary entry header.
    pub fn entry_raw(
        mut self,
        idx: u16,
        header: EntryHeader,
        fields: &[u8],
    ) -> BoardObjResult<Self> {
        self.mask.set(idx)?;
        self.entries.push(StagedEntry {
            idx,
            header,
            fields: fields.to_vec(),
        });
        Ok(self)
    }

    /// Set a mask bit without staging an entry, for GetStatus.
    pub fn query(mut self, idx: u16) -> BoardObjResult<Self> {
        self.mask.set(idx)?;
        Ok(self)
    }

    /// The decoded form of the staged header.
    pub fn header(&self) -> BoardObjGrpHeader {
        BoardObjGrpHeader::new(
            self.tier,
            self.class_id,
            self.obj_slots,
            self.flags,
            self.mask.clone(),
        )
    }

    /// Image of the header and `obj_slots` entries laid out as in `loc`.
    ///
    /// # Errors
    /// `BufferTooSmall` if the header extension or an entry does not fit.
    pub fn encode(&self, loc: &BoardObjGrpLocation) -> BoardObjResult<Vec<u8>> {
        let mut image = vec![0u8; loc.region_size(self.obj_slots)];
        let header = &mut image[..loc.header_size];
        let ext_start = self.header().encode(header)?;
        let ext_end = ext_start + self.ext.len();
        if ext_end > loc.header_size {
            return Err(BoardObjError::BufferTooSmall {
                required: ext_end,
                available: loc.header_size,
            });
        }
        header[ext_start..ext_end].copy_from_slice(&self.ext);

        for staged in &self.entries {
            let start = loc.header_size + staged.idx as usize * loc.entry_size;
            let end = start + loc.entry_size;
            let available = image.len();
            let entry = image.get_mut(start..end).ok_or(BoardObjError::BufferTooSmall {
                required: end,
                available,
            })?;
            if ENTRY_HEADER_SIZE + staged.fields.len() > entry.len() {
                return Err(BoardObjError::BufferTooSmall {
                    required: ENTRY_HEADER_SIZE + staged.fields.len(),
                    available: entry.len(),
                });
            }
            staged.header.encode(entry)?;
            entry[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + staged.fields.len()]
                .copy_from_slice(&staged.fields);
        }
        Ok(image)
    }

    /// Write the image into `surface` at `loc.offset`.
    pub fn stage(&self, surface: &mut dyn Surface, loc: &BoardObjGrpLocation) -> BoardObjResult<()> {
        let image = self.encode(loc)?;
        surface
            .write(loc.offset, &image)
            .map_err(|e| BoardObjError::transfer(loc.offset, image.len(), e))
    }
}

/// Read entry `idx` back: its identity and the bytes after the entry header.
pub fn read_entry(
    surface: &dyn Surface,
    loc: &BoardObjGrpLocation,
    idx: u16,
) -> BoardObjResult<(EntryHeader, Vec<u8>)> {
    let offset = loc.entry_offset(idx);
    let mut entry = vec![0u8; loc.entry_size];
    surface
        .read(offset, &mut entry)
        .map_err(|e| BoardObjError::transfer(offset, loc.entry_size, e))?;
    let header = EntryHeader::decode(&entry)?;
    Ok((header, entry.split_off(ENTRY_HEADER_SIZE)))
}

/// Read the class-specific header fields back.
pub fn read_header_ext(
    surface: &dyn Surface,
    loc: &BoardObjGrpLocation,
    tier: GroupTier,
) -> BoardObjResult<Vec<u8>> {
    let mut header = vec![0u8; loc.header_size];
    surface
        .read(loc.offset, &mut header)
        .map_err(|e| BoardObjError::transfer(loc.offset, loc.header_size, e))?;
    Ok(header.split_off(BoardObjGrpHeader::encoded_len(tier)))
}
