//! Header and entry staging.
//!
//! The engines are written once against [`GrpBuffer`]. The per-entry form
//! copies each header or entry between the surface and a scratch buffer;
//! the bulk form addresses a resident copy of the whole region directly.

use boardobj::consts::{ENTRY_HEADER_SIZE, GRP_HEADER_FIXED_SIZE};
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj_surface::Surface;

use super::BoardObjGrpLocation;

/// Staging area of one command.
pub(crate) trait GrpBuffer {
    /// Bring the header in.
    fn load_header(&mut self) -> BoardObjResult<()>;

    /// Header bytes, `header_size` long.
    fn header(&mut self) -> &mut [u8];

    /// Send the header back out.
    fn store_header(&mut self) -> BoardObjResult<()>;

    /// Entry `idx`, brought in from the surface or zero-filled.
    fn load_entry(&mut self, idx: u16, copy_in: bool) -> BoardObjResult<&mut [u8]>;

    /// Send entry `idx` back out.
    fn store_entry(&mut self, idx: u16) -> BoardObjResult<()>;
}

fn check_sizes(header_size: usize, entry_size: usize) -> BoardObjResult<()> {
    if header_size < GRP_HEADER_FIXED_SIZE {
        return Err(BoardObjError::InvalidArgument {
            reason: "header size below fixed group header",
        });
    }
    if entry_size < ENTRY_HEADER_SIZE {
        return Err(BoardObjError::InvalidArgument {
            reason: "entry size below entry header",
        });
    }
    Ok(())
}

fn check_fits(required: usize, available: usize) -> BoardObjResult<()> {
    if required > available {
        return Err(BoardObjError::BufferTooSmall {
            required,
            available,
        });
    }
    Ok(())
}

// ─── Per-entry transfers ────────────────────────────────────────────

/// Copies through scratch, one transfer per header or entry.
pub(crate) struct SurfaceBuffer<'a> {
    surface: &'a mut dyn Surface,
    loc: BoardObjGrpLocation,
    scratch: &'a mut [u8],
}

impl<'a> SurfaceBuffer<'a> {
    /// Validates both sizes against the scratch before any transfer.
    pub(crate) fn new(
        surface: &'a mut dyn Surface,
        loc: BoardObjGrpLocation,
        scratch: &'a mut [u8],
    ) -> BoardObjResult<Self> {
        check_sizes(loc.header_size, loc.entry_size)?;
        check_fits(loc.header_size, scratch.len())?;
        check_fits(loc.entry_size, scratch.len())?;
        Ok(Self {
            surface,
            loc,
            scratch,
        })
    }
}

impl GrpBuffer for SurfaceBuffer<'_> {
    fn load_header(&mut self) -> BoardObjResult<()> {
        let (offset, size) = (self.loc.offset, self.loc.header_size);
        self.surface
            .read(offset, &mut self.scratch[..size])
            .map_err(|e| BoardObjError::transfer(offset, size, e))
    }

    fn header(&mut self) -> &mut [u8] {
        &mut self.scratch[..self.loc.header_size]
    }

    fn store_header(&mut self) -> BoardObjResult<()> {
        let (offset, size) = (self.loc.offset, self.loc.header_size);
        self.surface
            .write(offset, &self.scratch[..size])
            .map_err(|e| BoardObjError::transfer(offset, size, e))
    }

    fn load_entry(&mut self, idx: u16, copy_in: bool) -> BoardObjResult<&mut [u8]> {
        let (offset, size) = (self.loc.entry_offset(idx), self.loc.entry_size);
        let entry = &mut self.scratch[..size];
        if copy_in {
            self.surface
                .read(offset, entry)
                .map_err(|e| BoardObjError::transfer(offset, size, e))?;
        } else {
            entry.fill(0);
        }
        Ok(entry)
    }

    fn store_entry(&mut self, idx: u16) -> BoardObjResult<()> {
        let (offset, size) = (self.loc.entry_offset(idx), self.loc.entry_size);
        self.surface
            .write(offset, &self.scratch[..size])
            .map_err(|e| BoardObjError::transfer(offset, size, e))
    }
}

// ─── Bulk ───────────────────────────────────────────────────────────

/// Addresses entries inside a resident copy of the group region.
pub(crate) struct ResidentBuffer<'a> {
    region: &'a mut [u8],
    header_size: usize,
    entry_size: usize,
}

impl<'a> ResidentBuffer<'a> {
    pub(crate) fn new(
        region: &'a mut [u8],
        header_size: usize,
        entry_size: usize,
    ) -> BoardObjResult<Self> {
        check_sizes(header_size, entry_size)?;
        check_fits(header_size, region.len())?;
        Ok(Self {
            region,
            header_size,
            entry_size,
        })
    }
}

impl GrpBuffer for ResidentBuffer<'_> {
    fn load_header(&mut self) -> BoardObjResult<()> {
        Ok(())
    }

    fn header(&mut self) -> &mut [u8] {
        &mut self.region[..self.header_size]
    }

    fn store_header(&mut self) -> BoardObjResult<()> {
        Ok(())
    }

    fn load_entry(&mut self, idx: u16, copy_in: bool) -> BoardObjResult<&mut [u8]> {
        let start = self.header_size + idx as usize * self.entry_size;
        let end = start + self.entry_size;
        let available = self.region.len();
        let entry = self
            .region
            .get_mut(start..end)
            .ok_or(BoardObjError::BufferTooSmall {
                required: end,
                available,
            })?;
        if !copy_in {
            entry.fill(0);
        }
        Ok(entry)
    }

    fn store_entry(&mut self, _idx: u16) -> BoardObjResult<()> {
        Ok(())
    }
}
