//! Group header / entry codec for the shared surface.
//!
//! All multi-byte fields are little-endian.
//!
//! ## Group header
//!
//! ```text
//!   [0]      group_type:  u8     capacity tier code (see GroupTier)
//!   [1]      class_id:    u8
//!   [2..4]   obj_slots:   u16    number of wire entries that follow
//!   [4]      flags:       u8     GrpFlags
//!   [5..8]   reserved
//!   [8..]    mask:        u32 × ceil(capacity / 32)
//!   [..]     class-specific header fields up to the declared header size
//! ```
//!
//! ## Entry
//!
//! ```text
//!   [0]      type:        u8
//!   [1]      reserved
//!   [2..4]   grp_idx:     u16    stamped by the engine with the slot index
//!   [4..]    type-specific fields up to the declared entry size
//! ```
//!
//! Entry `i` of a group lives at `header_size + i * entry_size`.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::consts::{ENTRY_HEADER_SIZE, GRP_HEADER_FIXED_SIZE, MASK_MAX_WORDS};
use crate::error::{BoardObjError, BoardObjResult};
use crate::ids::{BoardObjType, ClassId};
use crate::mask::BoardObjMask;
use crate::tier::GroupTier;

bitflags! {
    /// Group header flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GrpFlags: u8 {
        /// Set type UPDATE (clear = INIT).
        const UPDATE             = 0x01;
        /// GetStatus pre-populates each entry from the surface.
        const GET_STATUS_COPY_IN = 0x02;
    }
}

/// Mask semantics of a Set command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetType {
    /// Incoming mask must equal the existing mask bit for bit.
    Init,
    /// Incoming mask must be a subset of the existing mask.
    Update,
}

// ─── Raw fixed-layout parts ─────────────────────────────────────────

/// Fixed part of the group header as laid out on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct GrpHeaderRaw {
    /// Capacity tier code.
    pub group_type: u8,
    /// Class identifier.
    pub class_id: u8,
    /// Number of wire entries.
    pub obj_slots: u16,
    /// `GrpFlags` bits.
    pub flags: u8,
    /// Reserved, written as zero.
    pub _reserved: [u8; 3],
}

const_assert_eq!(core::mem::size_of::<GrpHeaderRaw>(), GRP_HEADER_FIXED_SIZE);

impl GrpHeaderRaw {
    /// Decode the fixed part from the start of `bytes`.
    ///
    /// # Errors
    /// `BufferTooSmall` if fewer than 8 bytes are given.
    pub fn decode(bytes: &[u8]) -> BoardObjResult<Self> {
        let mut r = WireReader::new(bytes);
        let raw = Self {
            group_type: r.read_u8()?,
            class_id: r.read_u8()?,
            obj_slots: r.read_u16()?,
            flags: r.read_u8()?,
            _reserved: [r.read_u8()?, r.read_u8()?, r.read_u8()?],
        };
        Ok(raw)
    }

    /// Encode into the first 8 bytes of `out`.
    pub fn encode(&self, out: &mut [u8]) -> BoardObjResult<()> {
        let mut w = WireWriter::new(out);
        w.write_u8(self.group_type)?;
        w.write_u8(self.class_id)?;
        w.write_u16(self.obj_slots)?;
        w.write_u8(self.flags)?;
        w.write_bytes(&[0u8; 3])
    }
}

/// Identity part of an entry as laid out on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct EntryHeaderRaw {
    /// Object type tag.
    pub obj_type: u8,
    /// Reserved, written as zero.
    pub _reserved: u8,
    /// Slot index.
    pub grp_idx: u16,
}

const_assert_eq!(core::mem::size_of::<EntryHeaderRaw>(), ENTRY_HEADER_SIZE);

// ─── Decoded header ─────────────────────────────────────────────────

/// Fully decoded and structurally validated group header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardObjGrpHeader {
    /// Capacity tier.
    pub tier: GroupTier,
    /// Class identifier.
    pub class_id: ClassId,
    /// Number of object slots the host declares.
    pub obj_slots: u16,
    /// Flag bits.
    pub flags: GrpFlags,
    /// Requested membership mask, sized to the tier capacity.
    pub mask: BoardObjMask,
}

impl BoardObjGrpHeader {
    /// Build a header for encoding.
    pub fn new(
        tier: GroupTier,
        class_id: ClassId,
        obj_slots: u16,
        flags: GrpFlags,
        mask: BoardObjMask,
    ) -> Self {
        Self {
            tier,
            class_id,
            obj_slots,
            flags,
            mask,
        }
    }

    /// Bytes used by the fixed part plus the mask of `tier`.
    #[inline]
    pub const fn encoded_len(tier: GroupTier) -> usize {
        GRP_HEADER_FIXED_SIZE + tier.mask_words() * 4
    }

    /// Decode and validate a header.
    ///
    /// # Errors
    /// - `UnsupportedTier` for an unknown or disabled `group_type`.
    /// - `BufferTooSmall` if `bytes` ends before the mask does.
    /// - `CapacityExceeded` if `obj_slots` exceeds the tier capacity.
    /// - `MalformedHeader` if a mask bit lies at or beyond `obj_slots`.
    pub fn decode(bytes: &[u8]) -> BoardObjResult<Self> {
        let raw = GrpHeaderRaw::decode(bytes)?;
        let tier = GroupTier::from_u8(raw.group_type).ok_or(BoardObjError::UnsupportedTier {
            raw: raw.group_type,
        })?;
        let capacity = tier.capacity()?;

        let len = Self::encoded_len(tier);
        if bytes.len() < len {
            return Err(BoardObjError::BufferTooSmall {
                required: len,
                available: bytes.len(),
            });
        }
        if raw.obj_slots as usize > capacity {
            return Err(BoardObjError::CapacityExceeded {
                requested: raw.obj_slots as usize,
                capacity,
            });
        }

        let mut r = WireReader::new(&bytes[GRP_HEADER_FIXED_SIZE..len]);
        let mask = r.read_mask(capacity)?;
        if let Some(highest) = mask.highest() {
            if highest >= raw.obj_slots {
                return Err(BoardObjError::MalformedHeader {
                    reason: "mask bit at or beyond obj_slots",
                });
            }
        }

        Ok(Self {
            tier,
            class_id: ClassId(raw.class_id),
            obj_slots: raw.obj_slots,
            flags: GrpFlags::from_bits_truncate(raw.flags),
            mask,
        })
    }

    /// Encode into `out`, returning the number of bytes written.
    ///
    /// # Errors
    /// `BufferTooSmall` if `out` is shorter than [`Self::encoded_len`].
    pub fn encode(&self, out: &mut [u8]) -> BoardObjResult<usize> {
        let len = Self::encoded_len(self.tier);
        if out.len() < len {
            return Err(BoardObjError::BufferTooSmall {
                required: len,
                available: out.len(),
            });
        }
        let raw = GrpHeaderRaw {
            group_type: self.tier as u8,
            class_id: self.class_id.raw(),
            obj_slots: self.obj_slots,
            flags: self.flags.bits(),
            _reserved: [0; 3],
        };
        raw.encode(out)?;
        let mut w = WireWriter::new(&mut out[GRP_HEADER_FIXED_SIZE..len]);
        w.write_mask(&self.mask, self.tier.mask_words())?;
        Ok(len)
    }

    /// Mask semantics requested by the host.
    #[inline]
    pub fn set_type(&self) -> SetType {
        if self.flags.contains(GrpFlags::UPDATE) {
            SetType::Update
        } else {
            SetType::Init
        }
    }

    /// Whether GetStatus should pre-populate entries from the surface.
    #[inline]
    pub fn copy_in(&self) -> bool {
        self.flags.contains(GrpFlags::GET_STATUS_COPY_IN)
    }
}

// ─── Entry identity ─────────────────────────────────────────────────

/// Decoded identity fields of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Object type tag.
    pub obj_type: BoardObjType,
    /// Slot index.
    pub grp_idx: u16,
}

impl EntryHeader {
    /// Decode from the start of an entry.
    pub fn decode(entry: &[u8]) -> BoardObjResult<Self> {
        let mut r = WireReader::new(entry);
        let obj_type = BoardObjType(r.read_u8()?);
        r.skip(1)?;
        let grp_idx = r.read_u16()?;
        Ok(Self { obj_type, grp_idx })
    }

    /// Encode into the start of an entry.
    pub fn encode(&self, entry: &mut [u8]) -> BoardObjResult<()> {
        let mut w = WireWriter::new(entry);
        w.write_u8(self.obj_type.raw())?;
        w.write_u8(0)?;
        w.write_u16(self.grp_idx)
    }

    /// Overwrite only the `grp_idx` field of an entry.
    pub fn stamp_index(entry: &mut [u8], grp_idx: u16) -> BoardObjResult<()> {
        if entry.len() < ENTRY_HEADER_SIZE {
            return Err(BoardObjError::BufferTooSmall {
                required: ENTRY_HEADER_SIZE,
                available: entry.len(),
            });
        }
        entry[2..4].copy_from_slice(&grp_idx.to_le_bytes());
        Ok(())
    }
}

// ─── Field cursors ──────────────────────────────────────────────────

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Clone)]
pub struct WireReader<'d> {
    data: &'d [u8],
    position: usize,
}

impl<'d> WireReader<'d> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'d [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, size: usize) -> BoardObjResult<&'d [u8]> {
        if self.remaining() < size {
            return Err(BoardObjError::BufferTooSmall {
                required: self.position + size,
                available: self.data.len(),
            });
        }
        let slice = &self.data[self.position..self.position + size];
        self.position += size;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> BoardObjResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> BoardObjResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> BoardObjResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> BoardObjResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> BoardObjResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> BoardObjResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_slice(&mut self, size: usize) -> BoardObjResult<&'d [u8]> {
        self.take(size)
    }

    pub fn skip(&mut self, count: usize) -> BoardObjResult<()> {
        self.take(count).map(|_| ())
    }

    /// Read a mask of `capacity` bits stored as `ceil(capacity / 32)` words.
    pub fn read_mask(&mut self, capacity: usize) -> BoardObjResult<BoardObjMask> {
        let n = crate::consts::mask_words(capacity);
        let mut words = [0u32; MASK_MAX_WORDS];
        for word in words.iter_mut().take(n) {
            *word = self.read_u32()?;
        }
        let mut mask = BoardObjMask::new(capacity)?;
        mask.import_words(&words[..n], capacity)?;
        Ok(mask)
    }
}

/// Bounds-checked little-endian writer over a mutable byte slice.
pub struct WireWriter<'d> {
    data: &'d mut [u8],
    position: usize,
}

impl<'d> WireWriter<'d> {
    /// Start writing at the beginning of `data`.
    pub fn new(data: &'d mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> BoardObjResult<()> {
        if self.remaining() < bytes.len() {
            return Err(BoardObjError::BufferTooSmall {
                required: self.position + bytes.len(),
                available: self.data.len(),
            });
        }
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> BoardObjResult<()> {
        self.write_bytes(&[v])
    }

    pub fn write_bool(&mut self, v: bool) -> BoardObjResult<()> {
        self.write_u8(v as u8)
    }

    pub fn write_u16(&mut self, v: u16) -> BoardObjResult<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> BoardObjResult<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> BoardObjResult<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> BoardObjResult<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write `words` mask words, zero-filling past the mask's own words.
    pub fn write_mask(&mut self, mask: &BoardObjMask, words: usize) -> BoardObjResult<()> {
        let mut out = [0u32; MASK_MAX_WORDS];
        let out = out.get_mut(..words).ok_or(BoardObjError::CapacityExceeded {
            requested: words,
            capacity: MASK_MAX_WORDS,
        })?;
        mask.export_words(out)?;
        for w in out.iter() {
            self.write_u32(*w)?;
        }
        Ok(())
    }
}
