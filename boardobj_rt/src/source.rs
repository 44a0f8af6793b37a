//! Non-RPC group data sources.
//!
//! A source hands out the same header and entry data a Set would have read
//! from the shared surface, so groups can be built by the regular class
//! callbacks without a host command.
//!
//! The only kind today is the resident configuration table:
//!
//! ```text
//!   [0..4]    magic            b"BOBJ"
//!   [4]       version          1
//!   [5]       class_id
//!   [6]       group_type       capacity tier code
//!   [7]       reserved
//!   [8..10]   obj_slots        u16
//!   [10..12]  header_ext_size  u16
//!   [12..14]  entry_size       u16, including the 4-byte entry header
//!   [14..16]  entry_count      u16, <= obj_slots
//!   [16..]    header_ext_size bytes of class header fields
//!   [..]      entry_count entries; type 0 marks a disabled slot
//! ```

use boardobj::consts::ENTRY_HEADER_SIZE;
use boardobj::error::{BoardObjError, BoardObjResult};
use boardobj::ids::{BoardObjType, ClassId};
use boardobj::mask::BoardObjMask;
use boardobj::tier::GroupTier;
use boardobj::wire::{BoardObjGrpHeader, EntryHeader, GrpFlags, WireReader, WireWriter};

/// Resident table magic.
pub const RESIDENT_TABLE_MAGIC: [u8; 4] = *b"BOBJ";

/// Resident table format version.
pub const RESIDENT_TABLE_VERSION: u8 = 1;

/// Size of the fixed resident table header.
pub const RESIDENT_TABLE_HEADER_SIZE: usize = 16;

/// Source kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BoardObjGrpSrcKind {
    ResidentTable = 0x01,
}

impl BoardObjGrpSrcKind {
    /// Convert from raw `u8`. Returns `None` for unknown kinds.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ResidentTable),
            _ => None,
        }
    }

    /// Whether this kind is compiled in.
    #[inline]
    pub const fn is_enabled(self) -> bool {
        match self {
            Self::ResidentTable => cfg!(feature = "src-resident-table"),
        }
    }
}

/// Group header data from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardObjSrcHeader<'a> {
    /// Decoded header, INIT semantics.
    pub header: BoardObjGrpHeader,
    /// Class-specific header fields.
    pub ext: &'a [u8],
}

/// One entry from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardObjSrcEntry<'a> {
    /// Entry identity, `grp_idx` already set to the slot index.
    pub header: EntryHeader,
    /// Type-specific fields.
    pub fields: &'a [u8],
}

/// Tagged union over source kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardObjGrpSrc {
    ResidentTable(ResidentTable),
    /// A kind this build does not understand.
    Unsupported { kind: u8 },
}

impl BoardObjGrpSrc {
    /// Raw kind tag.
    pub fn kind(&self) -> u8 {
        match self {
            Self::ResidentTable(_) => BoardObjGrpSrcKind::ResidentTable as u8,
            Self::Unsupported { kind } => *kind,
        }
    }

    fn resident(&self) -> BoardObjResult<&ResidentTable> {
        match self {
            Self::ResidentTable(table) if BoardObjGrpSrcKind::ResidentTable.is_enabled() => {
                Ok(table)
            }
            _ => Err(BoardObjError::UnsupportedSource { kind: self.kind() }),
        }
    }

    /// Header data, as a Set header with INIT semantics.
    ///
    /// # Errors
    /// `UnsupportedSource` for an unknown or disabled kind.
    pub fn header_data_get(&self) -> BoardObjResult<BoardObjSrcHeader<'_>> {
        let table = self.resident()?;
        Ok(BoardObjSrcHeader {
            header: BoardObjGrpHeader::new(
                table.tier,
                table.class_id,
                table.obj_slots,
                GrpFlags::empty(),
                table.mask()?,
            ),
            ext: table.header_ext(),
        })
    }

    /// Entry data of slot `idx`.
    ///
    /// # Errors
    /// `UnsupportedSource` for an unknown or disabled kind, `CapacityExceeded`
    /// for an index beyond the entry count.
    pub fn entry_data_get(&self, idx: u16) -> BoardObjResult<BoardObjSrcEntry<'_>> {
        let table = self.resident()?;
        let entry = table.entry(idx)?;
        Ok(BoardObjSrcEntry {
            header: EntryHeader {
                obj_type: BoardObjType(entry[0]),
                grp_idx: idx,
            },
            fields: &entry[ENTRY_HEADER_SIZE..],
        })
    }

    /// Number of entries, including disabled ones.
    pub fn num_entries_get(&self) -> BoardObjResult<u16> {
        Ok(self.resident()?.entry_count)
    }

    /// Class the source describes.
    pub fn class_id(&self) -> BoardObjResult<ClassId> {
        Ok(self.resident()?.class_id)
    }
}

// ─── Resident tables ────────────────────────────────────────────────

/// Validated resident configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentTable {
    class_id: ClassId,
    tier: GroupTier,
    obj_slots: u16,
    ext_size: usize,
    entry_size: usize,
    entry_count: u16,
    bytes: Vec<u8>,
}

impl ResidentTable {
    /// Validate a table image.
    ///
    /// # Errors
    /// - Argument: bad magic, version or entry size.
    /// - State: unknown or disabled tier.
    /// - Range: counts beyond capacity, image shorter than declared.
    pub fn parse(bytes: Vec<u8>) -> BoardObjResult<Self> {
        let mut r = WireReader::new(&bytes);
        if r.read_slice(4)? != RESIDENT_TABLE_MAGIC {
            return Err(BoardObjError::InvalidArgument {
                reason: "bad resident table magic",
            });
        }
        if r.read_u8()? != RESIDENT_TABLE_VERSION {
            return Err(BoardObjError::InvalidArgument {
                reason: "unsupported resident table version",
            });
        }
        let class_id = ClassId(r.read_u8()?);
        let raw_tier = r.read_u8()?;
        r.skip(1)?;
        let obj_slots = r.read_u16()?;
        let ext_size = r.read_u16()? as usize;
        let entry_size = r.read_u16()? as usize;
        let entry_count = r.read_u16()?;

        let tier = GroupTier::from_u8(raw_tier).ok_or(BoardObjError::UnsupportedTier { raw: raw_tier })?;
        let capacity = tier.capacity()?;
        if obj_slots as usize > capacity {
            return Err(BoardObjError::CapacityExceeded {
                requested: obj_slots as usize,
                capacity,
            });
        }
        if entry_count > obj_slots {
            return Err(BoardObjError::CapacityExceeded {
                requested: entry_count as usize,
                capacity: obj_slots as usize,
            });
        }
        if entry_size < ENTRY_HEADER_SIZE {
            return Err(BoardObjError::InvalidArgument {
                reason: "resident entry size below entry header",
            });
        }
        let required = RESIDENT_TABLE_HEADER_SIZE + ext_size + entry_count as usize * entry_size;
        if bytes.len() < required {
            return Err(BoardObjError::BufferTooSmall {
                required,
                available: bytes.len(),
            });
        }

        Ok(Self {
            class_id,
            tier,
            obj_slots,
            ext_size,
            entry_size,
            entry_count,
            bytes,
        })
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    #[inline]
    pub fn tier(&self) -> GroupTier {
        self.tier
    }

    #[inline]
    pub fn obj_slots(&self) -> u16 {
        self.obj_slots
    }

    #[inline]
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    #[inline]
    pub fn entry_count(&self) -> u16 {
        self.entry_count
    }

    /// Raw table image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn header_ext(&self) -> &[u8] {
        &self.bytes[RESIDENT_TABLE_HEADER_SIZE..RESIDENT_TABLE_HEADER_SIZE + self.ext_size]
    }

    fn entry(&self, idx: u16) -> BoardObjResult<&[u8]> {
        if idx >= self.entry_count {
            return Err(BoardObjError::CapacityExceeded {
                requested: idx as usize + 1,
                capacity: self.entry_count as usize,
            });
        }
        let start =
            RESIDENT_TABLE_HEADER_SIZE + self.ext_size + idx as usize * self.entry_size;
        Ok(&self.bytes[start..start + self.entry_size])
    }

    /// Slots whose entry is enabled.
    fn mask(&self) -> BoardObjResult<BoardObjMask> {
        let mut mask = BoardObjMask::for_tier(self.tier)?;
        for idx in 0..self.entry_count {
            if !BoardObjType(self.entry(idx)?[0]).is_base() {
                mask.set(idx)?;
            }
        }
        Ok(mask)
    }
}

/// Builds resident table images for tooling and tests.
#[derive(Debug, Clone)]
pub struct ResidentTableBuilder {
    class_id: ClassId,
    tier: GroupTier,
    obj_slots: u16,
    entry_size: usize,
    ext: Vec<u8>,
    entries: Vec<(BoardObjType, Vec<u8>)>,
}

impl ResidentTableBuilder {
    pub fn new(class_id: ClassId, tier: GroupTier, obj_slots: u16, entry_size: usize) -> Self {
        Self {
            class_id,
            tier,
            obj_slots,
            entry_size,
            ext: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Class-specific header fields.
    pub fn header_ext(mut self, ext: &[u8]) -> Self {
        self.ext = ext.to_vec();
        self
    }

    /// Append an enabled entry for the next slot.
    pub fn entry(mut self, obj_type: BoardObjType, fields: &[u8]) -> Self {
        self.entries.push((obj_type, fields.to_vec()));
        self
    }

    /// Append a disabled entry for the next slot.
    pub fn disabled(mut self) -> Self {
        self.entries.push((BoardObjType::BASE, Vec::new()));
        self
    }

    /// Serialize and validate.
    pub fn build(self) -> BoardObjResult<ResidentTable> {
        let count = u16::try_from(self.entries.len()).map_err(|_| BoardObjError::CapacityExceeded {
            requested: self.entries.len(),
            capacity: u16::MAX as usize,
        })?;
        let size = RESIDENT_TABLE_HEADER_SIZE + self.ext.len() + self.entries.len() * self.entry_size;
        let mut bytes = vec![0u8; size];
        let mut w = WireWriter::new(&mut bytes);
        w.write_bytes(&RESIDENT_TABLE_MAGIC)?;
        w.write_u8(RESIDENT_TABLE_VERSION)?;
        w.write_u8(self.class_id.raw())?;
        w.write_u8(self.tier as u8)?;
        w.write_u8(0)?;
        w.write_u16(self.obj_slots)?;
        w.write_u16(self.ext.len() as u16)?;
        w.write_u16(self.entry_size as u16)?;
        w.write_u16(count)?;
        w.write_bytes(&self.ext)?;

        let mut entry = vec![0u8; self.entry_size];
        for (idx, (obj_type, fields)) in self.entries.iter().enumerate() {
            if ENTRY_HEADER_SIZE + fields.len() > self.entry_size {
                return Err(BoardObjError::BufferTooSmall {
                    required: ENTRY_HEADER_SIZE + fields.len(),
                    available: self.entry_size,
                });
            }
            entry.fill(0);
            EntryHeader {
                obj_type: *obj_type,
                grp_idx: idx as u16,
            }
            .encode(&mut entry)?;
            entry[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + fields.len()].copy_from_slice(fields);
            w.write_bytes(&entry)?;
        }
        ResidentTable::parse(bytes)
    }
}
