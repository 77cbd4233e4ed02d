//! Program headers. For core files these describe the NOTE segment(s) and the LOAD
//! segments that hold the memory of the process.
use super::{ByteRange, ElfHeader, Reader, Word};
use crate::error::{PargsError, Result};

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;

/// Kernel written cores only have NOTE and LOAD segments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentType {
    /// A chunk of the process's memory.
    Load,

    /// Process status, auxv, memory mapped files, etc.
    Note,

    /// p_type of anything else.
    Other(u32),
}

impl SegmentType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            PT_LOAD => SegmentType::Load,
            PT_NOTE => SegmentType::Note,
            _ => SegmentType::Other(value),
        }
    }
}

/// The fields of Elf32_Phdr or Elf64_Phdr that the landmark walk uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProgramHeader {
    /// Position within the program header table.
    pub index: u64,

    pub stype: SegmentType,

    /// The bytes of the segment within the core file (p_offset and p_filesz).
    pub obytes: ByteRange,

    /// Virtual address of the first byte in the segment.
    pub vaddr: u64,
}

impl ProgramHeader {
    pub fn new<W: Word>(reader: &Reader, offset: usize, index: u64) -> Result<Self> {
        let layout = W::LAYOUT;
        let entry = ByteRange::with_len(offset, layout.phdr_size)
            .filter(|r| r.end <= reader.len())
            .ok_or_else(|| PargsError::format(format!("program header {index} overflows")))?;

        let p_offset = reader.read::<W>(entry.begin + layout.p_offset)?.to_u64();
        let p_filesz = reader.read::<W>(entry.begin + layout.p_filesz)?.to_u64();
        let obytes = reader
            .range(p_offset, p_filesz)
            .ok_or_else(|| PargsError::format(format!("segment {index} overflows")))?;
        let p_type: u32 = reader.read(entry.begin + layout.p_type)?;
        let p_vaddr = reader.read::<W>(entry.begin + layout.p_vaddr)?.to_u64();

        Ok(ProgramHeader {
            index,
            stype: SegmentType::from_u32(p_type),
            obytes,
            vaddr: p_vaddr,
        })
    }

    /// True if addr falls within the part of the segment that was written to the core.
    pub fn contains_vaddr(&self, addr: u64) -> bool {
        match self.vaddr.checked_add(self.obytes.len() as u64) {
            Some(end) => addr >= self.vaddr && addr < end,
            None => addr >= self.vaddr,
        }
    }
}

/// Iterates over the program header table. Even a large core file has a small number
/// of program headers so it's fine to iterate more than once.
pub fn program_headers<W: Word>(
    reader: Reader<'_>,
    header: &ElfHeader,
) -> impl Iterator<Item = Result<ProgramHeader>> {
    let ph_offset = header.ph_offset;
    let entry_size = header.ph_entry_size;
    (0..header.num_ph_entries).map(move |i| {
        // ElfHeader::new already checked that the whole table is within the file.
        let offset = i
            .checked_mul(entry_size)
            .and_then(|delta| delta.checked_add(ph_offset))
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(|| PargsError::format(format!("program header {i} overflows")))?;
        ProgramHeader::new::<W>(&reader, offset, i)
    })
}
