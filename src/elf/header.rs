//! The ELF header at the start of the file. We only need enough of it to find the
//! program headers.
use super::{Endian, Reader, Word};
use crate::error::{PargsError, Result};
use crate::utils;
use tracing::debug;

/// e_type for core files.
pub const ET_CORE: u16 = 4;

/// e_phnum value meaning the real number of program headers didn't fit, see elf(5).
pub const PN_XNUM: u16 = 0xffff;

/// e_machine values whose AT_HWCAP bits we know how to name.
pub const EM_386: u16 = 3;
pub const EM_X86_64: u16 = 62;

const EI_NIDENT: usize = 16;
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const E_MACHINE: usize = 18; // same place in both classes

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    pub fn word_size(self) -> u8 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }
}

/// The class independent part of the header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ident {
    pub class: ElfClass,
    pub endian: Endian,
}

impl Ident {
    pub fn new(bytes: &[u8]) -> Result<Self> {
        utils::require(bytes.len() >= EI_NIDENT, "file is too small for an ELF header")?;
        utils::require(
            bytes[0..4] == [0x7f, b'E', b'L', b'F'],
            "couldn't find ELF magic",
        )?;
        let class = match bytes[EI_CLASS] {
            1 => ElfClass::Elf32,
            2 => ElfClass::Elf64,
            c => return Err(PargsError::format(format!("unknown ELF class: {c}"))),
        };
        let endian = match bytes[EI_DATA] {
            1 => Endian::Little,
            2 => Endian::Big,
            d => return Err(PargsError::format(format!("unknown byte order: {d}"))),
        };
        debug!("{}-bit ELF file, {endian} endian", class.word_size());
        Ok(Ident { class, endian })
    }
}

/// The parts of a core file's ELF header needed to walk the program headers.
pub struct ElfHeader {
    /// Architecture of the process that cored, e.g. EM_X86_64.
    pub machine: u16,

    /// Offset in the ELF file to the program header table.
    pub ph_offset: u64,

    /// Size of each program header, may be larger than the Elf*_Phdr struct.
    pub ph_entry_size: u64,

    /// Number of program headers with PN_XNUM already resolved.
    pub num_ph_entries: u64,
}

impl ElfHeader {
    pub fn new<W: Word>(reader: &Reader) -> Result<Self> {
        let layout = W::LAYOUT;
        utils::require(
            reader.len() >= layout.ehdr_size,
            &format!("file is too small for an ELF{} header", W::BITS),
        )?;

        let etype: u16 = reader.read(layout.e_type)?;
        utils::require(etype == ET_CORE, "not a core file")?;
        let machine: u16 = reader.read(E_MACHINE)?;

        let first_count: u16 = reader.read(layout.e_phnum)?;
        debug!("{first_count} segments");
        utils::require(first_count != 0, "file has no segments")?;

        let ph_offset = reader.read::<W>(layout.e_phoff)?.to_u64();
        let ph_entry_size = reader.read::<u16>(layout.e_phentsize)? as u64;
        utils::require(
            ph_entry_size >= layout.phdr_size as u64,
            &format!("program header entry size is too small: {ph_entry_size}"),
        )?;
        utils::require(
            reader.range(ph_offset, ph_entry_size).is_some(),
            "program header table overflows",
        )?;

        let mut num_ph_entries = first_count as u64;
        if first_count == PN_XNUM {
            num_ph_entries = ElfHeader::extended_count::<W>(reader)?;
            debug!("file has more than 2**16-1 segments: {num_ph_entries}");
            utils::require(num_ph_entries != 0, "file has no segments")?;
        }

        let table_size = num_ph_entries
            .checked_mul(ph_entry_size)
            .ok_or_else(|| PargsError::format("program header table overflows"))?;
        utils::require(
            reader.range(ph_offset, table_size).is_some(),
            "program header table overflows",
        )?;

        Ok(ElfHeader {
            machine,
            ph_offset,
            ph_entry_size,
            num_ph_entries,
        })
    }

    /// With PN_XNUM the real count lives in sh_info of the first section header.
    fn extended_count<W: Word>(reader: &Reader) -> Result<u64> {
        let layout = W::LAYOUT;
        let sh_offset = reader.read::<W>(layout.e_shoff)?.to_u64();
        let sh_entry_size = reader.read::<u16>(layout.e_shentsize)? as usize;
        utils::require(
            sh_offset != 0 && sh_entry_size >= layout.shdr_size,
            "PN_XNUM is used but there is no section header",
        )?;
        let section = reader
            .range(sh_offset, layout.shdr_size as u64)
            .ok_or_else(|| PargsError::format("section header [0] overflows"))?;
        let count: u32 = reader.read(section.begin + layout.sh_info)?;
        Ok(count as u64)
    }
}
