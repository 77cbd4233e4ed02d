//! Landmarks are the handful of locations in a core file needed to print the command
//! line, environment, and auxiliary vector of the process that dumped core. Most of
//! them come from the NOTE segment, argv and envp have to be dug out of the stack.
pub mod auxv;
pub mod prpsinfo;
pub mod vectors;

pub use auxv::{AuxEntry, AuxRef, RefKind};

use crate::elf::{
    ByteRange, EM_386, EM_X86_64, ElfClass, ElfHeader, Endian, Ident, NoteType, Notes, Reader,
    SegmentType, Word, program_headers,
};
use crate::error::{PargsError, Result};
use crate::utils;
use memchr::memchr;
use tracing::debug;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Landmarks<'a> {
    reader: Reader<'a>,

    /// 32 or 64.
    pub word_size: u8,

    pub endian: Endian,

    /// True if the core was written on a machine with a different byte order.
    pub need_to_swap: bool,

    /// e_machine
    pub machine: u16,

    /// From NT_PRPSINFO, zero if that note is missing.
    pub pid: u32,

    /// pr_fname from NT_PRPSINFO.
    pub fname: Option<ByteRange>,

    /// Virtual address of the exec filename (AT_EXECFN).
    pub execfn_addr: u64,

    /// The auxv pairs within the NT_AUXV note.
    pub auxv_note: ByteRange,

    /// The LOAD segment holding the startup stack.
    pub vector_section: ByteRange,

    /// Virtual address of vector_section.begin.
    pub vector_base_addr: u64,

    /// The argv pointers within vector_section.
    pub argv: ByteRange,

    /// The envp pointers within vector_section.
    pub envp: ByteRange,

    pub argc: u64,
}

impl<'a> Landmarks<'a> {
    /// bytes is normally a memory mapped core file.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let ident = Ident::new(bytes)?;
        let reader = Reader::new(bytes, ident.endian);
        match ident.class {
            ElfClass::Elf32 => Landmarks::walk::<u32>(reader),
            ElfClass::Elf64 => Landmarks::walk::<u64>(reader),
        }
    }

    fn empty(reader: Reader<'a>, word_size: u8, machine: u16) -> Self {
        Landmarks {
            reader,
            word_size,
            endian: reader.endian,
            need_to_swap: reader.need_to_swap(),
            machine,
            pid: 0,
            fname: None,
            execfn_addr: 0,
            auxv_note: ByteRange::default(),
            vector_section: ByteRange::default(),
            vector_base_addr: 0,
            argv: ByteRange::default(),
            envp: ByteRange::default(),
            argc: 0,
        }
    }

    // Notes can come before or after the stack segment so we need two passes over
    // the program headers.
    fn walk<W: Word>(reader: Reader<'a>) -> Result<Self> {
        let header = ElfHeader::new::<W>(&reader)?;
        let mut landmarks = Landmarks::empty(reader, W::BITS, header.machine);

        for segment in program_headers::<W>(reader, &header) {
            let segment = segment?;
            if segment.stype == SegmentType::Note {
                debug!("segment {} is a NOTE segment", segment.index);
                landmarks.read_notes::<W>(segment.obytes)?;
            }
        }
        utils::require(landmarks.execfn_addr != 0, "no executable filename found")?;

        let mut stack = None;
        for segment in program_headers::<W>(reader, &header) {
            let segment = segment?;
            if segment.stype == SegmentType::Load && segment.contains_vaddr(landmarks.execfn_addr)
            {
                stack = Some(segment);
                break;
            }
        }
        let stack = stack.ok_or_else(|| {
            PargsError::format("no LOAD segment contains the exec filename")
        })?;
        debug!(
            "segment {} at {:#x} has the exec filename",
            stack.index, stack.vaddr
        );

        let vectors = vectors::find_vectors::<W>(&reader, &stack, landmarks.execfn_addr)?;
        landmarks.vector_section = stack.obytes;
        landmarks.vector_base_addr = stack.vaddr;
        landmarks.argv = vectors.argv;
        landmarks.envp = vectors.envp;
        landmarks.argc = vectors.argc;
        Ok(landmarks)
    }

    fn read_notes<W: Word>(&mut self, segment: ByteRange) -> Result<()> {
        for note in Notes::new(self.reader, segment) {
            let note = note?;
            match note.note_type() {
                Some(NoteType::AuxV) => {
                    self.execfn_addr = auxv::find_execfn::<W>(&self.reader, note.desc)?;
                    self.auxv_note = note.desc;
                    debug!("AT_EXECFN is {:#x}", self.execfn_addr);
                }
                Some(NoteType::PrPsInfo) => {
                    let info = prpsinfo::parse_prpsinfo::<W>(&self.reader, note.desc)?;
                    self.pid = info.pid;
                    self.fname = Some(info.fname);
                }
                _ => debug!("skipping note type {:#x}", note.ntype),
            }
        }
        Ok(())
    }

    /// Whether the AT_HWCAP bits can be named.
    pub fn is_x86(&self) -> bool {
        matches!(self.machine, EM_386 | EM_X86_64)
    }

    pub fn fname(&self) -> Option<&'a [u8]> {
        self.fname.and_then(|range| self.reader.slice(range).ok())
    }

    pub fn execfn(&self) -> Result<&'a [u8]> {
        self.string_at(self.execfn_addr)
    }

    /// The null terminated string at addr within the stack segment (without the null).
    pub fn string_at(&self, addr: u64) -> Result<&'a [u8]> {
        let bytes = self.reader.slice(self.vector_section)?;
        let offset = self.offset_of(addr, 1)?;
        let len = memchr(0, &bytes[offset..]).ok_or_else(|| {
            PargsError::format(format!("string at {addr:#x} isn't null-terminated"))
        })?;
        Ok(&bytes[offset..offset + len])
    }

    /// The len bytes at addr within the stack segment.
    pub fn bytes_at(&self, addr: u64, len: usize) -> Result<&'a [u8]> {
        let bytes = self.reader.slice(self.vector_section)?;
        let offset = self.offset_of(addr, len)?;
        Ok(&bytes[offset..offset + len])
    }

    fn offset_of(&self, addr: u64, len: usize) -> Result<usize> {
        let offset = addr.checked_sub(self.vector_base_addr).ok_or_else(|| {
            PargsError::format(format!("address {addr:#x} underflows the stack segment"))
        })?;
        usize::try_from(offset)
            .ok()
            .filter(|offset| {
                offset
                    .checked_add(len)
                    .is_some_and(|end| end <= self.vector_section.len())
            })
            .ok_or_else(|| {
                PargsError::format(format!("address {addr:#x} overflows the stack segment"))
            })
    }

    /// Reads a pointer sized word at a file offset.
    pub fn word_at(&self, offset: usize) -> Result<u64> {
        if self.word_size == 32 {
            Ok(self.reader.read::<u32>(offset)? as u64)
        } else {
            self.reader.read::<u64>(offset)
        }
    }

    pub fn argv(&self) -> Strings<'_, 'a> {
        Strings::new(self, self.argv)
    }

    pub fn envp(&self) -> Strings<'_, 'a> {
        Strings::new(self, self.envp)
    }

    /// The auxv pairs from the note, the AT_NULL sentinel isn't included.
    pub fn auxv(&self) -> Result<Vec<(u64, u64)>> {
        if self.word_size == 32 {
            auxv::read_pairs::<u32>(&self.reader, self.auxv_note)
        } else {
            auxv::read_pairs::<u64>(&self.reader, self.auxv_note)
        }
    }

    /// auxv along with the values its entries point to.
    pub fn auxv_entries(&self) -> Result<Vec<AuxEntry>> {
        Ok(self
            .auxv()?
            .into_iter()
            .map(|(key, value)| AuxEntry {
                key,
                value,
                reference: self.resolve_aux(key, value),
            })
            .collect())
    }

    /// For auxv keys whose values point to strings or bytes returns what they point
    /// to. None for all other keys.
    pub fn resolve_aux(&self, key: u64, value: u64) -> Option<Result<AuxRef>> {
        auxv::ref_kind(key).map(|kind| match kind {
            RefKind::Str => self.string_at(value).map(|s| AuxRef::Str(s.to_vec())),
            RefKind::Bytes(len) => self.bytes_at(value, len).map(|b| AuxRef::Bytes(b.to_vec())),
        })
    }
}

/// The strings an argv or envp pointer array points to.
pub struct Strings<'l, 'a> {
    landmarks: &'l Landmarks<'a>,
    offset: usize,
    end: usize,
}

impl<'l, 'a> Strings<'l, 'a> {
    fn new(landmarks: &'l Landmarks<'a>, pointers: ByteRange) -> Self {
        Strings {
            landmarks,
            offset: pointers.begin,
            end: pointers.end,
        }
    }
}

impl<'a> Iterator for Strings<'_, 'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        let addr = self.landmarks.word_at(self.offset);
        self.offset += self.landmarks.word_size as usize / 8;
        Some(addr.and_then(|addr| self.landmarks.string_at(addr)))
    }
}
