//! The various notes in a NOTE segment. These provide information about the process and
//! not all may be present.
use super::{ByteRange, Reader, Stream};
use crate::error::{PargsError, Result};
use crate::utils;

/// Size of Elf32_Nhdr and Elf64_Nhdr (they are identical).
pub const NOTE_HEADER_SIZE: usize = 3 * 4;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NoteType {
    /// Process state info, e.g. whether it's running, sleeping, or a zombie. Also the pid
    /// and a truncated name and argument list for the executable. See elf_prpsinfo in
    /// include/uapi/linux/elfcore.h.
    PrPsInfo,

    /// A copy of the auxiliary vector the kernel handed the process.
    AuxV,
}

impl NoteType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            3 => Some(NoteType::PrPsInfo),
            6 => Some(NoteType::AuxV),
            _ => None,
        }
    }
}

/// A single note. Only used while walking the notes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Note {
    /// Owner name, e.g. "CORE" or "LINUX", including the null terminator.
    pub name: ByteRange,

    /// The payload, layout depends on ntype.
    pub desc: ByteRange,

    /// The raw n_type, see NoteType.
    pub ntype: u32,
}

impl Note {
    pub fn note_type(&self) -> Option<NoteType> {
        NoteType::from_u32(self.ntype)
    }
}

/// Reads the index'th note. Note headers are always three 4-byte words, the name and
/// desc that follow are each padded to 4 bytes.
pub fn read_note(s: &mut Stream, index: usize) -> Result<Note> {
    let overflow = || PargsError::format(format!("note {index} overflows NOTE section"));
    if s.remaining() < NOTE_HEADER_SIZE {
        return Err(overflow());
    }
    let n_namesz: u32 = s.read()?;
    let n_descsz: u32 = s.read()?;
    let n_type: u32 = s.read()?;

    let aligned_name = utils::align_to_word(n_namesz).ok_or_else(overflow)?;
    let needed = aligned_name as u64 + n_descsz as u64;
    if needed > s.remaining() as u64 {
        return Err(overflow());
    }

    let name = s.take(aligned_name as usize)?;
    let name = ByteRange {
        begin: name.begin,
        end: name.begin + n_namesz as usize,
    };
    let desc = s.take(n_descsz as usize)?;
    s.skip(desc.len().next_multiple_of(4) - desc.len());

    Ok(Note {
        name,
        desc,
        ntype: n_type,
    })
}

/// Iterates over the notes within a NOTE segment. Iteration stops after the first
/// error.
pub struct Notes<'a> {
    stream: Stream<'a>,
    index: usize,
    failed: bool,
}

impl<'a> Notes<'a> {
    pub fn new(reader: Reader<'a>, segment: ByteRange) -> Self {
        Notes {
            stream: Stream::new(reader, segment),
            index: 0,
            failed: false,
        }
    }
}

impl Iterator for Notes<'_> {
    type Item = Result<Note>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.stream.at_end() {
            return None;
        }
        let result = read_note(&mut self.stream, self.index);
        self.index += 1;
        self.failed = result.is_err();
        Some(result)
    }
}
