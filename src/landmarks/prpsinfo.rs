//! NT_PRPSINFO, i.e. struct elf_prpsinfo from include/linux/elfcore.h.
use crate::elf::{ByteRange, Reader, Word};
use crate::error::{PargsError, Result};
use tracing::debug;

/// pr_fname is a fixed size char array.
pub const FNAME_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PrPsInfo {
    pub pid: u32,

    /// pr_fname without the null padding.
    pub fname: ByteRange,
}

/// Some 32-bit ABIs use 4-byte uids and gids in elf_prpsinfo which moves everything
/// after pr_flag down by 4 bytes. Those are recognized by the size of the note.
pub fn parse_prpsinfo<W: Word>(reader: &Reader, desc: ByteRange) -> Result<PrPsInfo> {
    let layout = &W::LAYOUT.prpsinfo;
    let extra = if desc.len() == layout.size + 4 { 4 } else { 0 };
    if desc.len() < layout.size {
        return Err(PargsError::format("prpsinfo section overflows"));
    }

    let pid: u32 = reader.read(desc.begin + layout.pid + extra)?;
    let begin = desc.begin + layout.fname + extra;
    let fname = reader.slice(ByteRange {
        begin,
        end: begin + FNAME_LEN,
    })?;
    let len = memchr::memchr(0, fname).unwrap_or(FNAME_LEN);
    debug!(
        "prpsinfo: pid {pid}, fname {:?}",
        String::from_utf8_lossy(&fname[..len])
    );

    Ok(PrPsInfo {
        pid,
        fname: ByteRange {
            begin,
            end: begin + len,
        },
    })
}
