//! Finds argc, argv, and envp in the memory of the startup stack. None of these are
//! recorded in the core file itself so this relies on how the kernel sets up the stack
//! of a new process (see create_elf_tables in fs/binfmt_elf.c). From high to low
//! addresses:
//! * The exec filename (AT_EXECFN points here).
//! * The envp strings and then the argv strings.
//! * Platform strings and the AT_RANDOM bytes.
//! * The auxv pairs.
//! * The envp pointers followed by a null word.
//! * The argv pointers followed by a null word.
//! * argc.
//!
//! So we work backwards from the exec filename. This is a heuristic: odd launchers can
//! produce stacks that don't match and then we fail rather than guess.
use crate::elf::{ByteRange, ProgramHeader, Reader, Word, aligned_rfind};
use crate::error::{PargsError, Result};
use crate::utils;
use memchr::{memchr, memrchr};
use tracing::debug;

/// Maximum number of trailing envp pointers used to find the end of envp.
pub const TAIL_LEN: usize = 4;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Vectors {
    /// The argv pointers, the null terminator isn't included.
    pub argv: ByteRange,

    /// The envp pointers, the null terminator isn't included.
    pub envp: ByteRange,

    pub argc: u64,
}

pub fn find_vectors<W: Word>(
    reader: &Reader,
    segment: &ProgramHeader,
    execfn_addr: u64,
) -> Result<Vectors> {
    let bytes = reader.slice(segment.obytes)?;
    let base = segment.vaddr;
    let ws = W::SIZE;

    let execfn = execfn_addr
        .checked_sub(base)
        .ok_or_else(|| PargsError::format("exec filename underflows section"))?;
    let execfn = usize::try_from(execfn)
        .ok()
        .filter(|&offset| offset < bytes.len())
        .ok_or_else(|| PargsError::format("exec filename overflows section"))?;
    let len = memchr(0, &bytes[execfn..])
        .ok_or_else(|| PargsError::format("exec filename isn't null-terminated"))?;
    debug!(
        "exec filename at {execfn_addr:#x}: {:?}",
        String::from_utf8_lossy(&bytes[execfn..execfn + len])
    );

    // Work backwards through the strings before execfn and build the byte pattern
    // the pointers to those strings would form.
    let starts = string_starts(bytes, execfn, TAIL_LEN);
    utils::require(!starts.is_empty(), "underflow in envp tail search")?;
    let mut addrs = Vec::with_capacity(starts.len());
    for &start in starts.iter() {
        let addr = base
            .checked_add(start as u64)
            .and_then(W::from_u64)
            .ok_or_else(|| PargsError::format("string address doesn't fit in a word"))?;
        addrs.push(addr);
    }

    // Search for the pointers followed by the null that ends envp. Fewer than
    // TAIL_LEN env strings means the longer patterns straddle argv so shrink it
    // until something matches.
    let haystack = &bytes[..execfn / ws * ws];
    let (tail, count) = (1..=addrs.len())
        .rev()
        .find_map(|count| {
            let pattern = tail_pattern(reader, &addrs[..count]);
            aligned_rfind(haystack, &pattern, ws).map(|offset| (offset, count))
        })
        .ok_or_else(|| PargsError::format("can't find envp tail"))?;
    let terminator = tail + count * ws;
    debug!("found {count} envp tail pointers at {tail:#x}");

    // With no environment the pattern matches the end of argv and the word after
    // the terminator is the (null) envp terminator. Otherwise it's the first auxv key
    // which can't be AT_NULL.
    let after = read_word::<W>(reader, segment.obytes.begin + terminator + ws)?;
    let (argv_end, envp) = if after == 0 {
        debug!("envp is empty");
        (
            terminator,
            ByteRange {
                begin: terminator + ws,
                end: terminator + ws,
            },
        )
    } else {
        let argv_end = aligned_rfind(&bytes[..tail], &vec![0; ws], ws)
            .ok_or_else(|| PargsError::format("can't find argv tail"))?;
        (
            argv_end,
            ByteRange {
                begin: argv_end + ws,
                end: terminator,
            },
        )
    };

    // argc is the first word before argv that isn't a pointer into the strings.
    let strings = base.saturating_add(envp.end as u64)..base.saturating_add(bytes.len() as u64);
    let mut found = None;
    let mut offset = argv_end;
    while offset >= ws {
        offset -= ws;
        let word = read_word::<W>(reader, segment.obytes.begin + offset)?;
        if !strings.contains(&word) {
            found = Some((offset, word));
            break;
        }
    }
    let (argc_offset, argc) = found.ok_or_else(|| PargsError::format("didn't find argc"))?;
    utils::require(argc != 0, "didn't find argc")?;
    let count = ((argv_end - argc_offset) / ws - 1) as u64;
    utils::require(
        argc == count,
        &format!("argc is {argc} but there are {count} argv pointers"),
    )?;
    debug!("argc is {argc} at {argc_offset:#x}");

    let begin = segment.obytes.begin;
    Ok(Vectors {
        argv: ByteRange {
            begin: begin + argc_offset + ws,
            end: begin + argv_end,
        },
        envp: ByteRange {
            begin: begin + envp.begin,
            end: begin + envp.end,
        },
        argc,
    })
}

/// Offsets of up to max strings ending just before offset, closest first. Strings
/// may be empty.
fn string_starts(bytes: &[u8], offset: usize, max: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut p = offset;
    while starts.len() < max && p >= 2 && bytes[p - 1] == 0 {
        match memrchr(0, &bytes[..p - 1]) {
            Some(i) => p = i + 1,
            None => break,
        }
        starts.push(p);
    }
    starts
}

/// The pointers in memory order (the reverse of addrs) plus a null word.
fn tail_pattern<W: Word>(reader: &Reader, addrs: &[W]) -> Vec<u8> {
    let mut pattern: Vec<u8> = addrs
        .iter()
        .rev()
        .flat_map(|addr| addr.to_bytes(reader.endian))
        .collect();
    pattern.extend(W::default().to_bytes(reader.endian));
    pattern
}

fn read_word<W: Word>(reader: &Reader, offset: usize) -> Result<u64> {
    Ok(reader.read::<W>(offset)?.to_u64())
}
