//! The auxiliary vector: key/value pairs the kernel puts on the stack of a new process
//! (and saves into the auxv note of a core). See getauxval(3) and
//! include/uapi/linux/auxvec.h.
use crate::elf::{ByteRange, Reader, Stream, Word};
use crate::error::{PargsError, Result};
use crate::utils;
use std::fmt;

pub const AT_NULL: u64 = 0;
pub const AT_PAGESZ: u64 = 6;
pub const AT_UID: u64 = 11;
pub const AT_EUID: u64 = 12;
pub const AT_GID: u64 = 13;
pub const AT_EGID: u64 = 14;
pub const AT_PLATFORM: u64 = 15;
pub const AT_HWCAP: u64 = 16;
pub const AT_CLKTCK: u64 = 17;
pub const AT_SECURE: u64 = 23;
pub const AT_BASE_PLATFORM: u64 = 24;
pub const AT_RANDOM: u64 = 25;
pub const AT_EXECFN: u64 = 31;

/// Number of bytes AT_RANDOM points to.
pub const RANDOM_LEN: usize = 16;

/// Names and descriptions indexed by key. Keys past the end print as unk_N.
const AUXV_TYPES: [(&str, &str); 38] = [
    ("AT_NULL", "End of vector"),
    ("AT_IGNORE", "Entry should be ignored"),
    ("AT_EXECFD", "File descriptor of program"),
    ("AT_PHDR", "Program headers for program"),
    ("AT_PHENT", "Size of program header entry"),
    ("AT_PHNUM", "Number of program headers"),
    ("AT_PAGESZ", "System page size"),
    ("AT_BASE", "Base address of interpreter"),
    ("AT_FLAGS", "Flags"),
    ("AT_ENTRY", "Entry point of program"),
    ("AT_NOTELF", "Program is not ELF"),
    ("AT_UID", "Real uid"),
    ("AT_EUID", "Effective uid"),
    ("AT_GID", "Real gid"),
    ("AT_EGID", "Effective gid"),
    ("AT_PLATFORM", "String identifying platform"),
    ("AT_HWCAP", "CPU capabilities hints"),
    ("AT_CLKTCK", "Frequency of times()"),
    ("AT_FPUCW", "Used FPU control word"),
    ("AT_DCACHEBSIZE", "Data cache block size"),
    ("AT_ICACHEBSIZE", "Instruction cache block size"),
    ("AT_UCACHEBSIZE", "Unified cache block size"),
    ("AT_IGNOREPPC", "Entry should be ignored"),
    ("AT_SECURE", "Boolean, was exec setuid-like?"),
    ("AT_BASE_PLATFORM", "String identifying real platforms"),
    ("AT_RANDOM", "Address of 16 random bytes"),
    ("AT_HWCAP2", "More CPU capabilities hints"),
    ("unk_27", ""),
    ("unk_28", ""),
    ("unk_29", ""),
    ("unk_30", ""),
    ("AT_EXECFN", "Filename of executable"),
    ("AT_SYSINFO", ""),
    ("AT_SYSINFO_EHDR", ""),
    ("AT_L1I_CACHESHAPE", ""),
    ("AT_L1D_CACHESHAPE", ""),
    ("AT_L2_CACHESHAPE", ""),
    ("AT_L3_CACHESHAPE", ""),
];

/// AT_HWCAP bits on x86, from arch/x86/include/asm/cpufeatures.h.
const X86_HWCAP: [&str; 32] = [
    "fpu", "vme", "de", "pse", "tsc", "msr", "pae", "mce", "cx8", "apic", "unk_10", "sep", "mtrr",
    "pge", "mca", "cmov", "pat", "pse36", "pn", "clflush", "unk_20", "dts", "acpi", "mmx", "fxsr",
    "sse", "sse2", "ss", "ht", "tm", "ia64", "pbe",
];

pub fn key_name(key: u64) -> String {
    match usize::try_from(key).ok().and_then(|k| AUXV_TYPES.get(k)) {
        Some((name, _)) => name.to_string(),
        None => format!("unk_{key}"),
    }
}

pub fn key_description(key: u64) -> Option<&'static str> {
    usize::try_from(key)
        .ok()
        .and_then(|k| AUXV_TYPES.get(k))
        .map(|(_, desc)| *desc)
        .filter(|desc| !desc.is_empty())
}

/// Names of the set x86 capability bits, e.g. "fpu | vme | de".
pub fn x86_hwcap(value: u64) -> String {
    X86_HWCAP
        .iter()
        .enumerate()
        .filter(|(bit, _)| value & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Human friendly version of value for keys where the raw number isn't very useful.
/// hwcap bits are only decoded for x86 processes.
pub fn annotate(key: u64, value: u64, x86: bool) -> Option<String> {
    match key {
        AT_HWCAP if x86 => Some(x86_hwcap(value)),
        AT_PAGESZ => Some(format!("{} KiB", value / 1024)),
        AT_CLKTCK => Some(format!("{value} Hz")),
        AT_UID | AT_EUID | AT_GID | AT_EGID => Some(value.to_string()),
        AT_SECURE => Some((value != 0).to_string()),
        _ => None,
    }
}

/// What an auxv value points to in the memory of the process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefKind {
    /// Null terminated string.
    Str,

    /// Fixed number of raw bytes.
    Bytes(usize),
}

pub fn ref_kind(key: u64) -> Option<RefKind> {
    match key {
        AT_PLATFORM | AT_BASE_PLATFORM | AT_EXECFN => Some(RefKind::Str),
        AT_RANDOM => Some(RefKind::Bytes(RANDOM_LEN)),
        _ => None,
    }
}

/// The data an auxv value points to, read from the core or /proc/<pid>/mem.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuxRef {
    Str(Vec<u8>),
    Bytes(Vec<u8>),
}

impl fmt::Display for AuxRef {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuxRef::Str(s) => fmt.write_str(&utils::to_display(s)),
            AuxRef::Bytes(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
                fmt.write_str(&hex.join(" "))
            }
        }
    }
}

/// An auxv pair along with what it points to (for the keys where that makes sense).
#[derive(Debug)]
pub struct AuxEntry {
    pub key: u64,
    pub value: u64,
    pub reference: Option<Result<AuxRef>>,
}

/// Reads pairs from range up to (but not including) the AT_NULL sentinel. The
/// sentinel has to be there and its value has to be zero.
pub fn read_pairs<W: Word>(reader: &Reader, range: ByteRange) -> Result<Vec<(u64, u64)>> {
    let mut s = Stream::new(*reader, range);
    let mut pairs = Vec::new();
    loop {
        utils::require(s.remaining() >= 2 * W::SIZE, "sentinel missing in auxv")?;
        let key = s.read::<W>()?.to_u64();
        let value = s.read::<W>()?.to_u64();
        if key == AT_NULL {
            utils::require(value == 0, "unexpected auxv value for sentinel key")?;
            return Ok(pairs);
        }
        pairs.push((key, value));
    }
}

/// Returns the address of the exec filename string from an auxv note.
pub fn find_execfn<W: Word>(reader: &Reader, desc: ByteRange) -> Result<u64> {
    read_pairs::<W>(reader, desc)?
        .iter()
        .find(|(key, _)| *key == AT_EXECFN)
        .map(|(_, value)| *value)
        .filter(|&addr| addr != 0)
        .ok_or_else(|| PargsError::format("didn't see AT_EXECFN in auxv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elf::Endian;

    fn pairs<W: Word>(endian: Endian, pairs: &[(u64, u64)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(key, value) in pairs {
            bytes.extend(W::from_u64(key).unwrap().to_bytes(endian));
            bytes.extend(W::from_u64(value).unwrap().to_bytes(endian));
        }
        bytes
    }

    #[test]
    fn names() {
        assert_eq!(key_name(0), "AT_NULL");
        assert_eq!(key_name(31), "AT_EXECFN");
        assert_eq!(key_name(28), "unk_28");
        assert_eq!(key_name(51), "unk_51");
        assert_eq!(key_name(u64::MAX), format!("unk_{}", u64::MAX));

        assert_eq!(key_description(6), Some("System page size"));
        assert_eq!(key_description(33), None);
        assert_eq!(key_description(1000), None);
    }

    #[test]
    fn annotations() {
        assert_eq!(annotate(AT_PAGESZ, 4096, true).unwrap(), "4 KiB");
        assert_eq!(annotate(AT_CLKTCK, 100, true).unwrap(), "100 Hz");
        assert_eq!(annotate(AT_EGID, 1000, false).unwrap(), "1000");
        assert_eq!(annotate(AT_SECURE, 0, true).unwrap(), "false");
        assert_eq!(annotate(AT_SECURE, 1, true).unwrap(), "true");
        assert_eq!(annotate(AT_HWCAP, 0b1011, true).unwrap(), "fpu | vme | pse");
        assert_eq!(annotate(AT_HWCAP, 0b1011, false), None);
        assert_eq!(annotate(AT_EXECFN, 0x1000, true), None);

        insta::assert_snapshot!(x86_hwcap(0x178bfbff), @"fpu | vme | de | pse | tsc | msr | pae | mce | cx8 | apic | sep | mtrr | pge | mca | cmov | pat | pse36 | clflush | mmx | fxsr | sse | sse2 | ht");
        assert_eq!(x86_hwcap(1 << 40), "");
    }

    #[test]
    fn references() {
        assert_eq!(ref_kind(AT_EXECFN), Some(RefKind::Str));
        assert_eq!(ref_kind(AT_BASE_PLATFORM), Some(RefKind::Str));
        assert_eq!(ref_kind(AT_RANDOM), Some(RefKind::Bytes(16)));
        assert_eq!(ref_kind(AT_HWCAP), None);

        assert_eq!(AuxRef::Str(b"x86_64".to_vec()).to_string(), "x86_64");
        assert_eq!(
            AuxRef::Bytes(vec![0x9a, 0x00, 0x3c]).to_string(),
            "9a 00 3c"
        );
    }

    #[test]
    fn execfn() {
        let bytes = pairs::<u64>(Endian::Big, &[(6, 4096), (31, 0x7ffc_0000), (0, 0)]);
        let reader = Reader::new(&bytes, Endian::Big);
        assert_eq!(
            find_execfn::<u64>(&reader, reader.whole()).unwrap(),
            0x7ffc_0000
        );

        let bytes = pairs::<u32>(Endian::Little, &[(31, 0xbf80_0000), (0, 0), (9, 9)]);
        let reader = Reader::new(&bytes, Endian::Little);
        assert_eq!(
            find_execfn::<u32>(&reader, reader.whole()).unwrap(),
            0xbf80_0000
        );
        let all = read_pairs::<u32>(&reader, reader.whole()).unwrap();
        assert_eq!(all, vec![(31, 0xbf80_0000)]);
    }

    #[test]
    fn missing_sentinel() {
        let bytes = pairs::<u64>(Endian::Little, &[(6, 4096), (31, 0x1000)]);
        let reader = Reader::new(&bytes, Endian::Little);
        let err = find_execfn::<u64>(&reader, reader.whole()).unwrap_err();
        assert_eq!(err.to_string(), "sentinel missing in auxv");

        // half a pair isn't a sentinel either
        let mut bytes = pairs::<u64>(Endian::Little, &[(31, 0x1000)]);
        bytes.extend([0; 8]);
        let reader = Reader::new(&bytes, Endian::Little);
        assert!(find_execfn::<u64>(&reader, reader.whole()).is_err());
    }

    #[test]
    fn bad_sentinel() {
        let bytes = pairs::<u64>(Endian::Little, &[(31, 0x1000), (0, 1)]);
        let reader = Reader::new(&bytes, Endian::Little);
        let err = find_execfn::<u64>(&reader, reader.whole()).unwrap_err();
        assert_eq!(err.to_string(), "unexpected auxv value for sentinel key");
    }

    #[test]
    fn no_execfn() {
        let bytes = pairs::<u32>(Endian::Little, &[(6, 4096), (0, 0)]);
        let reader = Reader::new(&bytes, Endian::Little);
        let err = find_execfn::<u32>(&reader, reader.whole()).unwrap_err();
        assert_eq!(err.to_string(), "didn't see AT_EXECFN in auxv");
    }
}
