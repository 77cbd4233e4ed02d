use std::fmt;

/// Byte order recorded in e_ident[EI_DATA].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endian::Little => fmt.write_str("little"),
            Endian::Big => fmt.write_str("big"),
        }
    }
}

/// A fixed size unsigned integer as stored in an ELF file. Reads take the file's byte
/// order and return host values so nothing else has to think about swapping.
pub trait Field: Copy + Sized {
    const SIZE: usize;

    /// None unless bytes is exactly SIZE long.
    fn from_bytes(bytes: &[u8], endian: Endian) -> Option<Self>;

    fn to_bytes(self, endian: Endian) -> Vec<u8>;
}

macro_rules! field {
    ($name:ty) => {
        impl Field for $name {
            const SIZE: usize = std::mem::size_of::<$name>();

            fn from_bytes(bytes: &[u8], endian: Endian) -> Option<Self> {
                let bytes = bytes.try_into().ok()?;
                Some(match endian {
                    Endian::Little => <$name>::from_le_bytes(bytes),
                    Endian::Big => <$name>::from_be_bytes(bytes),
                })
            }

            fn to_bytes(self, endian: Endian) -> Vec<u8> {
                match endian {
                    Endian::Little => self.to_le_bytes().to_vec(),
                    Endian::Big => self.to_be_bytes().to_vec(),
                }
            }
        }
    };
}

field!(u8);
field!(u16);
field!(u32);
field!(u64);

/// Offsets and sizes of the handful of fields we need from Elf32_* and Elf64_* structs,
/// see /usr/include/elf.h.
#[derive(Debug)]
pub struct Layout {
    pub ehdr_size: usize,
    pub e_type: usize,
    pub e_phoff: usize,
    pub e_shoff: usize,
    pub e_phentsize: usize,
    pub e_phnum: usize,
    pub e_shentsize: usize,

    pub phdr_size: usize,
    pub p_type: usize,
    pub p_offset: usize,
    pub p_vaddr: usize,
    pub p_filesz: usize,

    pub shdr_size: usize,
    pub sh_info: usize,

    pub prpsinfo: PrPsInfoLayout,
}

/// Where the interesting bits of prpsinfo_t (elf_prpsinfo in the kernel) live.
#[derive(Debug)]
pub struct PrPsInfoLayout {
    pub size: usize,
    pub pid: usize,
    pub fname: usize,
}

pub const ELF32_LAYOUT: Layout = Layout {
    ehdr_size: 52,
    e_type: 16,
    e_phoff: 28,
    e_shoff: 32,
    e_phentsize: 42,
    e_phnum: 44,
    e_shentsize: 46,

    phdr_size: 32,
    p_type: 0,
    p_offset: 4,
    p_vaddr: 8,
    p_filesz: 16,

    shdr_size: 40,
    sh_info: 28,

    // pr_flag is 4 bytes, pr_uid and pr_gid are 2 bytes each
    prpsinfo: PrPsInfoLayout {
        size: 124,
        pid: 12,
        fname: 28,
    },
};

pub const ELF64_LAYOUT: Layout = Layout {
    ehdr_size: 64,
    e_type: 16,
    e_phoff: 32,
    e_shoff: 40,
    e_phentsize: 54,
    e_phnum: 56,
    e_shentsize: 58,

    phdr_size: 56,
    p_type: 0,
    p_offset: 8,
    p_vaddr: 16,
    p_filesz: 32,

    shdr_size: 64,
    sh_info: 44,

    // 4 bytes of padding after pr_nice, pr_flag is 8 bytes, pr_uid and pr_gid are 4 bytes each
    prpsinfo: PrPsInfoLayout {
        size: 136,
        pid: 24,
        fname: 40,
    },
};

/// Pointer sized word of the cored process, i.e. u32 for ELFCLASS32 and u64 for
/// ELFCLASS64. Everything that depends on the ELF class is written once, generic over
/// this.
pub trait Word:
    Field + Ord + Default + Into<u64> + TryFrom<u64> + fmt::LowerHex + fmt::Display + fmt::Debug
{
    const BITS: u8;
    const LAYOUT: &'static Layout;

    fn to_u64(self) -> u64 {
        self.into()
    }

    /// None if the value doesn't fit, e.g. a 64-bit offset in a 32-bit core.
    fn from_u64(value: u64) -> Option<Self> {
        Self::try_from(value).ok()
    }
}

impl Word for u32 {
    const BITS: u8 = 32;
    const LAYOUT: &'static Layout = &ELF32_LAYOUT;
}

impl Word for u64 {
    const BITS: u8 = 64;
    const LAYOUT: &'static Layout = &ELF64_LAYOUT;
}
