//! Vectors of a running process, read from procfs. Unlike cores nothing has to be dug
//! out of the stack: the kernel exports argv, envp, and auxv directly. Only the values
//! auxv points to have to be read out of the memory of the process.
use crate::elf::{Endian, Reader};
use crate::error::{PargsError, Result};
use crate::landmarks::auxv::{self, AuxEntry, AuxRef, RefKind};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Strings referenced by auxv are read in chunks of this size...
const CHUNK_SIZE: usize = 256;

/// ...up to this many bytes.
pub const MAX_STRING_LEN: usize = 4096;

const ELF64_MAGIC: [u8; 5] = [0x7f, b'E', b'L', b'F', 2];

pub struct ProcessVectors {
    pub pid: u32,
    dir: PathBuf,
}

impl ProcessVectors {
    pub fn new(pid: u32) -> Self {
        ProcessVectors::with_dir(pid, Path::new("/proc").join(pid.to_string()))
    }

    /// dir is normally /proc/<pid>.
    pub fn with_dir(pid: u32, dir: PathBuf) -> Self {
        ProcessVectors { pid, dir }
    }

    pub fn argv(&self) -> Result<Vec<Vec<u8>>> {
        Ok(split_records(&self.read_file("cmdline")?))
    }

    pub fn envp(&self) -> Result<Vec<Vec<u8>>> {
        Ok(split_records(&self.read_file("environ")?))
    }

    /// auxv doesn't say how large its words are so this checks the class of the exe.
    /// Looking at auxv itself doesn't work because it ends with zeros for both
    /// classes.
    pub fn word_size(&self) -> Result<u8> {
        let path = self.path("exe");
        let mut file = File::open(&path).map_err(|e| self.error(&path, e))?;
        let mut magic = [0u8; 5];
        file.read_exact(&mut magic)
            .map_err(|e| self.error(&path, e))?;
        Ok(if magic == ELF64_MAGIC { 64 } else { 32 })
    }

    /// The auxv pairs, the AT_NULL sentinel isn't included.
    pub fn auxv(&self) -> Result<Vec<(u64, u64)>> {
        let word_size = self.word_size()?;
        let bytes = self.read_file("auxv")?;
        parse_auxv(&bytes, word_size)
    }

    /// auxv along with the values its entries point to.
    pub fn auxv_entries(&self) -> Result<Vec<AuxEntry>> {
        let pairs = self.auxv()?;
        let memory = self.memory()?;
        Ok(pairs
            .into_iter()
            .map(|(key, value)| AuxEntry {
                key,
                value,
                reference: auxv::ref_kind(key).map(|kind| memory.resolve(kind, value)),
            })
            .collect())
    }

    /// Opening mem requires the same permissions as ptrace.
    pub fn memory(&self) -> Result<Memory> {
        let path = self.path("mem");
        let file = File::open(&path).map_err(|e| self.error(&path, e))?;
        Ok(Memory { file, path })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name);
        let bytes = std::fs::read(&path).map_err(|e| self.error(&path, e))?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    fn error(&self, path: &Path, source: std::io::Error) -> PargsError {
        PargsError::io(path.display().to_string(), source)
    }
}

/// /proc/<pid>/mem, the file is closed when this is dropped.
pub struct Memory {
    file: File,
    path: PathBuf,
}

impl Memory {
    pub fn resolve(&self, kind: RefKind, addr: u64) -> Result<AuxRef> {
        match kind {
            RefKind::Str => self.read_string(addr).map(AuxRef::Str),
            RefKind::Bytes(len) => self.read_bytes(addr, len).map(AuxRef::Bytes),
        }
    }

    /// Null terminated string at addr (without the null).
    pub fn read_string(&self, addr: u64) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        while result.len() < MAX_STRING_LEN {
            let offset = self.offset(addr, result.len())?;
            let count = self
                .file
                .read_at(&mut chunk, offset)
                .map_err(|e| self.error(offset, e))?;
            if count == 0 {
                break;
            }
            if let Some(len) = memchr::memchr(0, &chunk[..count]) {
                result.extend_from_slice(&chunk[..len]);
                return Ok(result);
            }
            result.extend_from_slice(&chunk[..count]);
        }
        Err(PargsError::format(format!(
            "string at {addr:#x} in {} isn't null-terminated",
            self.path.display()
        )))
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        self.offset(addr, len)?;
        let mut bytes = vec![0; len];
        self.file
            .read_exact_at(&mut bytes, addr)
            .map_err(|e| self.error(addr, e))?;
        Ok(bytes)
    }

    /// mem is indexed by off_t so addresses past i64::MAX can't be read.
    fn offset(&self, addr: u64, delta: usize) -> Result<u64> {
        addr.checked_add(delta as u64)
            .filter(|&offset| i64::try_from(offset).is_ok())
            .ok_or_else(|| {
                PargsError::format(format!(
                    "{addr:#x} + {delta} is outside of {}",
                    self.path.display()
                ))
            })
    }

    fn error(&self, addr: u64, source: std::io::Error) -> PargsError {
        let context = format!("couldn't read {addr:#x} from {}", self.path.display());
        if source.kind() == ErrorKind::UnexpectedEof {
            PargsError::format(context)
        } else {
            PargsError::io(context, source)
        }
    }
}

/// Splits the null separated records of cmdline and environ. The last record is
/// normally null terminated as well.
pub fn split_records(bytes: &[u8]) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    bytes.split(|&b| b == 0).map(|r| r.to_vec()).collect()
}

/// procfs auxv is in the byte order of the machine.
pub fn parse_auxv(bytes: &[u8], word_size: u8) -> Result<Vec<(u64, u64)>> {
    let reader = Reader::new(bytes, Endian::host());
    if word_size == 64 {
        auxv::read_pairs::<u64>(&reader, reader.whole())
    } else {
        auxv::read_pairs::<u32>(&reader, reader.whole())
    }
}
