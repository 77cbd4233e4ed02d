//! A core file on disk.
use crate::error::{PargsError, Result};
use crate::landmarks::Landmarks;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

pub struct ElfFile {
    bytes: Mmap,
}

impl ElfFile {
    pub fn new(path: &Path) -> Result<Self> {
        let context = || path.display().to_string();
        let file = File::open(path).map_err(|e| PargsError::io(context(), e))?;

        // This is unsafe because it has undefined behavior if the underlying file is
        // modified while the memory map is in use.
        let bytes = unsafe { Mmap::map(&file) }.map_err(|e| PargsError::io(context(), e))?;
        debug!("mapped {} bytes of {}", bytes.len(), path.display());

        // The mapping stays valid after the file is closed.
        Ok(ElfFile { bytes })
    }

    /// The landmarks borrow from the mapping so they can't outlive self.
    pub fn landmarks(&self) -> Result<Landmarks<'_>> {
        Landmarks::new(&self.bytes)
    }
}
