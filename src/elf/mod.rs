//! Just enough ELF support to find landmarks in core files.
//! Quick ELF reference: https://gist.github.com/x0nu11byt3/bcb35c3de461e5fb66173071a2379779
//!
//! ELF files start with an ELF header which includes:
//! * A magic number to identify the file as an ELF file.
//! * The class (32 or 64-bit) and byte order.
//! * The type, for us this must be a core file.
//! * The offset to and number of program headers.
//!
//! Program headers identify segments. For a core file the interesting types are:
//! * Load - a chunk of the memory of the process that cored.
//! * Note - variety of metadata, e.g. process info and a copy of the auxiliary vector.
//!
//! Core files written by the kernel have no section headers. The only time we look at
//! one is when there are so many segments that the count had to be stashed in section
//! header [0].
pub mod elf_file;
pub mod header;
pub mod io;
pub mod notes;
pub mod primitives;
pub mod segments;

pub use elf_file::*;
pub use header::*;
pub use io::*;
pub use notes::*;
pub use primitives::*;
pub use segments::*;
