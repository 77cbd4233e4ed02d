use super::tables::{SimpleTableBuilder, add_simple};
use super::vectors::{self, Sections};
use crate::args::Options;
use crate::elf::{ByteRange, ElfFile};
use crate::error::Result;
use crate::landmarks::Landmarks;
use crate::utils::{self, Styling, uwrite, uwriteln};
use std::io::Write;
use std::path::Path;

pub fn print_core(out: &mut impl Write, path: &Path, options: &Options) -> Result<()> {
    let file = ElfFile::new(path)?;
    let landmarks = file.landmarks()?;

    if options.cmdline {
        vectors::write_joined(out, landmarks.argv())?;
        uwriteln!(out);
        return Ok(());
    }

    let header = format!("core '{}' of {}:", path.display(), landmarks.pid);
    uwrite!(out, "{} ", header.header());
    vectors::write_joined(out, landmarks.argv())?;
    uwriteln!(out);

    let mut sections = Sections::default();
    if options.argv {
        sections.begin(out)?;
        vectors::write_indexed(out, "argv", landmarks.argv())?;
    }
    if options.envp {
        sections.begin(out)?;
        vectors::write_indexed(out, "envp", landmarks.envp())?;
    }
    if options.auxv {
        sections.begin(out)?;
        let entries = landmarks.auxv_entries()?;
        vectors::write_auxv(out, entries, landmarks.is_x86(), options)?;
    }
    if options.landmarks {
        sections.begin(out)?;
        write_landmarks(out, &landmarks, options.explain)?;
    }
    Ok(())
}

fn range(range: ByteRange) -> String {
    format!("{:#x}..{:#x}", range.begin, range.end)
}

fn write_landmarks(out: &mut impl Write, landmarks: &Landmarks, explain: bool) -> Result<()> {
    let mut b = SimpleTableBuilder::new();
    add_simple!(b, "word size", landmarks.word_size, "bits in a pointer");
    add_simple!(
        b,
        "byte order",
        "{} endian",
        landmarks.endian,
        "byte order of the machine that wrote the core"
    );
    add_simple!(
        b,
        "need to swap",
        landmarks.need_to_swap,
        "true if the core's byte order differs from this machine's"
    );
    add_simple!(b, "machine", landmarks.machine, "e_machine from the ELF header");
    add_simple!(
        b,
        "pid",
        landmarks.pid,
        "id of the process that dumped core, from NT_PRPSINFO"
    );
    let fname = landmarks.fname().map(utils::to_display).unwrap_or_default();
    add_simple!(b, "fname", fname, "pr_fname from NT_PRPSINFO, possibly truncated");
    let execfn = utils::to_display(landmarks.execfn()?);
    add_simple!(
        b,
        "exec filename",
        format!("{:#x} {execfn}", landmarks.execfn_addr),
        "address of the exec filename from AT_EXECFN and the string it points to"
    );
    add_simple!(
        b,
        "auxv note",
        range(landmarks.auxv_note),
        "file offsets of the auxv pairs in the NT_AUXV note"
    );
    add_simple!(
        b,
        "stack segment",
        range(landmarks.vector_section),
        "file offsets of the LOAD segment holding the exec filename"
    );
    add_simple!(
        b,
        "stack vaddr",
        "{:#x}",
        landmarks.vector_base_addr,
        "virtual address of the start of the stack segment"
    );
    add_simple!(b, "argv", range(landmarks.argv), "file offsets of the argv pointers");
    add_simple!(b, "envp", range(landmarks.envp), "file offsets of the envp pointers");
    add_simple!(b, "argc", landmarks.argc, "argument count found below argv");
    b.writeln(&mut *out, explain)
}
