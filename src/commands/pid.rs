use super::vectors::{self, Sections};
use crate::args::Options;
use crate::error::Result;
use crate::process::ProcessVectors;
use crate::utils::{Styling, uwrite, uwriteln};
use std::io::Write;
use tracing::debug;

pub fn print_pid(out: &mut impl Write, pid: u32, options: &Options) -> Result<()> {
    print_process(out, &ProcessVectors::new(pid), options)
}

pub fn print_process(
    out: &mut impl Write,
    process: &ProcessVectors,
    options: &Options,
) -> Result<()> {
    let argv = process.argv()?;
    let argv = || argv.iter().map(Ok);

    if options.cmdline {
        vectors::write_joined(out, argv())?;
        uwriteln!(out);
        return Ok(());
    }

    let header = format!("{}:", process.pid);
    uwrite!(out, "{} ", header.header());
    vectors::write_joined(out, argv())?;
    uwriteln!(out);

    let mut sections = Sections::default();
    if options.argv {
        sections.begin(out)?;
        vectors::write_indexed(out, "argv", argv())?;
    }
    if options.envp {
        let envp = process.envp()?;
        sections.begin(out)?;
        vectors::write_indexed(out, "envp", envp.iter().map(Ok))?;
    }
    if options.auxv {
        let entries = process.auxv_entries()?;
        sections.begin(out)?;
        let x86 = cfg!(any(target_arch = "x86", target_arch = "x86_64"));
        vectors::write_auxv(out, entries, x86, options)?;
    }
    if options.landmarks {
        debug!("landmarks are only found for cores, skipping {}", process.pid);
    }
    Ok(())
}
