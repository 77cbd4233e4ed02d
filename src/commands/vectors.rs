//! Printers shared by cores and live processes.
use super::tables::{TableBuilder, add_field};
use crate::args::Options;
use crate::error::Result;
use crate::landmarks::auxv::{self, AuxEntry};
use crate::utils::{self, Styling, uwrite, uwriteln};
use std::io::Write;

/// Sections are separated by a blank line.
#[derive(Default)]
pub struct Sections {
    started: bool,
}

impl Sections {
    pub fn begin(&mut self, out: &mut impl Write) -> Result<()> {
        if self.started {
            uwriteln!(out);
        }
        self.started = true;
        Ok(())
    }
}

/// Writes the strings separated by spaces without a trailing new line.
pub fn write_joined<S, I>(out: &mut impl Write, strings: I) -> Result<()>
where
    S: AsRef<[u8]>,
    I: IntoIterator<Item = Result<S>>,
{
    for (i, s) in strings.into_iter().enumerate() {
        let s = utils::to_display(s?.as_ref());
        if i > 0 {
            uwrite!(out, " ");
        }
        uwrite!(out, "{s}");
    }
    Ok(())
}

/// One "name[i]: string" line per string.
pub fn write_indexed<S, I>(out: &mut impl Write, name: &str, strings: I) -> Result<()>
where
    S: AsRef<[u8]>,
    I: IntoIterator<Item = Result<S>>,
{
    for (i, s) in strings.into_iter().enumerate() {
        let label = format!("{name}[{i}]:");
        uwriteln!(out, "{} {}", label.label(), utils::to_display(s?.as_ref()));
    }
    Ok(())
}

/// The auxv table. Entries whose referenced value couldn't be read fail the whole
/// table.
pub fn write_auxv(
    out: &mut impl Write,
    entries: Vec<AuxEntry>,
    x86: bool,
    options: &Options,
) -> Result<()> {
    let mut builder = TableBuilder::new();
    builder.add_col_l("key", "name of the auxv key, unk_N if pargs doesn't know the key");
    builder.add_col_r("value", "the raw value");
    builder.add_col_l(
        "decoded",
        "friendlier version of the value or what the value points to",
    );
    if options.verbose {
        builder.add_col_l("description", "what the key is used for");
    }

    for entry in entries {
        let mut decoded: Vec<String> = auxv::annotate(entry.key, entry.value, x86)
            .into_iter()
            .collect();
        if let Some(reference) = entry.reference.transpose()? {
            decoded.push(reference.to_string());
        }

        add_field!(builder, "key", auxv::key_name(entry.key));
        add_field!(builder, "value", "0x{:016x}", entry.value);
        add_field!(builder, "decoded", decoded.join(" "));
        if options.verbose {
            add_field!(
                builder,
                "description",
                auxv::key_description(entry.key).unwrap_or_default()
            );
        }
    }

    builder.writeln(&mut *out, options.titles, options.explain)
}
