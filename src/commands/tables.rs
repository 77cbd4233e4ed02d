//! Tables are built with the tabled crate and printed without borders. Both kinds
//! of table can be followed by an explanation of what each column (or row) means.
use crate::error::Result;
use crate::utils::{Styling, uwriteln};
use std::io::Write;
use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Padding, Style, object::Columns},
};

struct Column {
    header: String,
    help: String,
    align: Alignment,
    fields: Vec<String>,
}

/// Multi-column table, e.g. for auxv:
/// key         value               decoded           <- with titles
/// ---         -----               -------
/// AT_PAGESZ   0x0000000000001000  4 KiB
/// AT_EXECFN   0x00007ffc10000fe0  /usr/bin/sleep
///
/// key: name of the auxv key                         <- with explain
/// value: the raw value
pub struct TableBuilder {
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder {
            columns: Vec::new(),
        }
    }

    pub fn add_col_l(&mut self, header: &str, help: &str) {
        self.add_col(header, help, Alignment::left());
    }

    pub fn add_col_r(&mut self, header: &str, help: &str) {
        self.add_col(header, help, Alignment::right());
    }

    /// Use add_field! instead of calling this directly.
    pub fn add_str_field(&mut self, header: &str, value: String) {
        let Some(column) = self.columns.iter_mut().find(|c| c.header == header) else {
            panic!("table has no {header} column");
        };
        column.fields.push(non_empty(value));
    }

    pub fn writeln(&self, mut out: impl Write, titles: bool, explain: bool) -> Result<()> {
        uwriteln!(out, "{}", self.table_str(titles));
        if explain {
            let help = self.columns.iter().map(|c| (&c.header, &c.help));
            uwriteln!(out);
            uwriteln!(out, "{}", explanation(help));
        }
        Ok(())
    }

    fn add_col(&mut self, header: &str, help: &str, align: Alignment) {
        debug_assert!(self.columns.iter().all(|c| c.header != header));
        self.columns.push(Column {
            header: header.to_string(),
            help: help.to_string(),
            align,
            fields: Vec::new(),
        });
    }

    fn table_str(&self, titles: bool) -> String {
        let rows = self.columns.first().map_or(0, |c| c.fields.len());
        let mut builder = Builder::with_capacity(rows + 2, self.columns.len());
        if titles {
            let headers = self.columns.iter().map(|c| c.header.clone());
            builder.push_record(headers.clone().map(|h| h.table_header().to_string()));
            builder.push_record(headers.map(|h| "-".repeat(h.len()).table_sep().to_string()));
        }
        for row in 0..rows {
            builder.push_record(self.columns.iter().map(|c| c.fields[row].clone()));
        }

        let mut table = builder.build();
        for (i, column) in self.columns.iter().enumerate() {
            table.modify(Columns::one(i), column.align);
        }
        borderless(table)
    }
}

macro_rules! add_field {
    ($builder:ident, $header:literal, $value:expr) => {
        let s = format!("{}", $value).table_field().to_string();
        $builder.add_str_field($header, s);
    };
    ($builder:ident, $header:literal, $format:literal, $value:expr) => {
        let s = format!($format, $value).table_field().to_string();
        $builder.add_str_field($header, s);
    };
}
pub(crate) use add_field;

/// Untitled name/value table, e.g. for landmarks:
/// word size      64
/// byte order     little endian
///
/// word size: bits in a pointer                      <- with explain
/// byte order: byte order of the machine that wrote the core
pub struct SimpleTableBuilder {
    rows: Vec<(String, String, String)>,
}

impl SimpleTableBuilder {
    pub fn new() -> SimpleTableBuilder {
        SimpleTableBuilder { rows: Vec::new() }
    }

    /// Use add_simple! instead of calling this directly.
    pub fn add_str_row(&mut self, name: &str, value: String, help: &str) {
        self.rows
            .push((name.to_string(), non_empty(value), help.to_string()));
    }

    pub fn writeln(&self, mut out: impl Write, explain: bool) -> Result<()> {
        let mut builder = Builder::with_capacity(self.rows.len(), 2);
        for (name, value, _) in &self.rows {
            builder.push_record([name.clone(), value.clone()]);
        }
        let mut table = builder.build();
        table.modify(Columns::one(0), Alignment::left());
        table.modify(Columns::one(1), Alignment::left());
        uwriteln!(out, "{}", borderless(table));

        if explain {
            let help = self.rows.iter().map(|(name, _, help)| (name, help));
            uwriteln!(out);
            uwriteln!(out, "{}", explanation(help));
        }
        Ok(())
    }
}

macro_rules! add_simple {
    ($builder:ident, $name:literal, $value:expr, $help:expr) => {
        let s = format!("{}", $value).table_field().to_string();
        $builder.add_str_row($name, s, $help);
    };
    ($builder:ident, $name:literal, $format:literal, $value:expr, $help:expr) => {
        let s = format!($format, $value).table_field().to_string();
        $builder.add_str_row($name, s, $help);
    };
}
pub(crate) use add_simple;

// tabled mangles rows with empty cells.
fn non_empty(value: String) -> String {
    if value.is_empty() {
        " ".table_field().to_string()
    } else {
        value
    }
}

fn borderless(mut table: Table) -> String {
    table.modify(Columns::first(), Padding::new(0, 1, 0, 0));
    table.with(Style::empty());
    table.to_string()
}

fn explanation<'a>(items: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    items
        .map(|(title, text)| {
            format!(
                "{}: {}",
                title.as_str().explain_title(),
                text.as_str().explain_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
