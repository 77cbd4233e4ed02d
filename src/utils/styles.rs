//! Output is styled (colors, bold, etc) using elements from ~/.pargs/styles.tcss.
//! That file is created from default.tcss the first time pargs runs so that users
//! have something to edit.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use termio::prelude::*;
use termio::{StyledString, Termio};

static TCSS: LazyLock<Termio> = LazyLock::new(load_styles);

fn style_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pargs").join("styles.tcss"))
}

/// Writes the default styles unless the user already has a styles file. Problems
/// are reported with eprintln because warn itself is styled.
pub fn generate_style_file() {
    let Some(path) = style_path() else {
        eprintln!("couldn't find home directory");
        return;
    };
    if let Err(err) = write_default_styles(&path) {
        eprintln!("couldn't create {}: {err}", path.display());
    }
}

fn write_default_styles(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => file.write_all(include_str!("default.tcss").as_bytes()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

// Tests and first runs without a home directory use unstyled output.
fn load_styles() -> Termio {
    let Some(path) = style_path().filter(|p| p.exists()) else {
        return Termio::new();
    };
    let Some(path) = path.to_str() else {
        return Termio::new();
    };
    Termio::from_file(path).unwrap_or_else(|err| {
        eprintln!("couldn't parse {path}: {err}");
        Termio::new()
    })
}

/// Each method styles text using the element of the same name in styles.tcss.
pub trait Styling: Sized {
    fn styled(self, element: &str) -> StyledString;

    fn explain_title(self) -> StyledString {
        self.styled("explain title")
    }

    fn explain_text(self) -> StyledString {
        self.styled("explain text")
    }

    /// First line printed for a target.
    fn header(self) -> StyledString {
        self.styled("header")
    }

    /// e.g. the "argv[0]:" part of argv lines
    fn label(self) -> StyledString {
        self.styled("label")
    }

    fn table_header(self) -> StyledString {
        self.styled("table header")
    }

    fn table_sep(self) -> StyledString {
        self.styled("table separator")
    }

    fn table_field(self) -> StyledString {
        self.styled("table field")
    }

    fn warn(self) -> StyledString {
        self.styled("warn")
    }
}

impl Styling for String {
    fn styled(self, element: &str) -> StyledString {
        self.style(element, &TCSS)
    }
}

impl Styling for &str {
    fn styled(self, element: &str) -> StyledString {
        self.style(element, &TCSS)
    }
}
