pub mod styles;

pub use styles::*;

use crate::error::{PargsError, Result};

pub fn require(predicate: bool, err: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(PargsError::format(err))
    }
}

pub fn warn(mesg: &str) {
    eprintln!("{}", mesg.warn());
}

/// Notes pad names and descriptors to 4-byte boundaries. None if the size is so large
/// that padding overflows.
pub fn align_to_word(n: u32) -> Option<u32> {
    n.checked_add(3).map(|n| n & !3)
}

/// Lossy conversion used when printing strings pulled out of cores and /proc. These
/// are usually but not always UTF-8.
pub fn to_display(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

macro_rules! uwrite {
    ($out:expr, $($arg:tt)*) => {
        write!($out, $($arg)*).map_err(crate::error::PargsError::output)?
    };
}
pub(crate) use uwrite;

macro_rules! uwriteln {
    ($out:expr) => {
        writeln!($out).map_err(crate::error::PargsError::output)?
    };
    ($out:expr, $($arg:tt)*) => {
        writeln!($out, $($arg)*).map_err(crate::error::PargsError::output)?
    };
}
pub(crate) use uwriteln;

/// Remove escape sequences from the string (e.g. for colors).
#[cfg(test)]
pub fn strip_escapes(s: &str) -> String {
    // Even with an empty style tabled and termio can add escape sequences so tests
    // compare the plain text.
    let mut result = String::with_capacity(s.len());
    let mut escaping = false;

    // Note that escape sequences can be fairly gnarly, e.g. for RGB colors.
    // See https://gist.github.com/fnky/458719343aabd01cfb17a3a4f7296797
    for c in s.chars() {
        if c == '\x1b' {
            escaping = true;
        } else if escaping {
            if c == 'm' {
                escaping = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}
