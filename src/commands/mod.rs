//! Printing for the targets given on the command line.
pub mod core_file;
pub mod pid;
pub mod tables;
pub mod vectors;

pub use core_file::print_core;
pub use pid::print_pid;

use crate::args::{Options, Target};
use crate::error::Result;
use std::io::Write;

pub fn print_target(out: &mut impl Write, target: &Target, options: &Options) -> Result<()> {
    match target {
        Target::Pid(pid) => print_pid(out, *pid, options),
        Target::Core(path) => print_core(out, path, options),
    }
}
