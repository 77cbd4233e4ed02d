//! Command line options.
use clap::Parser;
use std::fmt;
use std::path::PathBuf;

/// PIDs are at most this many digits, anything longer is rejected instead of being
/// treated as a core file.
const MAX_PID_LEN: usize = 20;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
/// Display arguments and other vectors of a process or core file.
pub struct Cli {
    /// Print process arguments (argv, the argument vector)
    #[arg(short = 'a')]
    pub argv: bool,

    /// Print environment variables (envp, the environment vector)
    #[arg(short = 'e')]
    pub envp: bool,

    /// Print the auxiliary vector
    #[arg(short = 'x')]
    pub auxv: bool,

    /// Print just the command line
    #[arg(short = 'l', conflicts_with_all = ["envp", "auxv"])]
    pub cmdline: bool,

    /// Verbose mode, e.g. describe auxv keys
    #[arg(short, long)]
    pub verbose: bool,

    /// Log what the core file parser is doing
    #[arg(short, long)]
    pub debug: bool,

    /// Show where argv, envp, etc were found in core files
    #[arg(long)]
    pub landmarks: bool,

    /// Explain columns, fields, etc.
    #[arg(long)]
    pub explain: bool,

    /// Add column headers
    #[arg(short, long)]
    pub titles: bool,

    /// PIDs of running processes or paths to core files
    #[arg(required = true, value_name = "PID|CORE", value_parser = parse_target)]
    pub targets: Vec<Target>,
}

/// What to print for each target.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Options {
    pub argv: bool,
    pub envp: bool,
    pub auxv: bool,
    pub cmdline: bool,
    pub verbose: bool,
    pub landmarks: bool,
    pub explain: bool,
    pub titles: bool,
}

impl Cli {
    /// argv is printed if nothing else was asked for.
    pub fn options(&self) -> Options {
        let none = !(self.argv || self.envp || self.auxv || self.cmdline || self.landmarks);
        Options {
            argv: self.argv || none,
            envp: self.envp,
            auxv: self.auxv,
            cmdline: self.cmdline,
            verbose: self.verbose,
            landmarks: self.landmarks,
            explain: self.explain,
            titles: self.titles,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Pid(u32),
    Core(PathBuf),
}

impl fmt::Display for Target {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Pid(pid) => write!(fmt, "{pid}"),
            Target::Core(path) => write!(fmt, "{}", path.display()),
        }
    }
}

/// All digits is a PID, anything else is a core file.
fn parse_target(s: &str) -> Result<Target, String> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(Target::Core(PathBuf::from(s)));
    }
    if s.len() > MAX_PID_LEN {
        return Err("PID is too long".to_string());
    }
    s.parse()
        .map(Target::Pid)
        .map_err(|_| format!("`{s}` isn't a valid PID"))
}
