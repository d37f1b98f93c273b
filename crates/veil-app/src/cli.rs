//! Command line parsing.

use clap::Parser;

/// Usage line printed on any argument error.
pub const USAGE: &str = "usage: veil [-v] [cmd [arg ...]]";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "veil", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v')]
    pub version: bool,

    /// Command run once every output is locked.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}

/// What the process should do after parsing arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Print `veil-<version>` and exit 0.
    PrintVersion,
    /// Lock, optionally running a command afterwards.
    Lock(Cli),
    /// Print [`USAGE`] and exit 1.
    Usage,
}

/// Parses `args`, including the program name.
pub fn parse_args<I, T>(args: I) -> CliAction
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) if cli.version => CliAction::PrintVersion,
        Ok(cli) => CliAction::Lock(cli),
        Err(_) => CliAction::Usage,
    }
}
