//! Command line of the helper, as passed by the daemon that spawns it.

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "selinux_child")]
#[command(about = "Sets the SELinux login mapping of a single user")]
pub struct Args {
    /// Debug level, either legacy (0-9) or a bitmask of debug classes
    #[arg(short = 'd', long, value_name = "LEVEL", value_parser = parse_debug_level)]
    pub debug_level: Option<u32>,

    /// Add debug timestamps
    #[arg(long, value_name = "0|1", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub debug_timestamps: u8,

    /// Show timestamps with microseconds
    #[arg(long, value_name = "0|1", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub debug_microseconds: u8,

    /// An open file descriptor for the debug logs
    #[arg(long, value_name = "FD")]
    pub debug_fd: Option<i32>,

    /// Send the debug output to stderr directly
    #[arg(long, hide = true)]
    pub debug_to_stderr: bool,
}

/// Parses an integer the way C's `strtol` does with base 0: `0x` prefixes hex, a leading `0`
/// octal, anything else decimal.
fn parse_debug_level(s: &str) -> Result<u32, String> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (digits, radix) = if let Some(hex) = hex {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("invalid debug level '{}': {}", s, e))
}

/// Maps a `--debug-level` value to a log filter.
///
/// Small values are legacy levels. Anything from `0x10` upwards is a bitmask of debug classes,
/// and the most verbose class present wins.
pub fn level_filter(debug_level: Option<u32>) -> LevelFilter {
    let Some(level) = debug_level else {
        return LevelFilter::Error;
    };
    if level < 0x10 {
        return match level {
            0..=2 => LevelFilter::Error,
            3 => LevelFilter::Warn,
            4 | 5 => LevelFilter::Info,
            6 | 7 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
    }

    if level & (0x2000 | 0x4000) != 0 {
        LevelFilter::Trace
    } else if level & (0x0400 | 0x1000) != 0 {
        LevelFilter::Debug
    } else if level & (0x0100 | 0x0200) != 0 {
        LevelFilter::Info
    } else if level & 0x0080 != 0 {
        LevelFilter::Warn
    } else {
        LevelFilter::Error
    }
}
