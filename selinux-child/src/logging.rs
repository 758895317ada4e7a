//! Debug log setup.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
};

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::cli::Args;

/// Where and how the helper writes its debug log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub timestamps: bool,
    pub microseconds: bool,
    /// Descriptor inherited from the parent. Logs go to stderr if unset.
    pub fd: Option<i32>,
}

impl LogConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            level: crate::cli::level_filter(args.debug_level),
            timestamps: args.debug_timestamps != 0,
            microseconds: args.debug_microseconds != 0,
            fd: if args.debug_to_stderr {
                None
            } else {
                args.debug_fd
            },
        }
    }
}

/// Installs the global logger.
pub fn init(config: &LogConfig) {
    let prog = format!("{}[{}]", env!("CARGO_BIN_NAME"), std::process::id());
    let timestamps = config.timestamps;
    let microseconds = config.microseconds;

    let mut builder = Builder::new();
    builder
        .filter_module("idmwire", config.level)
        .filter_module(env!("CARGO_CRATE_NAME"), config.level)
        .format(move |buf, record| {
            if timestamps {
                let ts = if microseconds {
                    buf.timestamp_micros()
                } else {
                    buf.timestamp_seconds()
                };
                write!(buf, "({}) ", ts)?;
            }
            writeln!(
                buf,
                "[{}] [{}] ({}): {}",
                prog,
                record.target(),
                record.level(),
                record.args()
            )
        });

    let mut failed = None;
    match config.fd.map(|fd| (fd, open_debug_fd(fd))) {
        Some((_, Ok(file))) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Some((fd, Err(e))) => {
            failed = Some((fd, e));
            builder.target(Target::Stderr);
        }
        None => {
            builder.target(Target::Stderr);
        }
    }
    builder.init();

    if let Some((fd, e)) = failed {
        log::warn!("cannot log to descriptor {}, using stderr: {}", fd, e);
    }
}

/// Opens the log descriptor passed by the parent.
///
/// stdin and stdout carry the request and response, so descriptors 0 to 2 are refused.
fn open_debug_fd(fd: i32) -> io::Result<File> {
    if fd <= 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a dedicated log descriptor",
        ));
    }
    OpenOptions::new()
        .append(true)
        .open(format!("/dev/fd/{}", fd))
}
