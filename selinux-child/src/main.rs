//! Privileged helper spawned by the identity daemon to set one SELinux login mapping.
//!
//! Reads a request frame from stdin, applies it, and writes the status to stdout.

#![forbid(unsafe_code)]

use std::{io, process::ExitCode};

use clap::Parser;
use idmwire::child::{exit_code, Child, ChildConfig};

mod cli;
mod logging;
mod semanage;

use cli::Args;
use logging::LogConfig;
use semanage::SemanageLogin;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&LogConfig::from_args(&args));

    log::debug!("selinux_child started");
    if let Some((uid, gid)) = credentials() {
        log::trace!("Running as [{}][{}]", uid, gid);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut child = Child::new(
        ChildConfig::default(),
        stdin.lock(),
        stdout.lock(),
        SemanageLogin::new(),
    );
    log::trace!("context initialized");

    let result = child.run();
    match &result {
        Ok(()) => log::debug!("selinux_child completed successfully"),
        Err(e) => log::error!("selinux_child failed: {}", e),
    }
    ExitCode::from(exit_code(&result))
}

/// Effective user and group, as owner of the process's `/proc` entry.
#[cfg(unix)]
fn credentials() -> Option<(u32, u32)> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata("/proc/self").ok()?;
    Some((meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
fn credentials() -> Option<(u32, u32)> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use std::{fs, os::unix::fs::MetadataExt};

    use super::*;

    #[test]
    fn credentials_are_effective_ids() {
        let name = format!("selinux_child-creds-{}", std::process::id());
        let path = std::env::temp_dir().join(name);
        fs::write(&path, b"").unwrap();
        let owner = fs::metadata(&path).unwrap().uid();
        fs::remove_file(&path).unwrap();

        let (uid, _gid) = credentials().unwrap();
        assert_eq!(uid, owner);
    }
}
