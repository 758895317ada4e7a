//! Login mapping through the `semanage` tool.

use std::{
    path::PathBuf,
    process::{Command, Output, Stdio},
};

use idmwire::{child::PrivilegedAction, Error};

/// Sets a user's SELinux login mapping, adding it or updating an existing one.
#[derive(Debug, Clone)]
pub struct SemanageLogin {
    program: PathBuf,
}

impl SemanageLogin {
    pub fn new() -> Self {
        Self::with_program("semanage")
    }

    /// Uses `program` in place of `semanage`, which must accept the same arguments.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn login(
        &self,
        op: &str,
        username: &str,
        seuser: &str,
        mls_range: &str,
    ) -> Result<Output, Error> {
        log::debug!("{} login {} {}", self.program.display(), op, username);
        // stdout carries the response frame, so the tool's output is always captured.
        let output = Command::new(&self.program)
            .args(["login", op, "--seuser", seuser, "--range", mls_range])
            .arg("--")
            .arg(username)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                log::error!("cannot run {}: {}", self.program.display(), e);
                Error::from(e)
            })?;
        if !output.status.success() {
            log::debug!(
                "login {} failed ({}): {}",
                op,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        Ok(output)
    }
}

impl Default for SemanageLogin {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedAction for SemanageLogin {
    fn invoke(&mut self, username: &str, seuser: &str, mls_range: &str) -> Result<u32, Error> {
        let added = self.login("--add", username, seuser, mls_range)?;
        if added.status.success() {
            log::info!("added login mapping for {}", username);
            return Ok(0);
        }

        // The mapping most likely exists already.
        let modified = self.login("--modify", username, seuser, mls_range)?;
        if modified.status.success() {
            log::info!("modified login mapping for {}", username);
            return Ok(0);
        }

        let code = modified.status.code().unwrap_or(-1);
        log::error!("cannot set login mapping for {}: exit status {}", username, code);
        Err(Error::PrivilegedActionFailed(code))
    }
}
