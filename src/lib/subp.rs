// SPDX-License-Identifier: Apache-2.0

use std::process::Command;

use crate::ProcessError;

/// Runs external programs. Tests substitute a recording fake.
pub trait CommandRunner {
    /// Run the command to completion, returning `(stdout, stderr)` on zero
    /// exit status.
    fn run(&self, cmd: &[&str]) -> Result<(String, String), ProcessError>;
}

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &[&str]) -> Result<(String, String), ProcessError> {
        let (program, args) = match cmd.split_first() {
            Some(s) => s,
            None => {
                return Err(ProcessError::new(
                    cmd,
                    None,
                    String::new(),
                    "Empty command".to_string(),
                ));
            }
        };
        log::debug!("Running {}", cmd.join(" "));
        let output = Command::new(program).args(args).output().map_err(|e| {
            ProcessError::new(cmd, None, String::new(), e.to_string())
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            Ok((stdout, stderr))
        } else {
            Err(ProcessError::new(
                cmd,
                output.status.code(),
                stdout,
                stderr,
            ))
        }
    }
}
