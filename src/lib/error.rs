// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    InvalidArgument,
    /// A v1 command is missing required keys or holds malformed values.
    InvalidCommand,
    /// No handler exists for the command or section name.
    UnknownCommandType,
    /// Two parts of the configuration contradict each other.
    ConfigConflict,
    RendererNotFound,
    NoActivator,
    /// External tool exited non-zero or could not be spawned.
    ExecutionError,
    IoError,
}

impl ErrorKind {
    // Only malformed commands may be skipped when `skip_broken` is set,
    // everything else aborts the whole pass.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::InvalidCommand)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct NetCfgError {
    kind: ErrorKind,
    msg: String,
}

impl std::fmt::Display for NetCfgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl Error for NetCfgError {}

impl NetCfgError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self { kind, msg }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }
}

impl From<serde_json::Error> for NetCfgError {
    fn from(e: serde_json::Error) -> Self {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid property: {e}"),
        )
    }
}

impl From<serde_yaml::Error> for NetCfgError {
    fn from(e: serde_yaml::Error) -> Self {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid YAML: {e}"),
        )
    }
}

impl From<std::net::AddrParseError> for NetCfgError {
    fn from(e: std::net::AddrParseError) -> Self {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address : {e}"),
        )
    }
}

impl From<std::io::Error> for NetCfgError {
    fn from(e: std::io::Error) -> Self {
        NetCfgError::new(ErrorKind::IoError, format!("{e}"))
    }
}

/// Failure of an external command, carrying everything needed to diagnose it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProcessError {
    pub cmd: Vec<String>,
    /// `None` when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessError {
    pub fn new(
        cmd: &[&str],
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            exit_code,
            stdout,
            stderr,
        }
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Command '{}' failed with exit code {}: stdout: '{}' \
            stderr: '{}'",
            self.cmd.join(" "),
            match self.exit_code {
                Some(c) => c.to_string(),
                None => "-".to_string(),
            },
            self.stdout.trim(),
            self.stderr.trim(),
        )
    }
}

impl Error for ProcessError {}

impl From<ProcessError> for NetCfgError {
    fn from(e: ProcessError) -> Self {
        NetCfgError::new(ErrorKind::ExecutionError, e.to_string())
    }
}
