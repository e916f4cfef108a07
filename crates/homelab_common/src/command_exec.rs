//! Command execution boundary.
//!
//! Single layer that runs an OS command, captures real exit code,
//! stdout and stderr, and returns structured results without
//! reinterpretation. Every probe and check in the workspace goes
//! through the [`CommandRunner`] trait so the whole tool can be
//! exercised against a scripted fake.

use serde::{Deserialize, Serialize};
use std::process::Command;
use thiserror::Error;

/// Maximum output length to capture per stream.
const MAX_OUTPUT_BYTES: usize = 64 * 1024; // 64KB

/// How a command should be executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Prepend `sudo` to the argument vector.
    pub elevate: bool,
    /// Treat a non-zero exit as a [`CommandError::NonZeroExit`].
    pub check: bool,
}

impl RunOptions {
    /// Options demanding a zero exit code.
    pub fn checked() -> Self {
        Self {
            elevate: false,
            check: true,
        }
    }

    /// Elevated options demanding a zero exit code.
    pub fn elevated_checked() -> Self {
        Self {
            elevate: true,
            check: true,
        }
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Full command line that was executed.
    pub command: String,
    /// Exit code (0 = success, -1 when no code was available).
    pub exit_code: i32,
    /// Captured stdout (truncated if too long).
    pub stdout: String,
    /// Captured stderr (truncated if too long).
    pub stderr: String,
    /// Execution outcome.
    pub status: ExecutionStatus,
}

impl CommandResult {
    /// Whether the command ran and exited zero.
    pub fn success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Closed set of execution outcomes.
///
/// Probes pattern-match on this instead of catching a generic error:
/// absence of a capability is a reportable fact, not an application
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Command ran and exited zero.
    Success,
    /// Command ran but returned a non-zero exit code.
    NonZeroExit,
    /// Command not found on the system.
    CommandNotFound,
    /// Permission denied.
    PermissionDenied,
    /// Command timed out.
    Timeout,
    /// Other OS error.
    OsError,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonZeroExit => "non-zero exit",
            Self::CommandNotFound => "command not found",
            Self::PermissionDenied => "permission denied",
            Self::Timeout => "timeout",
            Self::OsError => "OS error",
        }
    }
}

/// Typed failure signal of the command boundary.
///
/// Raised only when the caller demanded strict checking (or the
/// process could not be spawned at all); carries enough context for a
/// readable remediation message.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command failed: {command} (exit code {exit_code})")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("command not found: {command}")]
    NotFound { command: String },

    #[error("failed to execute {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// The sole I/O boundary every higher component depends on.
pub trait CommandRunner {
    /// Execute an argument vector, capturing exit code and streams.
    fn run(&self, argv: &[&str], opts: RunOptions) -> Result<CommandResult, CommandError>;
}

/// Real command runner over [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str], opts: RunOptions) -> Result<CommandResult, CommandError> {
        let mut full: Vec<&str> = Vec::with_capacity(argv.len() + 1);
        if opts.elevate {
            full.push("sudo");
        }
        full.extend_from_slice(argv);

        let command_line = full.join(" ");
        let (program, args) = match full.split_first() {
            Some(parts) => parts,
            None => {
                return Err(CommandError::Io {
                    command: command_line,
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "empty argument vector",
                    ),
                })
            }
        };

        tracing::debug!(command = %command_line, "running command");

        match Command::new(program).args(args).output() {
            Ok(output) => {
                let stdout = truncate_output(&output.stdout);
                let stderr = truncate_output(&output.stderr);
                let exit_code = output.status.code().unwrap_or(-1);

                let status = if output.status.success() {
                    ExecutionStatus::Success
                } else if stderr.contains("Permission denied") {
                    ExecutionStatus::PermissionDenied
                } else {
                    ExecutionStatus::NonZeroExit
                };

                if opts.check && !output.status.success() {
                    return Err(CommandError::NonZeroExit {
                        command: command_line,
                        exit_code,
                        stderr,
                    });
                }

                Ok(CommandResult {
                    command: command_line,
                    exit_code,
                    stdout,
                    stderr,
                    status,
                })
            }
            Err(e) => {
                let status = match e.kind() {
                    std::io::ErrorKind::NotFound => ExecutionStatus::CommandNotFound,
                    std::io::ErrorKind::PermissionDenied => ExecutionStatus::PermissionDenied,
                    _ => ExecutionStatus::OsError,
                };

                if opts.check {
                    return Err(match status {
                        ExecutionStatus::CommandNotFound => CommandError::NotFound {
                            command: command_line,
                        },
                        _ => CommandError::Io {
                            command: command_line,
                            source: e,
                        },
                    });
                }

                Ok(CommandResult {
                    command: command_line,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("OS error: {}", e),
                    status,
                })
            }
        }
    }
}

/// Truncate captured output, converting to a lossy string.
fn truncate_output(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_OUTPUT_BYTES {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    String::from_utf8_lossy(slice).to_string()
}
