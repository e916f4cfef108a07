//! Deterministic test double for the command boundary.
//!
//! `ScriptedRunner` answers commands from a rule table instead of the
//! host, so probes and checks can be exercised against any system
//! state. Intended for tests; lives in the library so integration
//! suites in dependent crates can use it.

use crate::command_exec::{CommandError, CommandResult, CommandRunner, ExecutionStatus, RunOptions};

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    status: ExecutionStatus,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// Scripted command runner.
///
/// Rules match by prefix against the full command line (including a
/// `sudo` prefix for elevated runs). The most recently added matching
/// rule wins, so tests can layer overrides on a base script. Commands
/// with no matching rule answer with the configured default status.
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    default_status: ExecutionStatus,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// Runner where unscripted commands fail with a non-zero exit.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_status: ExecutionStatus::NonZeroExit,
        }
    }

    /// Runner where unscripted commands succeed with empty output.
    pub fn all_ok() -> Self {
        Self {
            rules: Vec::new(),
            default_status: ExecutionStatus::Success,
        }
    }

    /// Script a successful command with the given stdout.
    pub fn ok(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            status: ExecutionStatus::Success,
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    /// Script a command that exits non-zero.
    pub fn fail(mut self, prefix: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            status: ExecutionStatus::NonZeroExit,
            exit_code: 1,
            stdout: String::new(),
            stderr: String::new(),
        });
        self
    }

    /// Script a command that is not present on the system.
    pub fn missing(mut self, prefix: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            status: ExecutionStatus::CommandNotFound,
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
        });
        self
    }

    fn lookup(&self, command_line: &str) -> Rule {
        self.rules
            .iter()
            .rev()
            .find(|rule| command_line.starts_with(&rule.prefix))
            .cloned()
            .unwrap_or(Rule {
                prefix: String::new(),
                status: self.default_status,
                exit_code: match self.default_status {
                    ExecutionStatus::Success => 0,
                    ExecutionStatus::CommandNotFound => -1,
                    _ => 1,
                },
                stdout: String::new(),
                stderr: String::new(),
            })
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[&str], opts: RunOptions) -> Result<CommandResult, CommandError> {
        let mut full: Vec<&str> = Vec::with_capacity(argv.len() + 1);
        if opts.elevate {
            full.push("sudo");
        }
        full.extend_from_slice(argv);
        let command_line = full.join(" ");

        let rule = self.lookup(&command_line);

        if opts.check && rule.status != ExecutionStatus::Success {
            return Err(match rule.status {
                ExecutionStatus::CommandNotFound => CommandError::NotFound {
                    command: command_line,
                },
                _ => CommandError::NonZeroExit {
                    command: command_line,
                    exit_code: rule.exit_code,
                    stderr: rule.stderr,
                },
            });
        }

        Ok(CommandResult {
            command: command_line,
            exit_code: rule.exit_code,
            stdout: rule.stdout,
            stderr: rule.stderr,
            status: rule.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscripted_commands_use_default() {
        let strict = ScriptedRunner::new();
        let result = strict.run(&["anything"], RunOptions::default()).unwrap();
        assert_eq!(result.status, ExecutionStatus::NonZeroExit);

        let permissive = ScriptedRunner::all_ok();
        let result = permissive.run(&["anything"], RunOptions::default()).unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_later_rules_override_earlier() {
        let runner = ScriptedRunner::all_ok()
            .ok("which podman", "/usr/bin/podman\n")
            .missing("which podman");

        let result = runner
            .run(&["which", "podman"], RunOptions::default())
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::CommandNotFound);
    }

    #[test]
    fn test_longer_prefix_still_matches_specifically() {
        let runner = ScriptedRunner::new()
            .ok("rpm -q podman", "podman-5.0\n")
            .fail("rpm -q podman-compose");

        let helper = runner
            .run(&["rpm", "-q", "podman-compose"], RunOptions::default())
            .unwrap();
        assert_eq!(helper.status, ExecutionStatus::NonZeroExit);

        let runtime = runner
            .run(&["rpm", "-q", "podman"], RunOptions::default())
            .unwrap();
        assert_eq!(runtime.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_check_surfaces_typed_errors() {
        let runner = ScriptedRunner::new()
            .fail("sudo -v")
            .missing("which wg");

        match runner.run(&["sudo", "-v"], RunOptions::checked()) {
            Err(CommandError::NonZeroExit { exit_code, .. }) => assert_eq!(exit_code, 1),
            other => panic!("expected NonZeroExit, got {:?}", other),
        }

        match runner.run(&["which", "wg"], RunOptions::checked()) {
            Err(CommandError::NotFound { command }) => assert_eq!(command, "which wg"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_elevated_command_line_includes_sudo() {
        let runner = ScriptedRunner::new().ok("sudo systemctl daemon-reload", "");
        let opts = RunOptions {
            elevate: true,
            check: false,
        };

        let result = runner
            .run(&["systemctl", "daemon-reload"], opts)
            .unwrap();
        assert!(result.success());
        assert_eq!(result.command, "sudo systemctl daemon-reload");
    }
}
