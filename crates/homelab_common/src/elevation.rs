//! Privilege escalation checks.
//!
//! The setup tooling must run as a regular user and borrow superuser
//! privileges per-command through sudo.

use crate::command_exec::{CommandRunner, RunOptions};
use crate::display;
use anyhow::{Context, Result};

/// Whether the effective user is the superuser.
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Whether sudo works without a password prompt (or with cached
/// credentials).
pub fn passwordless_available(runner: &dyn CommandRunner) -> bool {
    runner
        .run(&["sudo", "-n", "true"], RunOptions::default())
        .map(|r| r.success())
        .unwrap_or(false)
}

/// Ensure sudo access is obtainable.
///
/// Probes for passwordless access first; otherwise validates
/// interactively with `sudo -v` (the password prompt goes to the
/// controlling terminal). An error here is fatal to the caller.
pub fn ensure(runner: &dyn CommandRunner) -> Result<()> {
    if passwordless_available(runner) {
        return Ok(());
    }

    display::info("This tool requires sudo privileges.");
    runner
        .run(&["sudo", "-v"], RunOptions::checked())
        .context("failed to obtain sudo privileges")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_passwordless_detected() {
        let runner = ScriptedRunner::new().ok("sudo -n true", "");
        assert!(passwordless_available(&runner));
    }

    #[test]
    fn test_passwordless_absent() {
        let runner = ScriptedRunner::new().fail("sudo -n true");
        assert!(!passwordless_available(&runner));
    }

    #[test]
    fn test_ensure_falls_back_to_interactive() {
        let runner = ScriptedRunner::new()
            .fail("sudo -n true")
            .ok("sudo -v", "");
        assert!(ensure(&runner).is_ok());
    }

    #[test]
    fn test_ensure_fails_when_denied() {
        let runner = ScriptedRunner::new()
            .fail("sudo -n true")
            .fail("sudo -v");
        assert!(ensure(&runner).is_err());
    }
}
