//! Pre-flight environment validation.
//!
//! Verifies that the host is ready for homelab setup by checking the
//! operating system, required packages and commands, pre-existing
//! systemd services from the BlueBuild image, template locations,
//! network connectivity, user environment, container runtime
//! configuration, firewall and SELinux state.
//!
//! Each check is a pure reporting function with no side effects other
//! than console output; the orchestrator owns counting and verdict
//! policy. One failing probe must not block the rest of the report.

mod checks;

use anyhow::{Context, Result};
use homelab_common::command_exec::{CommandRunner, SystemRunner};
use homelab_common::config::SetupConfig;
use homelab_common::markers::{self, Markers};
use homelab_common::{display, elevation, probes};
use std::path::PathBuf;

/// Packages every deployment needs, runtime aside.
pub const CORE_PACKAGES: &[&str] = &["nfs-utils", "wireguard-tools"];

/// Commands every deployment needs, runtime aside.
pub const CORE_COMMANDS: &[&str] = &["wg", "mount.nfs", "systemctl"];

/// Service units expected from the BlueBuild image.
pub const EXPECTED_SERVICES: &[&str] = &[
    "podman-compose-media.service",
    "podman-compose-web.service",
    "podman-compose-cloud.service",
];

/// Template directories expected under `~/setup`.
pub const TEMPLATE_DIRS: &[&str] = &["compose-setup", "wireguard-setup"];

/// Well-known host probed for internet reachability.
pub const CONNECTIVITY_HOST: &str = "8.8.8.8";

/// Everything a check may consult. Constructed once per run and passed
/// by reference; checks re-derive any runtime facts they need instead
/// of sharing mutable state.
pub struct CheckContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub config: &'a SetupConfig,
    pub home: PathBuf,
    pub user: Option<String>,
}

/// Error/warning counts reported by one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub errors: u32,
    pub warnings: u32,
}

impl CheckOutcome {
    pub fn error(&mut self) {
        self.errors += 1;
    }

    pub fn warn(&mut self) {
        self.warnings += 1;
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

impl std::ops::AddAssign for CheckOutcome {
    fn add_assign(&mut self, other: Self) {
        self.errors += other.errors;
        self.warnings += other.warnings;
    }
}

/// The fixed, ordered check list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    OperatingSystem,
    RequiredPackages,
    RequiredCommands,
    ExpectedServices,
    TemplateLocations,
    NetworkConnectivity,
    UserEnvironment,
    RuntimeConfiguration,
    FirewallStatus,
    SecurityModule,
}

impl Check {
    pub const ALL: [Check; 10] = [
        Check::OperatingSystem,
        Check::RequiredPackages,
        Check::RequiredCommands,
        Check::ExpectedServices,
        Check::TemplateLocations,
        Check::NetworkConnectivity,
        Check::UserEnvironment,
        Check::RuntimeConfiguration,
        Check::FirewallStatus,
        Check::SecurityModule,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Check::OperatingSystem => "Checking Operating System",
            Check::RequiredPackages => "Checking Required Packages",
            Check::RequiredCommands => "Checking Required Commands",
            Check::ExpectedServices => "Checking Pre-configured Systemd Services",
            Check::TemplateLocations => "Checking Template Locations",
            Check::NetworkConnectivity => "Checking Network Connectivity",
            Check::UserEnvironment => "Checking User Environment",
            Check::RuntimeConfiguration => "Checking Container Runtime Configuration",
            Check::FirewallStatus => "Checking Firewall Status",
            Check::SecurityModule => "Checking SELinux Status",
        }
    }

    pub fn run(&self, ctx: &CheckContext) -> Result<CheckOutcome> {
        match self {
            Check::OperatingSystem => checks::operating_system(ctx),
            Check::RequiredPackages => checks::required_packages(ctx),
            Check::RequiredCommands => checks::required_commands(ctx),
            Check::ExpectedServices => checks::expected_services(ctx),
            Check::TemplateLocations => checks::template_locations(ctx),
            Check::NetworkConnectivity => checks::network_connectivity(ctx),
            Check::UserEnvironment => checks::user_environment(ctx),
            Check::RuntimeConfiguration => checks::runtime_configuration(ctx),
            Check::FirewallStatus => checks::firewall_status(ctx),
            Check::SecurityModule => checks::security_module(ctx),
        }
    }
}

/// Final verdict over the summed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Zero errors, zero warnings.
    Pass,
    /// Zero errors, advisory warnings only. Same exit code as a pass.
    PassWithWarnings,
    /// One or more errors.
    Fail,
}

pub fn verdict(totals: &CheckOutcome) -> Verdict {
    if totals.errors > 0 {
        Verdict::Fail
    } else if totals.warnings > 0 {
        Verdict::PassWithWarnings
    } else {
        Verdict::Pass
    }
}

/// Run every check in order, non-short-circuiting, and sum the counts.
///
/// An error escaping a check is printed and converted to exactly one
/// counted error; the remaining checks still run.
pub fn run_checks(ctx: &CheckContext) -> CheckOutcome {
    let mut totals = CheckOutcome::default();

    for check in Check::ALL {
        display::step(check.title());
        match check.run(ctx) {
            Ok(outcome) => totals += outcome,
            Err(e) => {
                display::error(&format!("Check failed: {:#}", e));
                totals.error();
            }
        }
    }

    totals
}

/// Print the summary, create the completion marker when error-free,
/// and map the totals to an exit code.
pub fn finish(totals: &CheckOutcome, markers: &Markers) -> Result<i32> {
    print_summary(totals);

    if totals.errors == 0 {
        markers.create(markers::PREFLIGHT_COMPLETE)?;
        display::info("Preflight check marker created");
        Ok(0)
    } else {
        Ok(1)
    }
}

fn print_summary(totals: &CheckOutcome) {
    display::separator();
    println!();

    match verdict(totals) {
        Verdict::Pass => {
            display::success("All pre-flight checks passed!");
            println!();
            display::info("Your system is ready for homelab setup.");
            display::info("You can proceed with the next setup steps.");
        }
        Verdict::PassWithWarnings => {
            display::warning(&format!(
                "Pre-flight checks completed with {} warning(s)",
                totals.warnings
            ));
            println!();
            display::info("Your system should work, but review warnings above.");
            display::info("You can proceed with caution.");
        }
        Verdict::Fail => {
            display::error(&format!(
                "Pre-flight checks failed with {} error(s) and {} warning(s)",
                totals.errors, totals.warnings
            ));
            println!();
            display::error("Please fix the errors above before proceeding.");
            display::info("Critical issues must be resolved for successful setup.");
        }
    }

    println!();
}

/// Run the full pre-flight sequence against the live system.
pub fn run() -> Result<i32> {
    let runner = SystemRunner::new();

    // Fatal preconditions: no partial report past this point.
    if elevation::running_as_root() {
        display::error("This tool should NOT be run as root");
        display::info("Please run as a regular user. Sudo will be used when needed.");
        return Ok(1);
    }

    if let Err(e) = elevation::ensure(&runner) {
        display::error(&format!("{:#}", e));
        return Ok(1);
    }

    display::header("UBlue uCore Homelab - Pre-flight Check");
    display::info("This check verifies your system is ready for homelab setup.");

    let config = SetupConfig::open_default()?;
    let markers = Markers::open_default()?;
    let home = dirs::home_dir().context("cannot determine home directory")?;

    let ctx = CheckContext {
        runner: &runner,
        config: &config,
        home,
        user: probes::current_username(),
    };

    let totals = run_checks(&ctx);
    finish(&totals, &markers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_sums() {
        let mut totals = CheckOutcome::default();
        totals += CheckOutcome {
            errors: 1,
            warnings: 2,
        };
        totals += CheckOutcome {
            errors: 0,
            warnings: 1,
        };

        assert_eq!(totals.errors, 1);
        assert_eq!(totals.warnings, 3);
        assert!(!totals.is_clean());
    }

    #[test]
    fn test_verdict_policy() {
        let pass = CheckOutcome {
            errors: 0,
            warnings: 0,
        };
        let conditional = CheckOutcome {
            errors: 0,
            warnings: 3,
        };
        let fail = CheckOutcome {
            errors: 2,
            warnings: 0,
        };

        assert_eq!(verdict(&pass), Verdict::Pass);
        assert_eq!(verdict(&conditional), Verdict::PassWithWarnings);
        assert_eq!(verdict(&fail), Verdict::Fail);
    }

    #[test]
    fn test_check_order_is_stable() {
        assert_eq!(Check::ALL.len(), 10);
        assert_eq!(Check::ALL[0], Check::OperatingSystem);
        assert_eq!(Check::ALL[9], Check::SecurityModule);
    }
}
