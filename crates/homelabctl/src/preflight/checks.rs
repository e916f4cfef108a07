//! The individual pre-flight checks.
//!
//! Every check probes host state through the command boundary, prints
//! what it found, and returns its error/warning counts. No check
//! mutates the system.

use anyhow::Result;
use homelab_common::command_exec::RunOptions;
use homelab_common::markers::legacy_home_setup_marker;
use homelab_common::probes::{self, ContainerRuntime};
use homelab_common::{display, elevation};
use std::path::Path;
use walkdir::WalkDir;

use super::{
    CheckContext, CheckOutcome, CONNECTIVITY_HOST, CORE_COMMANDS, CORE_PACKAGES,
    EXPECTED_SERVICES, TEMPLATE_DIRS,
};

pub(super) fn operating_system(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    if probes::ostree_host(ctx.runner) {
        display::success("rpm-ostree detected - running on UBlue uCore");

        if let Some(id) = probes::deployment_id(ctx.runner) {
            display::info(&format!("Current deployment: {}", id));
        }

        if probes::image_identity_confirmed(ctx.runner) {
            display::success("Custom BlueBuild image detected");
        } else {
            display::warning("Could not confirm BlueBuild custom image");
            outcome.warn();
        }
    } else {
        display::error("rpm-ostree not found - this system does not appear to be UBlue uCore");
        display::error("This tool is designed specifically for UBlue uCore");
        outcome.error();
    }

    Ok(outcome)
}

pub(super) fn required_packages(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();
    let mut missing = Vec::new();

    for &package in CORE_PACKAGES {
        if probes::package_installed(ctx.runner, package) {
            display::success(&format!("{} is installed", package));
        } else {
            display::error(&format!("{} is NOT installed", package));
            missing.push(package);
            outcome.error();
        }
    }

    // At least one runtime package set is required.
    let mut found_runtime = false;
    for runtime in ContainerRuntime::ALL {
        if !probes::package_installed(ctx.runner, runtime.command()) {
            continue;
        }

        display::success(&format!("{} is installed", runtime.command()));
        found_runtime = true;

        let compose = runtime.compose_helper();
        if probes::package_installed(ctx.runner, compose)
            || probes::command_on_path(ctx.runner, compose)
        {
            display::success(&format!("{} is available", compose));
        } else {
            display::warning(&format!(
                "{} is not installed (may be available via plugin)",
                compose
            ));
            outcome.warn();
        }

        break;
    }

    if !found_runtime {
        display::error("No container runtime found (podman or docker required)");
        display::info("  For Podman: sudo rpm-ostree install podman podman-compose");
        display::info("  For Docker: sudo rpm-ostree install docker docker-compose");
        outcome.error();
    }

    if !missing.is_empty() {
        println!();
        display::error("Missing required packages. To install them:");
        display::info(&format!("  sudo rpm-ostree install {}", missing.join(" ")));
        display::info("  sudo systemctl reboot");
        println!();
        display::warning("Note: On immutable systems, you need to layer packages and reboot");
    }

    Ok(outcome)
}

pub(super) fn required_commands(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    for &command in CORE_COMMANDS {
        if probes::command_on_path(ctx.runner, command) {
            display::success(&format!("{} command available", command));
        } else {
            display::error(&format!("{} command NOT found", command));
            outcome.error();
        }
    }

    match probes::detect_container_runtime(ctx.runner) {
        Some(runtime) => {
            display::success(&format!("{} command available", runtime.command()));

            match probes::compose_command(ctx.runner, runtime) {
                Some(compose) if compose == runtime.compose_helper() => {
                    display::success(&format!("{} command available", compose));
                }
                Some(compose) => {
                    display::success(&format!("{} command available (via plugin)", compose));
                }
                None => {
                    display::warning(&format!("{} not found", runtime.compose_helper()));
                }
            }
        }
        None => {
            display::error("No container runtime command found");
            outcome.error();
        }
    }

    Ok(outcome)
}

pub(super) fn expected_services(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();
    let mut found = 0;
    let mut missing = 0;

    for &service in EXPECTED_SERVICES {
        match probes::unit_file_location(ctx.runner, service) {
            Some(location) => {
                display::success(&format!("{} found at {}", service, location));
                found += 1;
            }
            None => {
                display::warning(&format!(
                    "{} not found (will be created during setup)",
                    service
                ));
                missing += 1;
                outcome.warn();
            }
        }
    }

    println!();
    if found > 0 {
        display::success(&format!(
            "{} pre-configured services found from BlueBuild image",
            found
        ));
        display::info("These services will be enabled and started (not recreated)");
    }

    if missing > 0 {
        display::info(&format!(
            "{} services not found (will be created during setup)",
            missing
        ));
    }

    Ok(outcome)
}

pub(super) fn template_locations(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();
    let home_setup = ctx.home.join("setup");
    let mut found_templates = 0;

    let marker = legacy_home_setup_marker(&ctx.home);
    if marker.exists() {
        display::success("Home directory setup marker found");

        for template_dir in TEMPLATE_DIRS {
            let path = home_setup.join(template_dir);
            if path.exists() {
                let files = count_entries(&path);
                display::success(&format!(
                    "Template directory found: {} ({} files)",
                    path.display(),
                    files
                ));
                found_templates += 1;
            } else {
                display::warning(&format!("Template directory not found: {}", path.display()));
                outcome.warn();
            }
        }
    } else {
        display::warning("Home directory setup marker not found");
        display::info(&format!("Expected marker: {}", marker.display()));
        display::info("This suggests home-directory-setup.service hasn't run yet");
        outcome.warn();
    }

    for template_dir in TEMPLATE_DIRS {
        let usr_share = Path::new("/usr/share").join(template_dir);
        if usr_share.exists() {
            display::info(&format!("Fallback templates found in: {}", usr_share.display()));
        }
    }

    if found_templates == 0 {
        display::warning(&format!(
            "No template directories found in {}",
            home_setup.display()
        ));
        display::info("Setup scripts will look for templates in /usr/share as fallback");
    }

    Ok(outcome)
}

/// Entries under a template directory, the directory itself excluded.
fn count_entries(path: &Path) -> usize {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .count()
        .saturating_sub(1)
}

pub(super) fn network_connectivity(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    if probes::reachable(ctx.runner, CONNECTIVITY_HOST, 3) {
        display::success("Internet connectivity available");
    } else {
        display::error("No internet connectivity (required for container image pulls)");
        outcome.error();
    }

    match probes::default_gateway(ctx.runner) {
        Some(gateway) => {
            display::success(&format!("Default gateway: {}", gateway));
            if probes::reachable(ctx.runner, &gateway, 2) {
                display::success("Default gateway is reachable");
            } else {
                display::warning("Default gateway is not responding to ping");
                outcome.warn();
            }
        }
        None => {
            display::error("No default gateway configured");
            outcome.error();
        }
    }

    match ctx.config.nfs_server() {
        Some(server) => {
            display::info(&format!("Testing configured NFS server: {}", server));
            if probes::reachable(ctx.runner, server, 3) {
                display::success(&format!("NFS server {} is reachable", server));
            } else {
                display::warning(&format!("NFS server {} is not reachable", server));
                display::info("You may need to configure the NFS server during setup");
                outcome.warn();
            }
        }
        None => {
            display::info("NFS server not yet configured (will be set during setup)");
        }
    }

    Ok(outcome)
}

pub(super) fn user_environment(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    let user = ctx.user.as_deref().unwrap_or("unknown");
    display::success(&format!("Running as user: {}", user));
    display::info(&format!(
        "UID: {}, GID: {}",
        nix::unistd::getuid(),
        nix::unistd::getgid()
    ));

    if elevation::passwordless_available(ctx.runner) {
        display::success("Passwordless sudo access available");
    } else {
        display::info("Sudo access available (may require password)");
        if ctx
            .runner
            .run(&["sudo", "-v"], RunOptions::checked())
            .is_err()
        {
            display::error("Failed to obtain sudo privileges");
            outcome.error();
        }
    }

    let groups = probes::user_groups(ctx.runner);
    if !groups.is_empty() {
        display::info(&format!("User groups: {}", groups.join(" ")));

        if groups.iter().any(|g| g == "wheel" || g == "podman") {
            display::success("User is in privileged group (wheel or podman)");
        } else {
            display::warning("User is not in wheel or podman group");
            outcome.warn();
        }
    }

    if home_writable(&ctx.home) {
        display::success(&format!("Home directory is writable: {}", ctx.home.display()));
    } else {
        display::error(&format!(
            "Home directory is not writable: {}",
            ctx.home.display()
        ));
        outcome.error();
    }

    Ok(outcome)
}

/// Probe writability by creating and removing a scratch file.
fn home_writable(home: &Path) -> bool {
    let probe = home.join(".homelab-write-check");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

pub(super) fn runtime_configuration(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    let runtime = match probes::detect_container_runtime(ctx.runner) {
        Some(runtime) => runtime,
        None => {
            display::info("No container runtime available, skipping runtime checks");
            return Ok(outcome);
        }
    };

    if let Some(version) = probes::runtime_version(ctx.runner, runtime) {
        display::success(&version);
    }

    if let Some(count) = probes::existing_containers(ctx.runner, runtime) {
        if count > 0 {
            display::info(&format!("Found {} existing container(s)", count));
            display::warning("Existing containers may conflict with homelab setup");
            outcome.warn();
        } else {
            display::success("No existing containers found");
        }
    }

    if probes::runtime_networking_ok(ctx.runner, runtime) {
        display::success(&format!("{} networking is functional", runtime.command()));
    } else {
        display::error(&format!("{} networking is not available", runtime.command()));
        outcome.error();
    }

    // Subordinate id mappings only matter for rootless podman.
    if runtime == ContainerRuntime::Podman {
        if let Some(user) = ctx.user.as_deref() {
            for file in ["/etc/subuid", "/etc/subgid"] {
                if probes::subid_mapping_present(ctx.runner, file, user) {
                    display::success(&format!("User mapping configured in {}", file));
                } else {
                    display::warning(&format!("User mapping not found in {}", file));
                    outcome.warn();
                }
            }
        }
    }

    Ok(outcome)
}

pub(super) fn firewall_status(ctx: &CheckContext) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    if probes::firewall_active(ctx.runner) {
        display::info("Firewalld is active");
        display::warning("You may need to configure firewall rules for container services");
        outcome.warn();
    } else {
        display::info("Firewalld is not active");
    }

    Ok(outcome)
}

pub(super) fn security_module(ctx: &CheckContext) -> Result<CheckOutcome> {
    match probes::selinux_mode(ctx.runner) {
        Some(mode) => {
            display::info(&format!("SELinux status: {}", mode));
            if mode == "Enforcing" {
                display::info("SELinux is enforcing (this is good for security)");
                display::info("Podman should handle SELinux contexts automatically");
            }
        }
        None => {
            display::info("SELinux commands not available");
        }
    }

    Ok(CheckOutcome::default())
}
