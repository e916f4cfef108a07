//! Read-only system probes.
//!
//! Thin queries over the command boundary. None of these mutate host
//! state, and every runner failure maps to `false`/`None`: absence of
//! a capability is a reportable fact, not an application error.

use crate::command_exec::{CommandResult, CommandRunner, RunOptions};

fn quiet(runner: &dyn CommandRunner, argv: &[&str]) -> Option<CommandResult> {
    runner.run(argv, RunOptions::default()).ok()
}

fn succeeds(runner: &dyn CommandRunner, argv: &[&str]) -> bool {
    quiet(runner, argv).map(|r| r.success()).unwrap_or(false)
}

/// Whether a command is resolvable on PATH.
pub fn command_on_path(runner: &dyn CommandRunner, name: &str) -> bool {
    succeeds(runner, &["which", name])
}

/// Whether an RPM package is installed.
pub fn package_installed(runner: &dyn CommandRunner, package: &str) -> bool {
    succeeds(runner, &["rpm", "-q", package])
}

/// Whether this host is an rpm-ostree (uCore) system.
pub fn ostree_host(runner: &dyn CommandRunner) -> bool {
    command_on_path(runner, "rpm-ostree")
}

/// Identifier of the currently booted ostree deployment.
pub fn deployment_id(runner: &dyn CommandRunner) -> Option<String> {
    let result = quiet(runner, &["rpm-ostree", "status", "--json"])?;
    if !result.success() {
        return None;
    }

    let status: serde_json::Value = serde_json::from_str(&result.stdout).ok()?;
    status
        .get("deployments")?
        .get(0)?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Whether the deployment identifies itself as a uCore/BlueBuild image.
pub fn image_identity_confirmed(runner: &dyn CommandRunner) -> bool {
    quiet(runner, &["rpm-ostree", "status"])
        .filter(|r| r.success())
        .map(|r| {
            let stdout = r.stdout.to_lowercase();
            stdout.contains("bluebuild") || stdout.contains("ucore")
        })
        .unwrap_or(false)
}

/// Whether a systemd unit file exists anywhere systemd looks.
pub fn unit_file_exists(runner: &dyn CommandRunner, unit: &str) -> bool {
    unit_file_location(runner, unit).is_some()
}

/// Path of a systemd unit file, from `systemctl cat`'s comment header.
pub fn unit_file_location(runner: &dyn CommandRunner, unit: &str) -> Option<String> {
    let result = quiet(runner, &["systemctl", "cat", unit])?;
    if !result.success() {
        return None;
    }

    result
        .stdout
        .lines()
        .next()?
        .strip_prefix("# ")
        .map(str::to_string)
}

/// Whether a systemd unit is active.
pub fn service_active(runner: &dyn CommandRunner, unit: &str) -> bool {
    succeeds(runner, &["systemctl", "is-active", "--quiet", unit])
}

/// Whether a systemd unit is enabled.
pub fn service_enabled(runner: &dyn CommandRunner, unit: &str) -> bool {
    succeeds(runner, &["systemctl", "is-enabled", "--quiet", unit])
}

/// Supported container runtimes, in detection preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Podman,
    Docker,
}

impl ContainerRuntime {
    pub const ALL: [ContainerRuntime; 2] = [ContainerRuntime::Podman, ContainerRuntime::Docker];

    /// Runtime command (and package) name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }

    /// Dedicated compose helper for this runtime.
    pub fn compose_helper(&self) -> &'static str {
        match self {
            Self::Podman => "podman-compose",
            Self::Docker => "docker-compose",
        }
    }
}

/// Detect the available container runtime, podman preferred.
pub fn detect_container_runtime(runner: &dyn CommandRunner) -> Option<ContainerRuntime> {
    ContainerRuntime::ALL
        .into_iter()
        .find(|rt| command_on_path(runner, rt.command()))
}

/// The compose command usable with `runtime`: the dedicated helper if
/// present, otherwise the `<runtime> compose` plugin if it responds.
pub fn compose_command(runner: &dyn CommandRunner, runtime: ContainerRuntime) -> Option<String> {
    if command_on_path(runner, runtime.compose_helper()) {
        return Some(runtime.compose_helper().to_string());
    }

    if succeeds(runner, &[runtime.command(), "compose", "version"]) {
        return Some(format!("{} compose", runtime.command()));
    }

    None
}

/// Version line reported by the runtime itself.
pub fn runtime_version(runner: &dyn CommandRunner, runtime: ContainerRuntime) -> Option<String> {
    let result = quiet(runner, &[runtime.command(), "--version"])?;
    if !result.success() {
        return None;
    }

    let version = result.stdout.trim().to_string();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Number of existing containers (running or not), if the runtime
/// answered.
pub fn existing_containers(
    runner: &dyn CommandRunner,
    runtime: ContainerRuntime,
) -> Option<usize> {
    let result = quiet(
        runner,
        &[runtime.command(), "ps", "-a", "--format", "{{.Names}}"],
    )?;
    if !result.success() {
        return None;
    }

    Some(
        result
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count(),
    )
}

/// Whether the runtime's network subsystem responds.
pub fn runtime_networking_ok(runner: &dyn CommandRunner, runtime: ContainerRuntime) -> bool {
    succeeds(runner, &[runtime.command(), "network", "ls"])
}

/// Whether firewalld is active.
pub fn firewall_active(runner: &dyn CommandRunner) -> bool {
    service_active(runner, "firewalld")
}

/// Whether `host` answers a single ping within `timeout_secs`.
pub fn reachable(runner: &dyn CommandRunner, host: &str, timeout_secs: u32) -> bool {
    let timeout = timeout_secs.to_string();
    succeeds(runner, &["ping", "-c", "1", "-W", &timeout, host])
}

/// Default gateway address from the routing table.
pub fn default_gateway(runner: &dyn CommandRunner) -> Option<String> {
    default_route_field(runner, 2)
}

/// Interface carrying the default route.
pub fn default_interface(runner: &dyn CommandRunner) -> Option<String> {
    let route = default_route(runner)?;
    let parts: Vec<&str> = route.split_whitespace().collect();
    parts
        .iter()
        .position(|p| *p == "dev")
        .and_then(|i| parts.get(i + 1))
        .map(|s| s.to_string())
}

fn default_route(runner: &dyn CommandRunner) -> Option<String> {
    let result = quiet(runner, &["ip", "route"])?;
    if !result.success() {
        return None;
    }

    result
        .stdout
        .lines()
        .find(|line| line.starts_with("default"))
        .map(str::to_string)
}

fn default_route_field(runner: &dyn CommandRunner, index: usize) -> Option<String> {
    let route = default_route(runner)?;
    route.split_whitespace().nth(index).map(str::to_string)
}

/// Current SELinux mode (Enforcing/Permissive/Disabled), if available.
pub fn selinux_mode(runner: &dyn CommandRunner) -> Option<String> {
    let result = quiet(runner, &["getenforce"])?;
    if !result.success() {
        return None;
    }

    let mode = result.stdout.trim().to_string();
    if mode.is_empty() {
        None
    } else {
        Some(mode)
    }
}

/// Group names of the invoking user.
pub fn user_groups(runner: &dyn CommandRunner) -> Vec<String> {
    quiet(runner, &["id", "-Gn"])
        .filter(|r| r.success())
        .map(|r| r.stdout.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Whether `file` (/etc/subuid or /etc/subgid) carries a subordinate
/// id mapping for `user`. A missing file reads as unmapped.
pub fn subid_mapping_present(runner: &dyn CommandRunner, file: &str, user: &str) -> bool {
    let pattern = format!("^{}:", user);
    succeeds(runner, &["grep", "-s", "-q", &pattern, file])
}

/// Name of the invoking user from the environment.
pub fn current_username() -> Option<String> {
    std::env::var("USER").ok().filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_command_on_path() {
        let runner = ScriptedRunner::new()
            .ok("which wg", "/usr/bin/wg\n")
            .fail("which mount.nfs");

        assert!(command_on_path(&runner, "wg"));
        assert!(!command_on_path(&runner, "mount.nfs"));
    }

    #[test]
    fn test_package_installed_swallows_missing_rpm() {
        let runner = ScriptedRunner::new().missing("rpm -q nfs-utils");
        assert!(!package_installed(&runner, "nfs-utils"));
    }

    #[test]
    fn test_deployment_id_parses_status_json() {
        let json = r#"{"deployments":[{"id":"fedora-coreos-41.2024","booted":true}]}"#;
        let runner = ScriptedRunner::new().ok("rpm-ostree status --json", json);

        assert_eq!(
            deployment_id(&runner).as_deref(),
            Some("fedora-coreos-41.2024")
        );
    }

    #[test]
    fn test_deployment_id_none_on_garbage() {
        let runner = ScriptedRunner::new().ok("rpm-ostree status --json", "not json");
        assert_eq!(deployment_id(&runner), None);
    }

    #[test]
    fn test_image_identity() {
        let runner = ScriptedRunner::new().ok("rpm-ostree status", "ostree-image: uCore BlueBuild\n");
        assert!(image_identity_confirmed(&runner));

        let runner = ScriptedRunner::new().ok("rpm-ostree status", "plain fedora\n");
        assert!(!image_identity_confirmed(&runner));
    }

    #[test]
    fn test_unit_file_location_from_cat_header() {
        let runner = ScriptedRunner::new().ok(
            "systemctl cat podman-compose-media.service",
            "# /etc/systemd/system/podman-compose-media.service\n[Unit]\n",
        );

        assert_eq!(
            unit_file_location(&runner, "podman-compose-media.service").as_deref(),
            Some("/etc/systemd/system/podman-compose-media.service")
        );
        assert!(unit_file_exists(&runner, "podman-compose-media.service"));
    }

    #[test]
    fn test_unit_file_missing() {
        let runner = ScriptedRunner::new().fail("systemctl cat missing.service");
        assert!(!unit_file_exists(&runner, "missing.service"));
    }

    #[test]
    fn test_detect_runtime_prefers_podman() {
        let runner = ScriptedRunner::new()
            .ok("which podman", "/usr/bin/podman\n")
            .ok("which docker", "/usr/bin/docker\n");

        assert_eq!(
            detect_container_runtime(&runner),
            Some(ContainerRuntime::Podman)
        );
    }

    #[test]
    fn test_detect_runtime_none() {
        let runner = ScriptedRunner::new()
            .fail("which podman")
            .fail("which docker");

        assert_eq!(detect_container_runtime(&runner), None);
    }

    #[test]
    fn test_compose_command_prefers_helper() {
        let runner = ScriptedRunner::new().ok("which podman-compose", "/usr/bin/podman-compose\n");

        assert_eq!(
            compose_command(&runner, ContainerRuntime::Podman).as_deref(),
            Some("podman-compose")
        );
    }

    #[test]
    fn test_compose_command_falls_back_to_plugin() {
        let runner = ScriptedRunner::new()
            .fail("which docker-compose")
            .ok("docker compose version", "Docker Compose version v2.27\n");

        assert_eq!(
            compose_command(&runner, ContainerRuntime::Docker).as_deref(),
            Some("docker compose")
        );
    }

    #[test]
    fn test_compose_command_absent() {
        let runner = ScriptedRunner::new()
            .fail("which podman-compose")
            .fail("podman compose version");

        assert_eq!(compose_command(&runner, ContainerRuntime::Podman), None);
    }

    #[test]
    fn test_runtime_version() {
        let runner = ScriptedRunner::new().ok("podman --version", "podman version 5.0.2\n");
        assert_eq!(
            runtime_version(&runner, ContainerRuntime::Podman).as_deref(),
            Some("podman version 5.0.2")
        );
    }

    #[test]
    fn test_existing_containers_counts_non_empty_lines() {
        let runner = ScriptedRunner::new().ok(
            "podman ps -a --format {{.Names}}",
            "jellyfin\n\nnextcloud\n",
        );
        assert_eq!(
            existing_containers(&runner, ContainerRuntime::Podman),
            Some(2)
        );
    }

    #[test]
    fn test_existing_containers_none_when_runtime_fails() {
        let runner = ScriptedRunner::new().fail("podman ps -a");
        assert_eq!(existing_containers(&runner, ContainerRuntime::Podman), None);
    }

    #[test]
    fn test_runtime_networking() {
        let runner = ScriptedRunner::new().ok("podman network ls", "NETWORK ID  NAME\n");
        assert!(runtime_networking_ok(&runner, ContainerRuntime::Podman));

        let runner = ScriptedRunner::new().fail("docker network ls");
        assert!(!runtime_networking_ok(&runner, ContainerRuntime::Docker));
    }

    #[test]
    fn test_default_route_parsing() {
        let runner = ScriptedRunner::new().ok(
            "ip route",
            "default via 192.168.1.1 dev enp1s0 proto dhcp metric 100\n\
             192.168.1.0/24 dev enp1s0 proto kernel scope link\n",
        );

        assert_eq!(default_gateway(&runner).as_deref(), Some("192.168.1.1"));
        assert_eq!(default_interface(&runner).as_deref(), Some("enp1s0"));
    }

    #[test]
    fn test_no_default_route() {
        let runner =
            ScriptedRunner::new().ok("ip route", "192.168.1.0/24 dev enp1s0 proto kernel\n");

        assert_eq!(default_gateway(&runner), None);
        assert_eq!(default_interface(&runner), None);
    }

    #[test]
    fn test_reachable_builds_ping_invocation() {
        let runner = ScriptedRunner::new().ok("ping -c 1 -W 3 8.8.8.8", "");
        assert!(reachable(&runner, "8.8.8.8", 3));

        let runner = ScriptedRunner::new().fail("ping -c 1 -W 2 192.168.1.1");
        assert!(!reachable(&runner, "192.168.1.1", 2));
    }

    #[test]
    fn test_selinux_mode() {
        let runner = ScriptedRunner::new().ok("getenforce", "Enforcing\n");
        assert_eq!(selinux_mode(&runner).as_deref(), Some("Enforcing"));

        let runner = ScriptedRunner::new().missing("getenforce");
        assert_eq!(selinux_mode(&runner), None);
    }

    #[test]
    fn test_user_groups() {
        let runner = ScriptedRunner::new().ok("id -Gn", "core wheel podman\n");
        assert_eq!(user_groups(&runner), vec!["core", "wheel", "podman"]);
    }

    #[test]
    fn test_subid_mapping() {
        let runner = ScriptedRunner::new().ok("grep -s -q ^core: /etc/subuid", "");
        assert!(subid_mapping_present(&runner, "/etc/subuid", "core"));

        let runner = ScriptedRunner::new().fail("grep -s -q ^core: /etc/subgid");
        assert!(!subid_mapping_present(&runner, "/etc/subgid", "core"));
    }
}
