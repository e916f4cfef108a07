//! Persistent setup configuration.
//!
//! A single `[homelab]` section of KEY = value pairs stored at
//! `~/.homelab-setup.conf`, created with mode 0600 and re-secured on
//! every save. Values are strings; typed accessors fall back to a
//! caller-supplied default on absence or parse failure and never
//! raise.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Config file name under the home directory.
pub const CONFIG_FILE_NAME: &str = ".homelab-setup.conf";

/// The single section all keys live under.
pub const CONFIG_SECTION: &str = "homelab";

const CONFIG_MODE: u32 = 0o600;

/// Configuration key constants.
pub mod keys {
    pub const SETUP_USER: &str = "SETUP_USER";
    pub const CONTAINER_RUNTIME: &str = "CONTAINER_RUNTIME";
    pub const PUID: &str = "PUID";
    pub const PGID: &str = "PGID";
    pub const TZ: &str = "TZ";
    pub const NFS_SERVER: &str = "NFS_SERVER";
}

/// Default PUID/PGID for container processes.
pub const DEFAULT_PUID: i64 = 1000;
pub const DEFAULT_PGID: i64 = 1000;

/// Default timezone for container services.
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

/// Key/value store over the setup configuration file.
#[derive(Debug)]
pub struct SetupConfig {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SetupConfig {
    /// Open the configuration at the default path under `$HOME`.
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Self::open(home.join(CONFIG_FILE_NAME))
    }

    /// Open (creating if needed) the configuration at `path`.
    ///
    /// The file is created empty with owner-only permissions on first
    /// use; an existing file has its permissions re-secured.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let mut config = Self {
            path,
            values: BTreeMap::new(),
        };

        if config.path.exists() {
            config.load()?;
            secure(&config.path)?;
        } else {
            config.save()?;
        }

        Ok(config)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        self.values.clear();
        let mut in_section = false;

        for line in contents.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_section = name.trim() == CONFIG_SECTION;
                continue;
            }

            if !in_section {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                self.values
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut contents = format!("[{}]\n", CONFIG_SECTION);
        for (key, value) in &self.values {
            contents.push_str(key);
            contents.push_str(" = ");
            contents.push_str(value);
            contents.push('\n');
        }

        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        secure(&self.path)?;

        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    /// Get a configuration value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a configuration value and persist the whole file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get a value as an integer, falling back on absence or parse failure.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// Get a value as a boolean, falling back on absence or parse failure.
    ///
    /// Accepts the values the original configparser accepted:
    /// 1/yes/true/on and 0/no/false/off, case-insensitive.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.to_ascii_lowercase()) {
            Some(v) => match v.as_str() {
                "1" | "yes" | "true" | "on" => true,
                "0" | "no" | "false" | "off" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// All key/value pairs in the section.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The configured setup user, if any.
    pub fn setup_user(&self) -> Option<&str> {
        self.get(keys::SETUP_USER).filter(|v| !v.is_empty())
    }

    /// The configured container runtime, if any.
    pub fn container_runtime(&self) -> Option<&str> {
        self.get(keys::CONTAINER_RUNTIME).filter(|v| !v.is_empty())
    }

    /// Container process UID.
    pub fn puid(&self) -> i64 {
        self.get_int(keys::PUID, DEFAULT_PUID)
    }

    /// Container process GID.
    pub fn pgid(&self) -> i64 {
        self.get_int(keys::PGID, DEFAULT_PGID)
    }

    /// Timezone for container services.
    pub fn timezone(&self) -> String {
        self.get(keys::TZ)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_TIMEZONE)
            .to_string()
    }

    /// The configured NFS server, if any.
    pub fn nfs_server(&self) -> Option<&str> {
        self.get(keys::NFS_SERVER).filter(|v| !v.is_empty())
    }
}

fn secure(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(CONFIG_MODE))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}
