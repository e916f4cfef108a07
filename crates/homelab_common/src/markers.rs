//! Completion marker files.
//!
//! Zero-content flag files under `~/.local/homelab-setup/`, one per
//! completed stage. Existence is the only semantic; creation and
//! removal are idempotent.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker created when the pre-flight checks pass.
pub const PREFLIGHT_COMPLETE: &str = "preflight-complete";

/// Directory under `~/.local` holding the marker files.
pub const MARKER_DIR_NAME: &str = "homelab-setup";

/// Marker store over a dedicated directory.
#[derive(Debug, Clone)]
pub struct Markers {
    dir: PathBuf,
}

impl Markers {
    /// Open the default store at `~/.local/homelab-setup/`, creating
    /// the directory if needed.
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Self::open(home.join(".local").join(MARKER_DIR_NAME))
    }

    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create marker directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// The marker directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a marker. Idempotent: succeeds if it already exists.
    pub fn create(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.dir.join(name);
        fs::write(&path, b"")
            .with_context(|| format!("failed to create marker {}", path.display()))?;
        Ok(())
    }

    /// Whether a marker exists.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.dir.join(name).exists()
    }

    /// Remove a marker. Idempotent: absence is not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove marker {}", path.display()))
            }
        }
    }

    /// All marker names currently present.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read marker directory {}", self.dir.display()))?;

        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Legacy marker left by the image's home-directory-setup service.
/// Consulted read-only; this tool never creates or removes it.
pub fn legacy_home_setup_marker(home: &Path) -> PathBuf {
    home.join(".local").join(".home-setup-complete")
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("marker name cannot be empty");
    }
    if name.contains('/') || name.contains('\\') {
        bail!("marker name cannot contain path separators: {}", name);
    }
    if name == "." || name == ".." {
        bail!("marker name cannot be '.' or '..'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_markers() -> (tempfile::TempDir, Markers) {
        let dir = tempfile::tempdir().unwrap();
        let markers = Markers::open(dir.path().join("markers")).unwrap();
        (dir, markers)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, markers) = temp_markers();

        assert!(!markers.exists("x"));
        markers.create("x").unwrap();
        assert!(markers.exists("x"));
        markers.remove("x").unwrap();
        assert!(!markers.exists("x"));
    }

    #[test]
    fn test_create_is_idempotent() {
        let (_dir, markers) = temp_markers();

        markers.create(PREFLIGHT_COMPLETE).unwrap();
        markers.create(PREFLIGHT_COMPLETE).unwrap();
        assert!(markers.exists(PREFLIGHT_COMPLETE));
    }

    #[test]
    fn test_remove_nonexistent_is_ok() {
        let (_dir, markers) = temp_markers();
        markers.remove("never-created").unwrap();
    }

    #[test]
    fn test_marker_files_are_empty() {
        let (_dir, markers) = temp_markers();

        markers.create("stage").unwrap();
        let metadata = fs::metadata(markers.dir().join("stage")).unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn test_list_is_sorted() {
        let (_dir, markers) = temp_markers();

        markers.create("b-stage").unwrap();
        markers.create("a-stage").unwrap();
        assert_eq!(markers.list().unwrap(), vec!["a-stage", "b-stage"]);
    }

    #[test]
    fn test_rejects_path_traversal_names() {
        let (_dir, markers) = temp_markers();

        assert!(markers.create("").is_err());
        assert!(markers.create("..").is_err());
        assert!(markers.create("a/b").is_err());
        assert!(!markers.exists("../escape"));
    }

    #[test]
    fn test_legacy_marker_path() {
        let path = legacy_home_setup_marker(Path::new("/var/home/core"));
        assert_eq!(
            path,
            Path::new("/var/home/core/.local/.home-setup-complete")
        );
    }
}
