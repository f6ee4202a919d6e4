//! Per-project settings persistence
//!
//! Settings are grouped by a stable name derived from the project path, so
//! two checkouts with the same folder name don't share a run command.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use shared::settings::ProjectSettings;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `<folder name>_<first 8 hex chars of the path's SHA-256>`
pub fn project_group_name(project_dir: &Path) -> String {
    let full_path = project_dir.to_string_lossy();
    let digest = Sha256::digest(full_path.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

    let base = project_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());

    format!("{}_{}", base, hash)
}

/// Storage for project settings, keyed by group name
pub trait SettingsRepository {
    /// Missing or unreadable settings come back as defaults.
    fn load(&self, group: &str) -> ProjectSettings;

    fn save(&self, group: &str, settings: &ProjectSettings) -> Result<()>;
}

/// One JSON file per project under the app's config directory
pub struct JsonSettingsStore {
    base_path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new() -> Self {
        Self {
            base_path: Self::get_base_path(),
        }
    }

    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base.into().join("projects"),
        }
    }

    fn get_base_path() -> PathBuf {
        directories::ProjectDirs::from("com.local", "Feedback Console", "FeedbackConsole")
            .map(|p| p.config_dir().join("projects"))
            .unwrap_or_else(|| PathBuf::from("./settings/projects"))
    }

    fn file_for(&self, group: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", group))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Default for JsonSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsRepository for JsonSettingsStore {
    fn load(&self, group: &str) -> ProjectSettings {
        let path = self.file_for(group);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(group, "no saved settings");
                return ProjectSettings::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings");
                return ProjectSettings::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring corrupt settings file");
            ProjectSettings::default()
        })
    }

    fn save(&self, group: &str, settings: &ProjectSettings) -> Result<()> {
        fs::create_dir_all(&self.base_path).with_context(|| {
            format!("Failed to create settings dir {}", self.base_path.display())
        })?;

        let path = self.file_for(group);
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings {}", path.display()))?;

        debug!(group, "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_group_name_is_stable() {
        let a = project_group_name(Path::new("/home/me/work/app"));
        let b = project_group_name(Path::new("/home/me/work/app"));
        assert_eq!(a, b);
        assert!(a.starts_with("app_"));
        assert_eq!(a.len(), "app_".len() + 8);
    }

    #[test]
    fn test_group_name_distinguishes_same_folder_name() {
        let a = project_group_name(Path::new("/home/me/one/app"));
        let b = project_group_name(Path::new("/home/me/two/app"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_group_name_for_root() {
        assert!(project_group_name(Path::new("/")).starts_with("root_"));
    }

    #[test]
    fn test_missing_settings_are_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::with_base_dir(temp_dir.path());
        assert_eq!(store.load("nothing_00000000"), ProjectSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::with_base_dir(temp_dir.path());

        let mut settings = ProjectSettings {
            run_command: "cargo test".into(),
            execute_automatically: true,
            ..Default::default()
        };
        settings.vision.api_key = "key".into();
        store.save("app_12345678", &settings).unwrap();

        assert_eq!(store.load("app_12345678"), settings);
        assert_eq!(store.load("other_12345678"), ProjectSettings::default());
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::with_base_dir(temp_dir.path());
        fs::create_dir_all(store.base_path()).unwrap();
        fs::write(store.base_path().join("bad_00000000.json"), "{not json").unwrap();

        assert_eq!(store.load("bad_00000000"), ProjectSettings::default());
    }
}
