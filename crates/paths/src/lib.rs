//! Where campcook keeps its config, records and media on this machine.

use campcook_runtime_config::{CONFIG_FILE_NAME, StorageSettings};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Env var that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CAMPCOOK_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("could not determine a home directory for campcook data")]
    HomeUnavailable,
}

fn project_dirs() -> Result<ProjectDirs, PathError> {
    ProjectDirs::from("io", "campcook", "campcook").ok_or(PathError::HomeUnavailable)
}

pub fn config_dir() -> Result<PathBuf, PathError> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Config file path, honouring `CAMPCOOK_CONFIG`.
pub fn config_path() -> Result<PathBuf, PathError> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        if !explicit.trim().is_empty() {
            return Ok(expand_home(explicit.trim()));
        }
    }
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Root data directory: the configured override, else the platform default.
pub fn data_dir(storage: &StorageSettings) -> Result<PathBuf, PathError> {
    match storage.data_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Ok(expand_home(dir)),
        _ => Ok(project_dirs()?.data_dir().to_path_buf()),
    }
}

/// Directory holding one JSON document per key (file backend).
pub fn store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("store")
}

/// SQLite database file (sqlite backend).
pub fn sqlite_path(data_dir: &Path) -> PathBuf {
    data_dir.join("campcook.db")
}

/// Default directory for captured photos and videos.
pub fn media_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("media")
}

pub fn pid_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("daemon.pid")
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new() {
            return home.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageSettings {
            data_dir: Some(tmp.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        let dir = data_dir(&storage).unwrap();
        assert_eq!(dir, tmp.path());
        assert_eq!(store_dir(&dir), tmp.path().join("store"));
        assert_eq!(sqlite_path(&dir), tmp.path().join("campcook.db"));
    }

    #[test]
    fn blank_override_falls_back_to_platform_dir() {
        let storage = StorageSettings {
            data_dir: Some("   ".to_string()),
            ..Default::default()
        };
        if let Ok(dir) = data_dir(&storage) {
            assert!(dir.ends_with("campcook") || dir.to_string_lossy().contains("campcook"));
        }
    }

    #[test]
    fn tilde_expands_against_home() {
        let expanded = expand_home("~/camp");
        if directories::BaseDirs::new().is_some() {
            assert!(!expanded.starts_with("~"));
            assert!(expanded.ends_with("camp"));
        }
        assert_eq!(expand_home("/abs/camp"), PathBuf::from("/abs/camp"));
    }
}
