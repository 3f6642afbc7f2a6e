//! Loading configuration and opening the configured store.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use campcook_local_db::SqliteBackend;
use campcook_local_store::LocalStore;
use campcook_runtime_config::{CampcookConfig, StorageBackend};

/// Config from the default location (or `CAMPCOOK_CONFIG`) with
/// `CAMPCOOK_*` env overrides applied.
pub fn load_config() -> Result<CampcookConfig> {
    let path = campcook_paths::config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<CampcookConfig> {
    let mut config = CampcookConfig::load(path)
        .with_context(|| format!("read config {}", path.display()))?;
    config
        .apply_process_env()
        .context("apply CAMPCOOK_* environment overrides")?;
    Ok(config)
}

/// Write `config` to `path`, creating the directory if needed.
pub fn save_config(path: &Path, config: &CampcookConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }
    let body = config.to_toml_string()?;
    std::fs::write(path, body).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}

pub fn data_dir(config: &CampcookConfig) -> Result<PathBuf> {
    Ok(campcook_paths::data_dir(&config.storage)?)
}

/// Open the configured storage backend under the data directory.
pub fn open_store(config: &CampcookConfig) -> Result<LocalStore> {
    let dir = data_dir(config)?;
    let store = match config.storage.backend {
        StorageBackend::File => {
            let store_dir = campcook_paths::store_dir(&dir);
            LocalStore::open_dir(&store_dir)
                .with_context(|| format!("open store {}", store_dir.display()))?
        }
        StorageBackend::Sqlite => {
            let db_path = campcook_paths::sqlite_path(&dir);
            let backend = SqliteBackend::open_path(&db_path)
                .with_context(|| format!("open db {}", db_path.display()))?;
            LocalStore::new(Arc::new(backend))
        }
        StorageBackend::Unknown => bail!("unknown storage backend in config"),
    };
    info!(backend = store.backend_name(), dir = %dir.display(), "local store opened");
    Ok(store)
}
