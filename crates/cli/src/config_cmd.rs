use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use campcook_daemon::config::{load_config_from, save_config};
use campcook_runtime_config::{CampcookConfig, StorageBackend};

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus CAMPCOOK_* overrides)
    Show,
    /// Update `campcook.toml`
    Set(ConfigSetArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendArg {
    File,
    Sqlite,
}

#[derive(Debug, Default, Args)]
pub struct ConfigSetArgs {
    /// Collector host (IPv4 address or hostname)
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u32>,
    /// http or https
    #[arg(long)]
    pub scheme: Option<String>,
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
    #[arg(long)]
    pub data_dir: Option<String>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Daemon resume interval; 0 disables it
    #[arg(long)]
    pub retry_interval_secs: Option<u64>,
    /// Daemon health probe interval; 0 disables it
    #[arg(long)]
    pub health_check_interval_secs: Option<u64>,
}

pub fn run(action: ConfigAction) -> Result<()> {
    let path = campcook_paths::config_path()?;
    match action {
        ConfigAction::Show => show(&path),
        ConfigAction::Set(args) => {
            let mut config = CampcookConfig::load(&path)
                .with_context(|| format!("read config {}", path.display()))?;
            apply(&mut config, args)?;
            save_config(&path, &config)?;
            println!("Configuration updated.");
            show(&path)
        }
    }
}

/// Apply the requested changes, refusing an endpoint that would not validate.
fn apply(config: &mut CampcookConfig, args: ConfigSetArgs) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host.trim().to_string();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(scheme) = args.scheme {
        config.server.scheme = scheme.trim().to_ascii_lowercase();
    }
    if let Some(backend) = args.backend {
        config.storage.backend = match backend {
            BackendArg::File => StorageBackend::File,
            BackendArg::Sqlite => StorageBackend::Sqlite,
        };
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = Some(dir).filter(|d| !d.trim().is_empty());
    }
    if let Some(n) = args.max_retries {
        config.sync.max_retries = n;
    }
    if let Some(secs) = args.retry_interval_secs {
        config.sync.retry_interval_secs = secs;
    }
    if let Some(secs) = args.health_check_interval_secs {
        config.sync.health_check_interval_secs = secs;
    }
    config
        .server
        .endpoint()
        .context("refusing to save an invalid collector address")?;
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let config = load_config_from(path)?;
    println!("Config file: {}", path.display());
    println!();
    println!("[server]");
    match config.server.endpoint() {
        Ok(endpoint) => println!("  collector = {endpoint}"),
        Err(e) => println!("  collector = (invalid: {e})"),
    }
    println!();
    println!("[sync]");
    println!("  max_retries                = {}", config.sync.max_retries);
    println!("  request_timeout_secs       = {}", config.sync.request_timeout_secs);
    println!("  connect_timeout_secs       = {}", config.sync.connect_timeout_secs);
    println!("  retry_interval_secs        = {}", config.sync.retry_interval_secs);
    println!(
        "  health_check_interval_secs = {}",
        config.sync.health_check_interval_secs
    );
    println!();
    println!("[storage]");
    println!("  backend  = {:?}", config.storage.backend);
    match campcook_daemon::config::data_dir(&config) {
        Ok(dir) => println!("  data_dir = {}", dir.display()),
        Err(e) => println!("  data_dir = (unavailable: {e})"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_updates_only_given_fields() {
        let mut config = CampcookConfig::default();
        apply(
            &mut config,
            ConfigSetArgs {
                host: Some(" 192.168.1.20 ".to_string()),
                backend: Some(BackendArg::Sqlite),
                retry_interval_secs: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.server.host, "192.168.1.20");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.sync.retry_interval_secs, 0);
    }

    #[test]
    fn set_rejects_invalid_endpoint() {
        let mut config = CampcookConfig::default();
        let err = apply(
            &mut config,
            ConfigSetArgs {
                port: Some(70000),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("70000"), "{err:#}");

        let mut config = CampcookConfig::default();
        assert!(
            apply(
                &mut config,
                ConfigSetArgs {
                    host: Some("bad host!".to_string()),
                    ..Default::default()
                },
            )
            .is_err()
        );
    }
}
