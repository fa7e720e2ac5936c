//! Daemon settings
//!
//! Layered: built-in defaults, then an optional `fleetd.toml`, then
//! `FLEET_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use fleet_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use fleet_core::application::supervisor::constants::{MAX_RESTART_DELAY_MS, MIN_UPTIME_MS};

pub const DEFAULT_CONFIG_FILE: &str = "fleetd.toml";
const DEFAULT_ECOSYSTEM: &str = "ecosystem.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Ecosystem file to supervise (.json / .yaml / .yml)
    pub ecosystem: String,
    /// Child logs and the daemon's own `fleetd.log`
    pub log_dir: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// `pretty` or `json`
    pub log_format: String,
    /// Daemon variables children inherit on top of PATH, HOME, USER, LANG
    #[serde(default)]
    pub env_allowlist: Vec<String>,
    pub max_restart_delay_ms: u64,
    pub min_uptime_ms: i64,
}

impl Settings {
    /// Load settings from `config_path` (optional file) and the environment
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = expand(&config_path.to_string_lossy());
        let settings: Settings = Config::builder()
            .set_default("ecosystem", DEFAULT_ECOSYSTEM)?
            .set_default("log_dir", default_log_dir())?
            .set_default("rpc_host", DEFAULT_RPC_HOST)?
            .set_default("rpc_port", i64::from(DEFAULT_RPC_PORT))?
            .set_default("log_format", "pretty")?
            .set_default("max_restart_delay_ms", MAX_RESTART_DELAY_MS)?
            .set_default("min_uptime_ms", MIN_UPTIME_MS)?
            .add_source(File::from(config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix("FLEET")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("env_allowlist"),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", config_path.display()))?
            .try_deserialize()
            .context("Invalid daemon settings")?;
        Ok(settings)
    }

    pub fn ecosystem_path(&self) -> PathBuf {
        expand(&self.ecosystem)
    }

    pub fn log_dir_path(&self) -> PathBuf {
        expand(&self.log_dir)
    }
}

/// Platform state directory, falling back to `~/.fleet/logs`
fn default_log_dir() -> String {
    ProjectDirs::from("", "", "fleet")
        .map(|dirs| dirs.data_local_dir().join("logs").display().to_string())
        .unwrap_or_else(|| "~/.fleet/logs".to_string())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
