// Agent deploy file loading
// A YAML file mapping config names to AgentsDeployConfig sections

use fleet_core::domain::AgentsDeployConfig;
use fleet_core::error::{AppError, Result};
use std::path::Path;

/// One section of a deploy file, parsed and raw
#[derive(Debug, Clone)]
pub struct LoadedDeployConfig {
    pub config_name: String,
    pub config: AgentsDeployConfig,
    /// Section as written, kept for the deployment record
    pub raw: serde_json::Value,
}

/// Parse the section `config_name` of a deploy file
pub fn parse_deploy_file(contents: &str, config_name: &str) -> Result<LoadedDeployConfig> {
    let document: serde_json::Value = serde_yaml::from_str(contents)?;
    let sections = document
        .as_object()
        .ok_or_else(|| AppError::Validation("deploy file must be a mapping of config names".to_string()))?;

    let raw = sections.get(config_name).cloned().ok_or_else(|| {
        let available: Vec<&str> = sections.keys().map(String::as_str).collect();
        AppError::NotFound(format!(
            "config '{}' (available: {})",
            config_name,
            available.join(", ")
        ))
    })?;

    let config: AgentsDeployConfig = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::Validation(format!("config '{}': {}", config_name, e)))?;

    Ok(LoadedDeployConfig {
        config_name: config_name.to_string(),
        config,
        raw,
    })
}

pub async fn load_deploy_file(path: &Path, config_name: &str) -> Result<LoadedDeployConfig> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_deploy_file(&contents, config_name)
}
