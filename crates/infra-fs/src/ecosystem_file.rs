// Ecosystem file loading and writing (JSON or YAML, chosen by extension)

use fleet_core::domain::Ecosystem;
use fleet_core::error::{AppError, Result};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// `.json` or `.yaml` / `.yml`
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(FileFormat::Json),
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            _ => Err(AppError::Config(format!(
                "{}: expected a .json, .yaml or .yml file",
                path.display()
            ))),
        }
    }
}

/// Parse an ecosystem document
///
/// YAML is read into a JSON value first so both formats apply the same
/// rules (e.g. env values must already be strings).
pub fn parse_ecosystem(contents: &str, format: FileFormat) -> Result<Ecosystem> {
    let value: serde_json::Value = match format {
        FileFormat::Json => serde_json::from_str(contents)?,
        FileFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(Ecosystem::from_value(value)?)
}

/// Serialize an ecosystem as `{"apps": [...]}`
pub fn ecosystem_to_string(ecosystem: &Ecosystem, format: FileFormat) -> Result<String> {
    match format {
        FileFormat::Json => Ok(serde_json::to_string_pretty(ecosystem)?),
        FileFormat::Yaml => Ok(serde_yaml::to_string(ecosystem)?),
    }
}

pub async fn load_ecosystem(path: &Path) -> Result<Ecosystem> {
    let format = FileFormat::from_path(path)?;
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let ecosystem = parse_ecosystem(&contents, format)
        .map_err(|e| AppError::Validation(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), apps = %ecosystem.len(), "Loaded ecosystem");
    Ok(ecosystem)
}

pub async fn write_ecosystem(path: &Path, ecosystem: &Ecosystem) -> Result<()> {
    let contents = ecosystem_to_string(ecosystem, FileFormat::from_path(path)?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!(path = %path.display(), apps = %ecosystem.len(), "Wrote ecosystem");
    Ok(())
}
