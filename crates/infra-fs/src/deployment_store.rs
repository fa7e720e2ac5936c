// File DeploymentStore Implementation
// One `<config_name>.json` per generated deployment

use async_trait::async_trait;
use fleet_core::domain::launch::validate_name;
use fleet_core::domain::DeploymentInfo;
use fleet_core::error::Result;
use fleet_core::port::DeploymentStore;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_DEPLOYMENTS_DIR: &str = ".deployments";

pub struct FileDeploymentStore {
    dir: PathBuf,
}

impl FileDeploymentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, config_name: &str) -> Result<PathBuf> {
        validate_name(config_name)?;
        Ok(self.dir.join(format!("{}.json", config_name)))
    }
}

impl Default for FileDeploymentStore {
    fn default() -> Self {
        Self::new(DEFAULT_DEPLOYMENTS_DIR)
    }
}

#[async_trait]
impl DeploymentStore for FileDeploymentStore {
    async fn save(&self, info: &DeploymentInfo) -> Result<()> {
        let path = self.path_for(&info.config_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, serde_json::to_string_pretty(info)?).await?;
        info!(
            config_name = %info.config_name,
            path = %path.display(),
            "Saved deployment info"
        );
        Ok(())
    }

    async fn load(&self, config_name: &str) -> Result<Option<DeploymentInfo>> {
        let path = self.path_for(config_name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<DeploymentInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut infos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<DeploymentInfo>(&contents) {
                Ok(info) => infos.push(info),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable deployment info"),
            }
        }
        infos.sort_by(|a, b| {
            a.ts_created
                .cmp(&b.ts_created)
                .then_with(|| a.config_name.cmp(&b.config_name))
        });
        Ok(infos)
    }
}
