// Deployment record storage port

use crate::domain::DeploymentInfo;
use crate::error::Result;
use async_trait::async_trait;

/// Persists one DeploymentInfo per config name
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Save (or overwrite) the record for `info.config_name`
    async fn save(&self, info: &DeploymentInfo) -> Result<()>;

    /// Load the record for a config name, None if never generated
    async fn load(&self, config_name: &str) -> Result<Option<DeploymentInfo>>;

    /// All records, oldest first
    async fn list(&self) -> Result<Vec<DeploymentInfo>>;
}
