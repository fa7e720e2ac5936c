// Deployment methods and generated-deployment records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// Target the template generator renders for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentMethod {
    #[serde(rename = "pm2")]
    Pm2,
    #[serde(rename = "docker-compose")]
    DockerCompose,
    #[serde(rename = "k8s")]
    K8s,
}

impl DeploymentMethod {
    pub const ALL: [DeploymentMethod; 3] = [
        DeploymentMethod::Pm2,
        DeploymentMethod::DockerCompose,
        DeploymentMethod::K8s,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMethod::Pm2 => "pm2",
            DeploymentMethod::DockerCompose => "docker-compose",
            DeploymentMethod::K8s => "k8s",
        }
    }

    /// Extension of the rendered files
    pub fn extension(&self) -> &'static str {
        match self {
            DeploymentMethod::Pm2 => "json",
            DeploymentMethod::DockerCompose => "yml",
            DeploymentMethod::K8s => "yaml",
        }
    }

    /// Shell command that deploys the files rendered into `output_dir`
    pub fn deploy_command(&self, output_dir: &str, config_name: &str) -> String {
        let dir = output_dir.trim_end_matches('/');
        match self {
            DeploymentMethod::Pm2 => format!("pm2 start {}/ecosystem.json", dir),
            DeploymentMethod::DockerCompose => format!(
                "docker compose -f {}/docker-compose.yml -p {} up -d",
                dir,
                sanitize_namespace(config_name)
            ),
            DeploymentMethod::K8s => format!(
                "kubectl apply -f {}/ -n {}",
                dir,
                sanitize_namespace(config_name)
            ),
        }
    }
}

/// Namespaces and compose projects allow `[a-z0-9-]` only
pub fn sanitize_namespace(config_name: &str) -> String {
    config_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

impl fmt::Display for DeploymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pm2" => Ok(DeploymentMethod::Pm2),
            "docker-compose" | "compose" => Ok(DeploymentMethod::DockerCompose),
            "k8s" | "kubernetes" => Ok(DeploymentMethod::K8s),
            _ => Err(DomainError::Unknown {
                kind: "deployment method".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Record of one generated deployment, kept so it can be listed later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub config_name: String,
    /// Folder the templates were written to
    pub folder: String,
    pub deployment_method: DeploymentMethod,
    /// Epoch seconds
    pub ts_created: i64,
    pub deployment_names: Vec<String>,
    /// Raw deploy-file section the templates came from
    pub config: serde_json::Value,
}
