// Domain Layer - launch configurations, agents and process records

pub mod agent;
pub mod deployment;
pub mod ecosystem;
pub mod env_keys;
pub mod error;
pub mod launch;
pub mod network;
pub mod process;

// Re-exports
pub use agent::{AgentFields, AgentRole, AgentsDeployConfig, ResolvedAgent};
pub use deployment::{DeploymentInfo, DeploymentMethod};
pub use ecosystem::Ecosystem;
pub use error::DomainError;
pub use launch::{CommandLine, EnvMap, LaunchArgs, LaunchConfig, ScriptRef};
pub use network::{Network, NetworkProfile};
pub use process::{ProcessRecord, ProcessState};
