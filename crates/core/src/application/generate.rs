// Template generation
// Agent deploy config -> launch configurations -> files for a deployment method

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::domain::{
    AgentsDeployConfig, DomainError, DeploymentMethod, Ecosystem, LaunchConfig, ResolvedAgent,
};
use crate::error::Result;
use crate::port::KeyPair;

/// Launch configurations generated from one deploy config section
#[derive(Debug, Clone)]
pub struct GeneratedSet {
    pub ecosystem: Ecosystem,
    /// Same order as `ecosystem.apps`
    pub agents: Vec<ResolvedAgent>,
    pub warnings: Vec<String>,
}

/// One output file of a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file_name: String,
    pub contents: String,
}

/// Resolve agents, hand out keys and build the launch configurations
///
/// Keys go, in order, to agents that have no `private_key` of their own.
pub fn generate_launch_configs(
    config: &AgentsDeployConfig,
    keys: &[KeyPair],
) -> Result<GeneratedSet> {
    let mut agents = config.resolve()?;
    let mut warnings = Vec::new();
    let mut available = keys.iter();

    for agent in agents.iter_mut().filter(|a| a.private_key.is_none()) {
        match available.next() {
            Some(key) => agent.private_key = Some(key.private_key.clone()),
            None => {
                let message = format!("{} has no private key", agent.full_name());
                warn!(agent = %agent.full_name(), "No private key available for agent");
                warnings.push(message);
            }
        }
    }

    let apps: Vec<LaunchConfig> = agents
        .iter()
        .map(|agent| agent.launch_config(config.script(), &config.profile_for(agent.network)))
        .collect();
    let ecosystem = Ecosystem::new(apps);
    ecosystem.ensure_unique_names()?;

    info!(
        role = %config.role,
        agents = %ecosystem.len(),
        "Generated launch configurations"
    );

    Ok(GeneratedSet {
        ecosystem,
        agents,
        warnings,
    })
}

/// How many keys must be added to `available` so every agent gets one
pub fn keys_needed(config: &AgentsDeployConfig, available: usize) -> Result<usize> {
    let keyless = config
        .resolve()?
        .iter()
        .filter(|a| a.private_key.is_none())
        .count();
    Ok(keyless.saturating_sub(available))
}

/// Render a generated set for a deployment method
pub fn render(
    set: &GeneratedSet,
    config: &AgentsDeployConfig,
    method: DeploymentMethod,
) -> Result<Vec<RenderedFile>> {
    match method {
        DeploymentMethod::Pm2 => Ok(vec![RenderedFile {
            file_name: "ecosystem.json".to_string(),
            contents: serde_json::to_string_pretty(&set.ecosystem)?,
        }]),
        DeploymentMethod::DockerCompose => {
            let mut services = Map::new();
            for (app, agent) in set.ecosystem.apps.iter().zip(&set.agents) {
                services.insert(
                    app.name.clone(),
                    compose_service(app, agent, &config.pdr_backend_image_source)?,
                );
            }
            let document = json!({ "services": services });
            Ok(vec![RenderedFile {
                file_name: "docker-compose.yml".to_string(),
                contents: serde_yaml::to_string(&document)?,
            }])
        }
        DeploymentMethod::K8s => {
            let mut seen = HashSet::new();
            set.ecosystem
                .apps
                .iter()
                .zip(&set.agents)
                .map(|(app, agent)| -> Result<RenderedFile> {
                    let name = k8s_name(&app.name);
                    // Lowercasing and truncation can fold distinct apps together
                    if !seen.insert(name.clone()) {
                        return Err(DomainError::DuplicateName(format!(
                            "{} (k8s name of {})",
                            name, app.name
                        ))
                        .into());
                    }
                    let document =
                        k8s_deployment(&name, app, agent, &config.pdr_backend_image_source)?;
                    Ok(RenderedFile {
                        file_name: format!("{}.{}", name, method.extension()),
                        contents: serde_yaml::to_string(&document)?,
                    })
                })
                .collect()
        }
    }
}

fn command(app: &LaunchConfig) -> Result<Vec<String>> {
    let line = app.command_line()?;
    let mut command = vec![line.program];
    command.extend(line.args);
    Ok(command)
}

fn compose_service(app: &LaunchConfig, agent: &ResolvedAgent, image: &str) -> Result<Value> {
    let mut service = json!({
        "image": image,
        "container_name": app.name,
        "command": command(app)?,
        "environment": app.env,
        "restart": if app.autorestart { "unless-stopped" } else { "no" },
    });
    if let Some(dir) = &app.cwd {
        service["working_dir"] = json!(dir);
    }

    let mut limits = Map::new();
    if let Some(cpu) = &agent.cpu {
        limits.insert("cpus".to_string(), json!(cpu));
    }
    if let Some(memory) = &agent.memory {
        limits.insert("memory".to_string(), json!(memory));
    }
    if !limits.is_empty() {
        service["deploy"] = json!({ "resources": { "limits": limits } });
    }
    Ok(service)
}

const K8S_NAME_MAX: usize = 63;

/// k8s object names are lowercase DNS labels of at most 63 characters
fn k8s_name(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .take(K8S_NAME_MAX)
        .collect();
    label.trim_matches('-').to_string()
}

fn k8s_deployment(
    name: &str,
    app: &LaunchConfig,
    agent: &ResolvedAgent,
    image: &str,
) -> Result<Value> {
    let line = app.command_line()?;
    let env: Vec<Value> = app
        .env
        .iter()
        .map(|(key, value)| json!({ "name": key, "value": value }))
        .collect();
    let role_label = agent.role.app_label();

    let mut container = json!({
        "name": role_label,
        "image": image,
        "command": [line.program],
        "args": line.args,
        "env": env,
    });
    if let Some(dir) = &app.cwd {
        container["workingDir"] = json!(dir);
    }

    let mut resources = Map::new();
    if let Some(cpu) = &agent.cpu {
        resources.insert("cpu".to_string(), json!(cpu));
    }
    if let Some(memory) = &agent.memory {
        resources.insert("memory".to_string(), json!(memory));
    }
    if !resources.is_empty() {
        container["resources"] = json!({ "requests": resources, "limits": resources });
    }

    Ok(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "labels": { "app": role_label },
        },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": { "agent": name } },
            "template": {
                "metadata": { "labels": { "app": role_label, "agent": name } },
                "spec": {
                    "restartPolicy": "Always",
                    "containers": [container],
                },
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validate::validate_ecosystem;

    const DEPLOY_YAML: &str = r#"
type: predictoor
approach: 3
stake_amt: 15
network: testnet
s_until_epoch_end: 60
source: binance
timeframe: 5m
cpu: "1"
memory: 512Mi
agents:
  - pair: BTC/USDT
  - pair: ETH/USDT
    timeframe: 1h
  - pair: ETH/USDT
    approach: 2
"#;

    fn config() -> AgentsDeployConfig {
        serde_yaml::from_str(DEPLOY_YAML).unwrap()
    }

    fn key(n: u8) -> KeyPair {
        KeyPair {
            address: format!("0x{:040x}", n),
            private_key: format!("0x{:064x}", n),
        }
    }

    #[test]
    fn test_keys_assigned_in_order() {
        let set = generate_launch_configs(&config(), &[key(1), key(2)]).unwrap();
        assert_eq!(set.ecosystem.len(), 3);
        assert_eq!(set.ecosystem.apps[0].env["PRIVATE_KEY"], key(1).private_key);
        assert_eq!(set.ecosystem.apps[1].env["PRIVATE_KEY"], key(2).private_key);
        assert!(!set.ecosystem.apps[2].env.contains_key("PRIVATE_KEY"));
        assert_eq!(set.warnings.len(), 1);
    }

    #[test]
    fn test_generated_names_unique_and_valid() {
        let keys: Vec<_> = (1..=3).map(key).collect();
        let set = generate_launch_configs(&config(), &keys).unwrap();
        assert!(set.ecosystem.ensure_unique_names().is_ok());
        assert_eq!(
            set.ecosystem.names(),
            vec![
                "pdr-predictoor1-3-BTC-USDT-5m-binance",
                "pdr-predictoor2-3-ETH-USDT-1h-binance",
                "pdr-predictoor3-2-ETH-USDT-5m-binance",
            ]
        );
        let report = validate_ecosystem(&set.ecosystem);
        assert!(!report.has_errors(), "{:?}", report);
    }

    #[test]
    fn test_render_pm2_reparses() {
        let cfg = config();
        let set = generate_launch_configs(&cfg, &[]).unwrap();
        let files = render(&set, &cfg, DeploymentMethod::Pm2).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "ecosystem.json");

        let value: Value = serde_json::from_str(&files[0].contents).unwrap();
        assert_eq!(Ecosystem::from_value(value).unwrap(), set.ecosystem);
    }

    #[test]
    fn test_render_docker_compose() {
        let cfg = config();
        let set = generate_launch_configs(&cfg, &[key(1)]).unwrap();
        let files = render(&set, &cfg, DeploymentMethod::DockerCompose).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "docker-compose.yml");

        let doc: serde_yaml::Value = serde_yaml::from_str(&files[0].contents).unwrap();
        let service = &doc["services"]["pdr-predictoor1-3-BTC-USDT-5m-binance"];
        assert_eq!(service["image"].as_str(), Some("oceanprotocol/pdr-backend:latest"));
        assert_eq!(service["restart"].as_str(), Some("unless-stopped"));
        assert_eq!(service["command"][0].as_str(), Some("python3"));
        assert_eq!(service["environment"]["PAIR_FILTER"].as_str(), Some("BTC/USDT"));
        assert_eq!(service["deploy"]["resources"]["limits"]["memory"].as_str(), Some("512Mi"));
    }

    #[test]
    fn test_render_k8s_one_file_per_agent() {
        let cfg = config();
        let set = generate_launch_configs(&cfg, &[]).unwrap();
        let files = render(&set, &cfg, DeploymentMethod::K8s).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].file_name, "pdr-predictoor1-3-btc-usdt-5m-binance.yaml");

        let doc: serde_yaml::Value = serde_yaml::from_str(&files[0].contents).unwrap();
        assert_eq!(doc["kind"].as_str(), Some("Deployment"));
        assert_eq!(doc["metadata"]["labels"]["app"].as_str(), Some("pdr-predictoor"));
        let container = &doc["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["args"][1].as_str(), Some("3"));
        assert_eq!(container["resources"]["limits"]["cpu"].as_str(), Some("1"));
    }

    #[test]
    fn test_keys_needed_counts_keyless_agents() {
        let cfg = config();
        assert_eq!(keys_needed(&cfg, 0).unwrap(), 3);
        assert_eq!(keys_needed(&cfg, 2).unwrap(), 1);
        assert_eq!(keys_needed(&cfg, 5).unwrap(), 0);
    }

    #[test]
    fn test_k8s_name_is_a_bounded_dns_label() {
        assert_eq!(k8s_name("pdr-Predictoor1-3-BTC/USDT"), "pdr-predictoor1-3-btc-usdt");

        let long = format!("pdr-predictoor1-3-{}-5m-binance", "X".repeat(80));
        let name = k8s_name(&long);
        assert!(name.len() <= 63);
        assert!(name.starts_with("pdr-predictoor1-3-xxx"));

        // Cut lands right after a separator
        let edge = format!("{}_tail", "a".repeat(62));
        assert_eq!(k8s_name(&edge), "a".repeat(62));
    }

    #[test]
    fn test_render_k8s_rejects_names_folding_together() {
        let cfg = config();
        let mut set = generate_launch_configs(&cfg, &[]).unwrap();
        let shared = "pdr-predictoor-".repeat(5);
        set.ecosystem.apps[0].name = format!("{}-first", shared);
        set.ecosystem.apps[1].name = format!("{}-second", shared);

        let err = render(&set, &cfg, DeploymentMethod::K8s).unwrap_err();
        assert!(matches!(err, crate::error::AppError::Domain(DomainError::DuplicateName(_))));
    }
}
