// Agent Deployment Config
// Compact description of a group of predictoor / trader agents, expanded
// into one launch configuration per agent

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::env_keys::{self, TIMEFRAMES};
use super::error::{DomainError, Result};
use super::launch::LaunchConfig;
use super::network::{Network, NetworkProfile};

pub const DEFAULT_IMAGE: &str = "oceanprotocol/pdr-backend:latest";

/// Kind of agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Predictoor,
    Trader,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Predictoor => "predictoor",
            AgentRole::Trader => "trader",
        }
    }

    /// Entry point used when the deploy config names no script
    pub fn default_script(&self) -> &'static str {
        match self {
            AgentRole::Predictoor => "pdr_backend/predictoor/main.py",
            AgentRole::Trader => "pdr_backend/trader/main.py",
        }
    }

    /// Label shared by all agents of this role (k8s `app`, compose prefix)
    pub fn app_label(&self) -> String {
        format!("pdr-{}", self.as_str())
    }

    /// Env keys every agent of this role reads unconditionally
    pub fn required_keys(&self) -> &'static [&'static str] {
        &[env_keys::RPC_URL, env_keys::SUBGRAPH_URL, env_keys::PRIVATE_KEY]
    }

    /// Guess the role of a launch configuration from its script, then its name
    pub fn infer(config: &LaunchConfig) -> Option<AgentRole> {
        let from = |s: &str| {
            let s = s.to_ascii_lowercase();
            if s.contains("trader") {
                Some(AgentRole::Trader)
            } else if s.contains("predictoor") {
                Some(AgentRole::Predictoor)
            } else {
                None
            }
        };
        from(&config.script).or_else(|| from(&config.name))
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent fields; every one may be set per agent or on the group as a default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_amt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s_until_epoch_end: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

macro_rules! inherit {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if $dst.$field.is_none() {
                $dst.$field = $src.$field.clone();
            }
        )+
    };
}

impl AgentFields {
    /// Fill unset fields from the group defaults
    ///
    /// `private_key` is never inherited: keys are per agent.
    pub fn update_with_defaults(&mut self, defaults: &AgentFields) {
        inherit!(
            self,
            defaults,
            pair,
            timeframe,
            source,
            approach,
            stake_amt,
            network,
            s_until_epoch_end,
            cpu,
            memory,
            position_size,
            exchange_api_key,
            exchange_secret_key,
        );
    }
}

/// One named section of an agent deployment file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsDeployConfig {
    #[serde(rename = "type")]
    pub role: AgentRole,

    #[serde(flatten)]
    pub defaults: AgentFields,

    #[serde(default = "default_image")]
    pub pdr_backend_image_source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkProfile>,

    #[serde(default)]
    pub agents: Vec<AgentFields>,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

impl AgentsDeployConfig {
    pub fn script(&self) -> &str {
        self.script
            .as_deref()
            .unwrap_or_else(|| self.role.default_script())
    }

    /// Built-in profile for `network` overlaid with this file's overrides
    pub fn profile_for(&self, network: Network) -> NetworkProfile {
        let base = NetworkProfile::default_for(network);
        self.networks
            .iter()
            .find(|(key, _)| key.parse::<Network>().ok() == Some(network))
            .map(|(_, overrides)| base.merged_with(overrides))
            .unwrap_or(base)
    }

    /// Apply defaults to every agent and check required fields
    pub fn resolve(&self) -> Result<Vec<ResolvedAgent>> {
        self.agents
            .iter()
            .enumerate()
            .map(|(index, agent)| {
                let mut fields = agent.clone();
                fields.update_with_defaults(&self.defaults);
                ResolvedAgent::from_fields(index, self.role, fields)
            })
            .collect()
    }
}

/// Agent with every required field present
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAgent {
    pub index: usize,
    pub role: AgentRole,
    pub pair: String,
    pub timeframe: String,
    pub source: String,
    pub approach: u32,
    pub stake_amt: f64,
    pub network: Network,
    pub s_until_epoch_end: u64,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub position_size: Option<f64>,
    pub exchange_api_key: Option<String>,
    pub exchange_secret_key: Option<String>,
    pub private_key: Option<String>,
}

fn required<T>(index: usize, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| DomainError::MissingField {
        agent: index,
        field: field.to_string(),
    })
}

impl ResolvedAgent {
    fn from_fields(index: usize, role: AgentRole, f: AgentFields) -> Result<Self> {
        let pair = required(index, "pair", f.pair)?;
        let timeframe = required(index, "timeframe", f.timeframe)?;
        let source = required(index, "source", f.source)?;
        let approach = required(index, "approach", f.approach)?;
        let stake_amt = required(index, "stake_amt", f.stake_amt)?;
        let network: Network = required(index, "network", f.network)?.parse()?;
        let s_until_epoch_end = required(index, "s_until_epoch_end", f.s_until_epoch_end)?;

        env_keys::parse_pair(&pair)?;
        env_keys::parse_sources(&source)?;
        if !TIMEFRAMES.contains(&timeframe.as_str()) {
            return Err(DomainError::InvalidEnv {
                key: env_keys::TIMEFRAME_FILTER.to_string(),
                reason: format!("'{}' must be one of {:?}", timeframe, TIMEFRAMES),
            });
        }

        Ok(Self {
            index,
            role,
            pair,
            timeframe,
            source,
            approach,
            stake_amt,
            network,
            s_until_epoch_end,
            cpu: f.cpu,
            memory: f.memory,
            position_size: f.position_size,
            exchange_api_key: f.exchange_api_key,
            exchange_secret_key: f.exchange_secret_key,
            private_key: f.private_key,
        })
    }

    /// e.g. `pdr-predictoor1-3-BTC-USDT-5m-binance`
    pub fn full_name(&self) -> String {
        format!(
            "pdr-{}{}-{}-{}-{}-{}",
            self.role,
            self.index + 1,
            self.approach,
            self.pair,
            self.timeframe,
            self.source
        )
        .replace('/', "-")
    }

    /// Launch configuration for this agent
    pub fn launch_config(&self, script: &str, profile: &NetworkProfile) -> LaunchConfig {
        let mut config = LaunchConfig::new(self.full_name(), script)
            .with_args([self.approach.to_string()])
            .with_env(env_keys::PAIR_FILTER, self.pair.clone())
            .with_env(env_keys::TIMEFRAME_FILTER, self.timeframe.clone())
            .with_env(env_keys::SOURCE_FILTER, self.source.clone())
            .with_env(env_keys::STAKE_AMOUNT, self.stake_amt.to_string())
            .with_env(
                env_keys::SECONDS_TILL_EPOCH_END,
                self.s_until_epoch_end.to_string(),
            );

        let optional = [
            (env_keys::RPC_URL, profile.rpc_url.clone()),
            (env_keys::SUBGRAPH_URL, profile.subgraph_url.clone()),
            (env_keys::ADDRESS_FILE, profile.address_file.clone()),
            (env_keys::STAKE_TOKEN, profile.stake_token.clone()),
            (env_keys::OWNER_ADDRS, profile.owner_addrs.clone()),
            (env_keys::PRIVATE_KEY, self.private_key.clone()),
            (env_keys::POSITION_SIZE, self.position_size.map(|p| p.to_string())),
            (env_keys::EXCHANGE_API_KEY, self.exchange_api_key.clone()),
            (env_keys::EXCHANGE_SECRET_KEY, self.exchange_secret_key.clone()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                config.env.insert(key.to_string(), value);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOY_YAML: &str = r#"
type: predictoor
approach: 3
stake_amt: 15
network: testnet
s_until_epoch_end: 60
source: binance
timeframe: 5m
networks:
  testnet:
    stake_token: "0x973e69303259B0c2543a38665122b773D28405fB"
agents:
  - pair: BTC/USDT
  - pair: ETH/USDT
    timeframe: 1h
    stake_amt: 20
    cpu: "1"
"#;

    fn config() -> AgentsDeployConfig {
        serde_yaml::from_str(DEPLOY_YAML).unwrap()
    }

    #[test]
    fn test_defaults_are_inherited() {
        let agents = config().resolve().unwrap();
        assert_eq!(agents.len(), 2);

        assert_eq!(agents[0].timeframe, "5m");
        assert_eq!(agents[0].stake_amt, 15.0);
        assert_eq!(agents[0].network, Network::Testnet);

        assert_eq!(agents[1].timeframe, "1h");
        assert_eq!(agents[1].stake_amt, 20.0);
        assert_eq!(agents[1].cpu.as_deref(), Some("1"));
    }

    #[test]
    fn test_full_name_replaces_slashes() {
        let agents = config().resolve().unwrap();
        assert_eq!(agents[0].full_name(), "pdr-predictoor1-3-BTC-USDT-5m-binance");
        assert_eq!(agents[1].full_name(), "pdr-predictoor2-3-ETH-USDT-1h-binance");
    }

    #[test]
    fn test_missing_required_field() {
        let mut cfg = config();
        cfg.defaults.source = None;
        let err = cfg.resolve().unwrap_err();
        assert_eq!(
            err,
            DomainError::MissingField {
                agent: 0,
                field: "source".to_string()
            }
        );
    }

    #[test]
    fn test_private_key_not_inherited() {
        let mut cfg = config();
        cfg.defaults.private_key = Some("a".repeat(64));
        let agents = cfg.resolve().unwrap();
        assert!(agents.iter().all(|a| a.private_key.is_none()));
    }

    #[test]
    fn test_invalid_timeframe_rejected() {
        let mut cfg = config();
        cfg.defaults.timeframe = Some("2m".to_string());
        assert!(cfg.resolve().is_err());
    }

    #[test]
    fn test_launch_config_env_block() {
        let cfg = config();
        let agent = &cfg.resolve().unwrap()[0];
        let launch = agent.launch_config(cfg.script(), &cfg.profile_for(agent.network));

        assert_eq!(launch.name, "pdr-predictoor1-3-BTC-USDT-5m-binance");
        assert_eq!(launch.script, "pdr_backend/predictoor/main.py");
        assert_eq!(launch.args.as_slice(), &["3".to_string()]);
        assert_eq!(launch.env["PAIR_FILTER"], "BTC/USDT");
        assert_eq!(launch.env["STAKE_AMOUNT"], "15");
        assert_eq!(launch.env["RPC_URL"], "https://testnet.sapphire.oasis.dev");
        assert_eq!(
            launch.env["STAKE_TOKEN"],
            "0x973e69303259B0c2543a38665122b773D28405fB"
        );
        assert!(!launch.env.contains_key("PRIVATE_KEY"));
        assert!(!launch.env.contains_key("OWNER_ADDRS"));
    }

    #[test]
    fn test_infer_role() {
        let trader = LaunchConfig::new("bot-1", "pdr_backend/trader/main.py");
        assert_eq!(AgentRole::infer(&trader), Some(AgentRole::Trader));

        let by_name = LaunchConfig::new("pm2-predictoor-eth", "main.py");
        assert_eq!(AgentRole::infer(&by_name), Some(AgentRole::Predictoor));

        let other = LaunchConfig::new("indexer", "indexer.sh");
        assert_eq!(AgentRole::infer(&other), None);
    }
}
