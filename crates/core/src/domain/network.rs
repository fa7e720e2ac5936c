// Network profiles (mainnet / testnet / localnet)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

pub const DEFAULT_ADDRESS_FILE: &str = "~/.ocean/ocean-contracts/artifacts/address.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "sapphire-mainnet" => Ok(Network::Mainnet),
            "testnet" | "sapphire-testnet" => Ok(Network::Testnet),
            "localnet" | "development" | "barge" | "barge-pdr" => Ok(Network::Localnet),
            _ => Err(DomainError::Unknown {
                kind: "network".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Per-network endpoints and contract addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_addrs: Option<String>,
}

impl NetworkProfile {
    /// Built-in endpoints for a network
    pub fn default_for(network: Network) -> Self {
        let (rpc_url, subgraph_url) = match network {
            Network::Mainnet => (
                "https://sapphire.oasis.io",
                "https://v4.subgraph.sapphire-mainnet.oceanprotocol.com/subgraphs/name/oceanprotocol/ocean-subgraph",
            ),
            Network::Testnet => (
                "https://testnet.sapphire.oasis.dev",
                "https://v4.subgraph.sapphire-testnet.oceanprotocol.com/subgraphs/name/oceanprotocol/ocean-subgraph",
            ),
            Network::Localnet => (
                "http://localhost:8545",
                "http://localhost:9000/subgraphs/name/oceanprotocol/ocean-subgraph",
            ),
        };
        Self {
            rpc_url: Some(rpc_url.to_string()),
            subgraph_url: Some(subgraph_url.to_string()),
            address_file: Some(DEFAULT_ADDRESS_FILE.to_string()),
            stake_token: None,
            owner_addrs: None,
        }
    }

    /// Fields set in `overrides` win over `self`
    pub fn merged_with(&self, overrides: &NetworkProfile) -> NetworkProfile {
        NetworkProfile {
            rpc_url: overrides.rpc_url.clone().or_else(|| self.rpc_url.clone()),
            subgraph_url: overrides
                .subgraph_url
                .clone()
                .or_else(|| self.subgraph_url.clone()),
            address_file: overrides
                .address_file
                .clone()
                .or_else(|| self.address_file.clone()),
            stake_token: overrides
                .stake_token
                .clone()
                .or_else(|| self.stake_token.clone()),
            owner_addrs: overrides
                .owner_addrs
                .clone()
                .or_else(|| self.owner_addrs.clone()),
        }
    }
}
