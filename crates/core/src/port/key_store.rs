// Agent key storage port

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Funded account handed to one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub address: String,
    pub private_key: String,
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Keys reserved for a deploy config, in assignment order
    ///
    /// An unknown config yields an empty list.
    async fn keys_for(&self, config_name: &str) -> Result<Vec<KeyPair>>;

    /// Add keys after the ones already reserved for a deploy config
    async fn append(&self, config_name: &str, keys: &[KeyPair]) -> Result<()>;
}
