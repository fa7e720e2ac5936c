// Fresh agent wallets
// Random secp256k1 keys with their checksummed addresses

use alloy::primitives::hex;
use alloy::signers::local::PrivateKeySigner;
use fleet_core::port::KeyPair;
use tracing::info;

/// Generate `count` new key pairs
pub fn generate_keys(count: usize) -> Vec<KeyPair> {
    let keys: Vec<KeyPair> = (0..count)
        .map(|_| {
            let signer = PrivateKeySigner::random();
            KeyPair {
                address: signer.address().to_string(),
                private_key: hex::encode_prefixed(signer.to_bytes()),
            }
        })
        .collect();
    info!(count = %keys.len(), "Generated agent keys");
    keys
}
