// File KeyStore Implementation
// `<dir>/<config_name>.json` holds `[{"address": .., "private_key": ..}, ...]`

use async_trait::async_trait;
use fleet_core::domain::env_keys;
use fleet_core::domain::launch::validate_name;
use fleet_core::error::{AppError, Result};
use fleet_core::port::{KeyPair, KeyStore};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_KEYS_DIR: &str = ".keys";

pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, config_name: &str) -> Result<PathBuf> {
        validate_name(config_name)?;
        Ok(self.dir.join(format!("{}.json", config_name)))
    }
}

impl Default for FileKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYS_DIR)
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn keys_for(&self, config_name: &str) -> Result<Vec<KeyPair>> {
        let path = self.path_for(config_name)?;

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No key file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let keys: Vec<KeyPair> = serde_json::from_str(&contents)?;
        for (i, key) in keys.iter().enumerate() {
            env_keys::parse_address("address", &key.address)?;
            if !env_keys::is_private_key(&key.private_key) {
                return Err(AppError::Validation(format!(
                    "{}: entry {} has a malformed private key",
                    path.display(),
                    i
                )));
            }
        }
        debug!(path = %path.display(), keys = %keys.len(), "Loaded keys");
        Ok(keys)
    }

    async fn append(&self, config_name: &str, keys: &[KeyPair]) -> Result<()> {
        let path = self.path_for(config_name)?;
        let mut all = self.keys_for(config_name).await?;
        all.extend_from_slice(keys);

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&all)?).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &path).await?;

        info!(path = %path.display(), added = %keys.len(), total = %all.len(), "Saved keys");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        assert!(store.keys_for("predictoor_config").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_keys_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let keys = serde_json::json!([
            {"address": format!("0x{:040x}", 1), "private_key": format!("0x{:064x}", 1)},
            {"address": format!("0x{:040x}", 2), "private_key": format!("{:064x}", 2)},
        ]);
        tokio::fs::write(dir.path().join("predictoor_config.json"), keys.to_string())
            .await
            .unwrap();

        let store = FileKeyStore::new(dir.path());
        let loaded = store.keys_for("predictoor_config").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].address, format!("0x{:040x}", 2));
    }

    #[tokio::test]
    async fn test_append_keeps_existing_keys_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join(".keys"));
        let first = KeyPair {
            address: format!("0x{:040x}", 1),
            private_key: format!("0x{:064x}", 1),
        };
        tokio_test::assert_ok!(store.append("predictoor_config", &[first.clone()]).await);

        let fresh = crate::generate_keys(2);
        tokio_test::assert_ok!(store.append("predictoor_config", &fresh).await);

        let loaded = store.keys_for("predictoor_config").await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], first);
        assert_eq!(&loaded[1..], &fresh[..]);
        assert!(!dir.path().join(".keys/predictoor_config.json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.append("c", &crate::generate_keys(1)).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("c.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_append_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        tokio_test::assert_err!(store.append("../c", &[]).await);
    }

    #[tokio::test]
    async fn test_malformed_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let keys = serde_json::json!([
            {"address": format!("0x{:040x}", 1), "private_key": "0x1234"},
        ]);
        tokio::fs::write(dir.path().join("c.json"), keys.to_string())
            .await
            .unwrap();

        let store = FileKeyStore::new(dir.path());
        assert!(matches!(
            store.keys_for("c").await,
            Err(AppError::Validation(_))
        ));
    }
}
