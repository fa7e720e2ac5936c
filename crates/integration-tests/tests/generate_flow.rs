//! Deploy file -> generated templates -> re-parsed ecosystem

use fleet_core::application::{generate_launch_configs, keys_needed, render, validate_ecosystem};
use fleet_core::domain::{env_keys, DeploymentInfo, DeploymentMethod};
use fleet_core::port::{DeploymentStore, KeyStore};
use fleet_infra_fs::{
    generate_keys, load_deploy_file, load_ecosystem, write_rendered, FileDeploymentStore,
    FileKeyStore,
};

const DEPLOY: &str = r#"
predictoor_config:
  type: predictoor
  approach: 3
  stake_amt: 15
  network: testnet
  s_until_epoch_end: 60
  source: binance
  timeframe: 5m
  agents:
    - pair: BTC/USDT
    - pair: ETH/USDT
      timeframe: 1h
    - pair: BTC/USDT
      approach: 2
      source: kraken
"#;

async fn write_fixture(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let deploy = dir.join("deploy.yml");
    tokio::fs::write(&deploy, DEPLOY).await.unwrap();

    let keys_dir = dir.join(".keys");
    tokio::fs::create_dir_all(&keys_dir).await.unwrap();
    let keys: Vec<_> = (1..=3)
        .map(|i| {
            serde_json::json!({
                "address": format!("0x{:040x}", i),
                "private_key": format!("0x{:064x}", i),
            })
        })
        .collect();
    tokio::fs::write(
        keys_dir.join("predictoor_config.json"),
        serde_json::Value::Array(keys).to_string(),
    )
    .await
    .unwrap();

    (deploy, keys_dir)
}

#[tokio::test]
async fn test_pm2_output_reparses_into_valid_ecosystem() {
    let dir = tempfile::tempdir().unwrap();
    let (deploy, keys_dir) = write_fixture(dir.path()).await;

    let loaded = load_deploy_file(&deploy, "predictoor_config").await.unwrap();
    let keys = FileKeyStore::new(&keys_dir)
        .keys_for("predictoor_config")
        .await
        .unwrap();
    let set = generate_launch_configs(&loaded.config, &keys).unwrap();
    assert!(set.warnings.is_empty());

    let out = dir.path().join("out");
    let files = render(&set, &loaded.config, DeploymentMethod::Pm2).unwrap();
    write_rendered(&out, &files).await.unwrap();

    let ecosystem = load_ecosystem(&out.join("ecosystem.json")).await.unwrap();
    assert_eq!(ecosystem, set.ecosystem);
    assert_eq!(
        ecosystem.names(),
        vec![
            "pdr-predictoor1-3-BTC-USDT-5m-binance",
            "pdr-predictoor2-3-ETH-USDT-1h-binance",
            "pdr-predictoor3-2-BTC-USDT-5m-kraken",
        ]
    );

    let report = validate_ecosystem(&ecosystem);
    assert!(!report.has_errors(), "unexpected errors: {:?}", report.issues);

    // Each agent got its own key
    let third = ecosystem.find("pdr-predictoor3-2-BTC-USDT-5m-kraken").unwrap();
    assert_eq!(
        third.env.get(env_keys::PRIVATE_KEY).map(String::as_str),
        Some(format!("0x{:064x}", 3).as_str())
    );
    assert_eq!(third.args.as_slice(), ["2"]);
}

#[tokio::test]
async fn test_k8s_output_and_deployment_record() {
    let dir = tempfile::tempdir().unwrap();
    let (deploy, keys_dir) = write_fixture(dir.path()).await;

    let loaded = load_deploy_file(&deploy, "predictoor_config").await.unwrap();
    let keys = FileKeyStore::new(&keys_dir)
        .keys_for("predictoor_config")
        .await
        .unwrap();
    let set = generate_launch_configs(&loaded.config, &keys).unwrap();

    let out = dir.path().join("k8s");
    let files = render(&set, &loaded.config, DeploymentMethod::K8s).unwrap();
    let written = write_rendered(&out, &files).await.unwrap();
    assert_eq!(written.len(), 3);

    let manifest = std::fs::read_to_string(out.join("pdr-predictoor1-3-btc-usdt-5m-binance.yaml"))
        .unwrap();
    assert!(manifest.contains("kind: Deployment"));
    assert!(manifest.contains("app: pdr-predictoor"));

    // Writing again into the same folder is refused
    assert!(write_rendered(&out, &files).await.is_err());

    let store = FileDeploymentStore::new(dir.path().join(".deployments"));
    let info = DeploymentInfo {
        config_name: loaded.config_name.clone(),
        folder: out.display().to_string(),
        deployment_method: DeploymentMethod::K8s,
        ts_created: 1_700_000_000,
        deployment_names: set.ecosystem.names().into_iter().map(String::from).collect(),
        config: loaded.raw.clone(),
    };
    store.save(&info).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed, vec![info]);
    assert_eq!(listed[0].config["approach"], 3);
}

#[tokio::test]
async fn test_missing_keys_are_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let (deploy, _) = write_fixture(dir.path()).await;

    let loaded = load_deploy_file(&deploy, "predictoor_config").await.unwrap();
    let keys = FileKeyStore::new(dir.path().join("no-keys"))
        .keys_for("predictoor_config")
        .await
        .unwrap();
    let set = generate_launch_configs(&loaded.config, &keys).unwrap();
    assert_eq!(set.warnings.len(), 3);

    let report = validate_ecosystem(&set.ecosystem);
    assert!(!report.has_errors());
    assert!(report
        .warnings()
        .any(|issue| issue.key.as_deref() == Some(env_keys::PRIVATE_KEY)));
}

#[tokio::test]
async fn test_missing_keys_are_generated_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let (deploy, _) = write_fixture(dir.path()).await;
    let loaded = load_deploy_file(&deploy, "predictoor_config").await.unwrap();

    let store = FileKeyStore::new(dir.path().join("fresh-keys"));
    let mut keys = store.keys_for("predictoor_config").await.unwrap();
    let missing = keys_needed(&loaded.config, keys.len()).unwrap();
    assert_eq!(missing, 3);

    let fresh = generate_keys(missing);
    store.append("predictoor_config", &fresh).await.unwrap();
    keys.extend(fresh);

    let set = generate_launch_configs(&loaded.config, &keys).unwrap();
    assert!(set.warnings.is_empty());
    let assigned: std::collections::HashSet<_> = set
        .ecosystem
        .apps
        .iter()
        .map(|app| app.env[env_keys::PRIVATE_KEY].clone())
        .collect();
    assert_eq!(assigned.len(), 3);
    assert!(assigned.iter().all(|k| env_keys::is_private_key(k)));

    // A second run reuses the saved keys
    let reloaded = store.keys_for("predictoor_config").await.unwrap();
    assert_eq!(reloaded, keys);
    assert_eq!(keys_needed(&loaded.config, reloaded.len()).unwrap(), 0);
}
