//! JSON-RPC round trip against a supervisor with a mock launcher

use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;

use fleet_api_rpc::error::code;
use fleet_api_rpc::types::{ProcessActionResponse, ProcessInfo, StatsResponse, TailLogsResponse};
use fleet_api_rpc::{RpcServer, RpcServerConfig};
use fleet_core::application::{shutdown_channel, RestartPolicy, Supervisor};
use fleet_core::domain::{Ecosystem, LaunchConfig, ProcessState};
use fleet_core::port::id_provider::mocks::SequentialIdProvider;
use fleet_core::port::process_launcher::mocks::MockLauncher;
use fleet_core::port::process_probe::mocks::MockProcessProbe;
use fleet_core::port::time_provider::mocks::MockTimeProvider;

fn name_params(name: &str) -> ObjectParams {
    let mut params = ObjectParams::new();
    params.insert("name", name).unwrap();
    params
}

async fn list(client: &HttpClient) -> Vec<ProcessInfo> {
    client.request("process.list.v1", rpc_params![]).await.unwrap()
}

async fn wait_state(client: &HttpClient, name: &str, state: ProcessState) -> ProcessInfo {
    for _ in 0..100 {
        if let Some(info) = list(client).await.into_iter().find(|i| i.name == name) {
            if info.state == state {
                return info;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached {}", name, state);
}

#[tokio::test]
async fn test_rpc_round_trip() {
    let time = Arc::new(MockTimeProvider::new(1_700_000_000_000));
    let launcher = MockLauncher::new_hold();
    let supervisor = Supervisor::new(
        Ecosystem::new(vec![
            LaunchConfig::new("pdr-predictoor1-3-BTC-USDT-5m-binance", "pdr_backend/predictoor/main.py"),
            LaunchConfig::new("pdr-trader1-1-ETH-USDT-1h-binance", "pdr_backend/trader/main.py"),
        ]),
        Arc::new(launcher.clone()),
        Arc::new(RestartPolicy::default()),
        time.clone(),
        Arc::new(SequentialIdProvider::default()),
    )
    .unwrap();

    let server = RpcServer::new(
        RpcServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        supervisor.handle(),
        Arc::new(MockProcessProbe::new(1.5, 128)),
        time.clone(),
    )
    .start()
    .await
    .unwrap();

    let (shutdown_tx, token) = shutdown_channel();
    let task = tokio::spawn(supervisor.run(token));

    let client = HttpClientBuilder::default()
        .build(format!("http://{}", server.addr))
        .unwrap();

    // process.list.v1
    let trader = "pdr-trader1-1-ETH-USDT-1h-binance";
    let info = wait_state(&client, trader, ProcessState::Running).await;
    assert_eq!(info.memory_mb, Some(128));
    assert!(info.instance_id.is_some());

    time.advance(90_000);
    let info = wait_state(&client, trader, ProcessState::Running).await;
    assert_eq!(info.uptime_ms, Some(90_000));

    // process.stop.v1 / process.start.v1
    let resp: ProcessActionResponse = client
        .request("process.stop.v1", name_params(trader))
        .await
        .unwrap();
    assert!(resp.accepted);
    let info = wait_state(&client, trader, ProcessState::Stopped).await;
    assert!(info.pid.is_none());

    let resp: ProcessActionResponse = client
        .request("process.start.v1", name_params(trader))
        .await
        .unwrap();
    assert!(resp.accepted);
    wait_state(&client, trader, ProcessState::Running).await;

    // process.restart.v1
    let resp: ProcessActionResponse = client
        .request("process.restart.v1", name_params(trader))
        .await
        .unwrap();
    assert_eq!(resp.name, trader);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let info = wait_state(&client, trader, ProcessState::Running).await;
    assert_eq!(info.restarts, 1);

    // logs.tail.v1: the mock launcher writes no log files
    let mut params = name_params(trader);
    params.insert("lines", 5).unwrap();
    let tail: TailLogsResponse = client.request("logs.tail.v1", params).await.unwrap();
    assert!(tail.lines.is_empty());

    // admin.stats.v1
    let stats: StatsResponse = client.request("admin.stats.v1", rpc_params![]).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.running, 2);
    assert_eq!(stats.restarts, 1);
    assert_eq!(stats.uptime_seconds, 90);

    // Unknown names map to NOT_FOUND
    let err = client
        .request::<ProcessActionResponse, _>("process.start.v1", name_params("nope"))
        .await
        .unwrap_err();
    match err {
        ClientError::Call(obj) => assert_eq!(obj.code(), code::NOT_FOUND),
        other => panic!("unexpected error: {:?}", other),
    }

    shutdown_tx.shutdown();
    task.await.unwrap().unwrap();
    server.handle.stop().unwrap();
    assert!(launcher.kills().len() >= 3);
}
