//! JSON-RPC Server
//!
//! Serves the supervisor's process controls over JSON-RPC 2.0 on TCP.

use crate::handler::RpcHandler;
use crate::types::{ProcessNameRequest, TailLogsRequest};
use fleet_core::application::SupervisorHandle;
use fleet_core::port::{ProcessProbe, TimeProvider};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

// TCP on localhost only, no external access
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9629;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// A running server and the address it bound
pub struct StartedServer {
    pub addr: SocketAddr,
    pub handle: ServerHandle,
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        supervisor: SupervisorHandle,
        probe: Arc<dyn ProcessProbe>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(supervisor, probe, time_provider)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Port 0 binds an ephemeral port; see `StartedServer::addr`.
    pub async fn start(self) -> Result<StartedServer, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let bound = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method("process.list.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.list().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("process.start.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ProcessNameRequest = params.parse()?;
                    handler.start(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("process.stop.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ProcessNameRequest = params.parse()?;
                    handler.stop(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("process.restart.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ProcessNameRequest = params.parse()?;
                    handler.restart(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("logs.tail.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: TailLogsRequest = params.parse()?;
                    handler.tail_logs(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(|e| e.to_string())?;

        info!(addr = %bound, "JSON-RPC server started");

        let handle = server.start(module);
        Ok(StartedServer {
            addr: bound,
            handle,
        })
    }
}
