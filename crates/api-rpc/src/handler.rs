//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    LogStream, ProcessActionResponse, ProcessInfo, ProcessNameRequest, StatsResponse,
    TailLogsRequest, TailLogsResponse,
};
use fleet_core::application::SupervisorHandle;
use fleet_core::error::AppError;
use fleet_core::port::{ProcessProbe, TimeProvider};
use jsonrpsee::types::ErrorObjectOwned;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

const TAIL_CHUNK_BYTES: u64 = 64 * 1024;
const MAX_TAIL_BYTES: u64 = 4 * 1024 * 1024;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    supervisor: SupervisorHandle,
    probe: Arc<dyn ProcessProbe>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RpcHandler {
    pub fn new(
        supervisor: SupervisorHandle,
        probe: Arc<dyn ProcessProbe>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            supervisor,
            probe,
            time_provider,
        }
    }

    /// process.list.v1
    pub async fn list(&self) -> Result<Vec<ProcessInfo>, ErrorObjectOwned> {
        let now = self.time_provider.now_millis();
        let mut infos = Vec::new();
        for record in self.supervisor.list().await {
            let metrics = match record.pid {
                Some(pid) => self.probe.sample(pid).await,
                None => None,
            };
            infos.push(ProcessInfo::from_record(record, now, metrics));
        }
        Ok(infos)
    }

    /// process.start.v1
    pub async fn start(
        &self,
        params: ProcessNameRequest,
    ) -> Result<ProcessActionResponse, ErrorObjectOwned> {
        let accepted = self
            .supervisor
            .start(&params.name)
            .await
            .map_err(to_rpc_error)?;
        Ok(ProcessActionResponse {
            name: params.name,
            accepted,
        })
    }

    /// process.stop.v1
    pub async fn stop(
        &self,
        params: ProcessNameRequest,
    ) -> Result<ProcessActionResponse, ErrorObjectOwned> {
        let accepted = self
            .supervisor
            .stop(&params.name)
            .await
            .map_err(to_rpc_error)?;
        Ok(ProcessActionResponse {
            name: params.name,
            accepted,
        })
    }

    /// process.restart.v1
    pub async fn restart(
        &self,
        params: ProcessNameRequest,
    ) -> Result<ProcessActionResponse, ErrorObjectOwned> {
        let accepted = self
            .supervisor
            .restart(&params.name)
            .await
            .map_err(to_rpc_error)?;
        Ok(ProcessActionResponse {
            name: params.name,
            accepted,
        })
    }

    /// logs.tail.v1
    pub async fn tail_logs(
        &self,
        params: TailLogsRequest,
    ) -> Result<TailLogsResponse, ErrorObjectOwned> {
        let record = self
            .supervisor
            .get(&params.name)
            .await
            .map_err(to_rpc_error)?;

        let log_path = match params.stream {
            LogStream::Out => record.out_log,
            LogStream::Err => record.err_log,
        };

        // A log that was never written yet reads as empty
        let lines = match &log_path {
            Some(path) => match read_tail(Path::new(path), params.lines).await {
                Ok(lines) => lines,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![],
                Err(e) => return Err(to_rpc_error(AppError::Io(e))),
            },
            None => vec![],
        };
        debug!(name = %params.name, lines = %lines.len(), "Tailed log");

        Ok(TailLogsResponse {
            name: params.name,
            log_path,
            lines,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        Ok(self.supervisor.stats().await)
    }
}

fn last_lines(content: &str, n: usize) -> Vec<String> {
    let all_lines: Vec<&str> = content.lines().collect();
    let start = all_lines.len().saturating_sub(n);
    all_lines[start..].iter().map(|s| s.to_string()).collect()
}

/// Last `n` lines of a log, reading only a window from the end
///
/// The window doubles until it holds `n` full lines, reaches the start of
/// the file or hits MAX_TAIL_BYTES. Invalid UTF-8 is replaced, not dropped.
async fn read_tail(path: &Path, n: usize) -> std::io::Result<Vec<String>> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let mut window = TAIL_CHUNK_BYTES.min(len);

    loop {
        let start = len - window;
        // One extra byte tells whether `start` sits on a line boundary
        let read_from = start.saturating_sub(1);
        file.seek(SeekFrom::Start(read_from)).await?;
        let mut buf = Vec::with_capacity((len - read_from) as usize);
        (&mut file).take(len - read_from).read_to_end(&mut buf).await?;

        let body = if start == 0 {
            &buf[..]
        } else {
            match buf.iter().position(|b| *b == b'\n') {
                Some(i) => &buf[i + 1..],
                None => &buf[buf.len()..],
            }
        };
        let content = String::from_utf8_lossy(body);
        let complete = content.lines().count() >= n;

        if complete || start == 0 || window >= MAX_TAIL_BYTES {
            return Ok(last_lines(&content, n));
        }
        window = (window * 2).min(len).min(MAX_TAIL_BYTES);
    }
}
