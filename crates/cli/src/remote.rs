//! Commands that talk to fleetd over JSON-RPC

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    /// `null` when the server could not read the request id
    #[allow(dead_code)]
    #[serde(default)]
    id: Option<serde_json::Value>,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct ProcessInfo {
    name: String,
    state: String,
    pid: Option<u32>,
    restarts: u32,
    uptime_ms: Option<i64>,
    last_exit_code: Option<i32>,
    cpu_percent: Option<f32>,
    memory_mb: Option<u64>,
}

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "UPTIME")]
    uptime: String,
    #[tabled(rename = "RESTARTS")]
    restarts: u32,
    #[tabled(rename = "EXIT")]
    exit: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "MEM")]
    memory: String,
}

impl From<ProcessInfo> for ProcessRow {
    fn from(info: ProcessInfo) -> Self {
        let dash = || "-".to_string();
        Self {
            state: colorize_state(&info.state),
            name: info.name,
            pid: info.pid.map(|p| p.to_string()).unwrap_or_else(dash),
            uptime: info.uptime_ms.map(format_uptime).unwrap_or_else(dash),
            restarts: info.restarts,
            exit: info.last_exit_code.map(|c| c.to_string()).unwrap_or_else(dash),
            cpu: info
                .cpu_percent
                .map(|c| format!("{:.1}%", c))
                .unwrap_or_else(dash),
            memory: info
                .memory_mb
                .map(|m| format!("{} MB", m))
                .unwrap_or_else(dash),
        }
    }
}

fn colorize_state(state: &str) -> String {
    match state {
        "RUNNING" => state.green().to_string(),
        "ERRORED" => state.red().to_string(),
        "STARTING" | "RESTARTING" => state.yellow().to_string(),
        _ => state.to_string(),
    }
}

/// Compact duration: 45s, 12m 5s, 3h 20m, 2d 4h
fn format_uptime(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let (d, h, m, s) = (secs / 86_400, secs % 86_400 / 3600, secs % 3600 / 60, secs % 60);
    if d > 0 {
        format!("{}d {}h", d, h)
    } else if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to fleetd")?
        .json()
        .await
        .context("Failed to parse response")?;

    into_result(response)
}

fn into_result(response: JsonRpcResponse) -> Result<serde_json::Value> {
    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

pub async fn list(url: &str) -> Result<()> {
    let result = call_rpc(url, "process.list.v1", json!({})).await?;
    let infos: Vec<ProcessInfo> = serde_json::from_value(result)?;
    if infos.is_empty() {
        println!("{}", "No processes".yellow());
        return Ok(());
    }
    let rows: Vec<ProcessRow> = infos.into_iter().map(ProcessRow::from).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// start / stop / restart
pub async fn action(url: &str, action: &str, name: &str) -> Result<()> {
    let method = format!("process.{}.v1", action);
    let result = call_rpc(url, &method, json!({ "name": name })).await?;

    if result["accepted"].as_bool().unwrap_or(false) {
        println!("{}", format!("✓ {} {} requested", name, action).green().bold());
    } else {
        println!(
            "{}",
            format!("○ {} is already in the requested state", name).yellow()
        );
    }
    Ok(())
}

pub async fn logs(url: &str, name: &str, lines: usize, err: bool) -> Result<()> {
    let stream = if err { "err" } else { "out" };
    let params = json!({
        "name": name,
        "lines": lines,
        "stream": stream,
    });

    let result = call_rpc(url, "logs.tail.v1", params).await?;
    let lines: Vec<String> = serde_json::from_value(result["lines"].clone()).unwrap_or_default();

    match result["log_path"].as_str() {
        Some(path) if !lines.is_empty() => {
            println!("{}", format!("==> {} <==", path).cyan().bold());
            for line in lines {
                println!("{}", line);
            }
        }
        _ => println!("{}", "No logs available".yellow()),
    }
    Ok(())
}

pub async fn status(url: &str) -> Result<()> {
    println!("{}", "fleetd Status".cyan().bold());
    println!();

    match call_rpc(url, "admin.stats.v1", json!({})).await {
        Ok(stats) => {
            println!("  {} {}", "RPC URL:".bold(), url);
            println!("  {} {}", "Status:".bold(), "ONLINE".green());
            println!();
            println!("  {} {}", "Processes:".bold(), stats["total"]);
            println!("  {} {}", "Running:".bold(), stats["running"]);
            println!("  {} {}", "Stopped:".bold(), stats["stopped"]);
            println!("  {} {}", "Errored:".bold(), stats["errored"]);
            println!("  {} {}", "Restarts:".bold(), stats["restarts"]);
            println!();
            let uptime = stats["uptime_seconds"].as_i64().unwrap_or(0);
            println!("  {} {}", "Uptime:".bold(), format_uptime(uptime * 1000));
        }
        Err(e) => {
            println!("  {} {}", "Status:".bold(), "ERROR".red());
            println!("  {} {}", "Error:".bold(), e);
        }
    }
    Ok(())
}
