//! fleet - validate and generate launch configurations, control fleetd

mod local;
mod remote;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_core::domain::DeploymentMethod;
use std::path::PathBuf;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9629";

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Launch configurations for predictoor / trader agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// fleetd RPC URL
    #[arg(long, global = true, env = "FLEET_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an ecosystem file
    Validate {
        /// Ecosystem file (.json / .yaml / .yml)
        file: PathBuf,
    },

    /// Show the processes of an ecosystem file
    Show {
        file: PathBuf,
    },

    /// Print the environment of one process
    Env {
        file: PathBuf,

        /// Process name
        name: String,

        /// Print secrets in clear
        #[arg(long)]
        reveal: bool,
    },

    /// Convert an ecosystem file between JSON and YAML
    Convert {
        input: PathBuf,

        /// Output file; format follows its extension
        output: PathBuf,
    },

    /// Generate deployment files from an agent deploy file
    Generate {
        /// Deploy file (YAML, one section per config name)
        #[arg(short, long, default_value = "deploy.yml")]
        file: PathBuf,

        /// Section of the deploy file
        #[arg(short, long)]
        config: String,

        /// pm2, docker-compose or k8s
        #[arg(short, long, default_value = "pm2")]
        method: DeploymentMethod,

        /// Output directory (must be missing or empty)
        #[arg(short, long)]
        output: PathBuf,

        /// Key store directory
        #[arg(long, env = "FLEET_KEYS_DIR", default_value = ".keys")]
        keys_dir: PathBuf,

        /// Deployment records directory
        #[arg(long, env = "FLEET_DEPLOYMENTS_DIR", default_value = ".deployments")]
        deployments_dir: PathBuf,
    },

    /// List generated deployments
    Deployments {
        #[arg(long, env = "FLEET_DEPLOYMENTS_DIR", default_value = ".deployments")]
        deployments_dir: PathBuf,
    },

    /// List supervised processes
    List,

    /// Start a process
    Start { name: String },

    /// Stop a process
    Stop { name: String },

    /// Restart a process
    Restart { name: String },

    /// Tail process logs
    Logs {
        name: String,

        /// Number of lines to tail
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,

        /// Read stderr instead of stdout
        #[arg(long)]
        err: bool,
    },

    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Validate { file } => local::validate(&file).await,
        Commands::Show { file } => local::show(&file).await,
        Commands::Env { file, name, reveal } => local::env(&file, &name, reveal).await,
        Commands::Convert { input, output } => local::convert(&input, &output).await,
        Commands::Generate {
            file,
            config,
            method,
            output,
            keys_dir,
            deployments_dir,
        } => {
            local::generate(local::GenerateArgs {
                file,
                config_name: config,
                method,
                output,
                keys_dir,
                deployments_dir,
            })
            .await
        }
        Commands::Deployments { deployments_dir } => local::deployments(&deployments_dir).await,
        Commands::List => remote::list(url).await,
        Commands::Start { name } => remote::action(url, "start", &name).await,
        Commands::Stop { name } => remote::action(url, "stop", &name).await,
        Commands::Restart { name } => remote::action(url, "restart", &name).await,
        Commands::Logs { name, lines, err } => remote::logs(url, &name, lines, err).await,
        Commands::Status => remote::status(url).await,
    }
}
