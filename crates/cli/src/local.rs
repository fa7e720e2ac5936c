//! Commands that work on local files

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

use fleet_core::application::{
    generate_launch_configs, keys_needed, render, validate_ecosystem, Severity,
};
use fleet_core::domain::{env_keys, AgentRole, DeploymentInfo, DeploymentMethod, LaunchConfig};
use fleet_core::port::time_provider::SystemTimeProvider;
use fleet_core::port::{DeploymentStore, KeyStore, TimeProvider};
use fleet_infra_fs::{
    generate_keys, load_deploy_file, load_ecosystem, write_ecosystem, write_rendered,
    FileDeploymentStore, FileKeyStore,
};

#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ROLE")]
    role: String,
    #[tabled(rename = "COMMAND")]
    command: String,
    #[tabled(rename = "ENV")]
    env: usize,
    #[tabled(rename = "RESTART")]
    restart: String,
}

impl AppRow {
    fn from_config(app: &LaunchConfig) -> Self {
        let command = app
            .command_line()
            .map(|line| line.to_string())
            .unwrap_or_else(|_| app.script.clone());
        let restart = if app.autorestart {
            format!("max {} / {}ms", app.max_restarts, app.restart_delay_ms)
        } else {
            "off".to_string()
        };
        Self {
            name: app.name.clone(),
            role: AgentRole::infer(app)
                .map(|r| r.as_str().to_string())
                .unwrap_or_else(|| "other".to_string()),
            command,
            env: app.env.len(),
            restart,
        }
    }
}

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "CONFIG")]
    config_name: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "AGENTS")]
    agents: usize,
    #[tabled(rename = "FOLDER")]
    folder: String,
    #[tabled(rename = "CREATED")]
    created: i64,
}

pub async fn validate(file: &Path) -> Result<()> {
    let ecosystem = load_ecosystem(file).await?;
    let report = validate_ecosystem(&ecosystem);

    for issue in &report.issues {
        match issue.severity {
            Severity::Error => println!("  {} {}", "✗".red(), issue),
            Severity::Warning => println!("  {} {}", "!".yellow(), issue),
        }
    }

    if report.has_errors() {
        anyhow::bail!(
            "{}: {} error(s), {} warning(s)",
            file.display(),
            report.errors().count(),
            report.warnings().count()
        );
    }

    println!(
        "{}",
        format!(
            "✓ {} is valid ({} processes, {} warnings)",
            file.display(),
            ecosystem.len(),
            report.warnings().count()
        )
        .green()
        .bold()
    );
    Ok(())
}

pub async fn show(file: &Path) -> Result<()> {
    let ecosystem = load_ecosystem(file).await?;
    let rows: Vec<AppRow> = ecosystem.apps.iter().map(AppRow::from_config).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn env(file: &Path, name: &str, reveal: bool) -> Result<()> {
    let ecosystem = load_ecosystem(file).await?;
    let app = ecosystem.find(name).with_context(|| {
        format!(
            "No process '{}' in {} (have: {})",
            name,
            file.display(),
            ecosystem.names().join(", ")
        )
    })?;

    for (key, value) in &app.env {
        println!("{}={}", key.bold(), env_keys::display_value(key, value, reveal));
    }
    Ok(())
}

pub async fn convert(input: &Path, output: &Path) -> Result<()> {
    let ecosystem = load_ecosystem(input).await?;
    write_ecosystem(output, &ecosystem).await?;
    println!(
        "{}",
        format!("✓ Wrote {} ({} processes)", output.display(), ecosystem.len())
            .green()
            .bold()
    );
    Ok(())
}

pub struct GenerateArgs {
    pub file: PathBuf,
    pub config_name: String,
    pub method: DeploymentMethod,
    pub output: PathBuf,
    pub keys_dir: PathBuf,
    pub deployments_dir: PathBuf,
}

pub async fn generate(args: GenerateArgs) -> Result<()> {
    let loaded = load_deploy_file(&args.file, &args.config_name).await?;
    let key_store = FileKeyStore::new(&args.keys_dir);
    let mut keys = key_store.keys_for(&args.config_name).await?;

    let missing = keys_needed(&loaded.config, keys.len())?;
    if missing > 0 {
        let fresh = generate_keys(missing);
        key_store
            .append(&args.config_name, &fresh)
            .await
            .context("saving generated keys")?;
        println!(
            "  {} Generated {} new keys into {}",
            "+".green(),
            missing,
            args.keys_dir.display()
        );
        keys.extend(fresh);
    }

    let set = generate_launch_configs(&loaded.config, &keys)?;
    for warning in &set.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }

    let files = render(&set, &loaded.config, args.method)?;
    let written = write_rendered(&args.output, &files).await?;

    let folder = args.output.display().to_string();
    let info = DeploymentInfo {
        config_name: args.config_name.clone(),
        folder: folder.clone(),
        deployment_method: args.method,
        ts_created: SystemTimeProvider.now_millis() / 1000,
        deployment_names: set.ecosystem.names().into_iter().map(String::from).collect(),
        config: loaded.raw,
    };
    FileDeploymentStore::new(&args.deployments_dir)
        .save(&info)
        .await?;

    println!(
        "{}",
        format!(
            "✓ Generated {} {} agents into {} ({} files)",
            set.ecosystem.len(),
            loaded.config.role,
            folder,
            written.len()
        )
        .green()
        .bold()
    );
    let rows: Vec<AppRow> = set.ecosystem.apps.iter().map(AppRow::from_config).collect();
    println!("{}", Table::new(rows));
    println!();
    println!("Deploy with:");
    println!(
        "  {}",
        args.method.deploy_command(&folder, &args.config_name).cyan()
    );
    Ok(())
}

pub async fn deployments(dir: &Path) -> Result<()> {
    let infos = FileDeploymentStore::new(dir).list().await?;
    if infos.is_empty() {
        println!("{}", "No deployments".yellow());
        return Ok(());
    }

    let rows: Vec<DeploymentRow> = infos
        .into_iter()
        .map(|info| DeploymentRow {
            config_name: info.config_name,
            method: info.deployment_method.to_string(),
            agents: info.deployment_names.len(),
            folder: info.folder,
            created: info.ts_created,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}
