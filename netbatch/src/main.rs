//! netbatch command line.
//!
//! # Usage
//!
//! ```bash
//! netbatch groups
//! netbatch config switch_group_a vlan_tpl.txt vlan_id=10 vlan_name=IT
//! netbatch inspect switch_group_a
//! netbatch schedule --interval 3600 switch_group_a router_group_b
//! ```
//!
//! Set RUST_LOG=debug for verbose output.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;

use netbatch::transport::HostKeyVerification;
use netbatch::{BatchReport, Engine, Registry, Scheduler, Settings, SshSessionProvider, TemplateParams};

/// Batch configuration and inspection for network device groups
#[derive(Parser, Debug)]
#[command(name = "netbatch", version, about)]
struct Cli {
    /// Device registry file (groups of devices)
    #[arg(long, default_value = "config/devices.yaml", env = "NETBATCH_DEVICES")]
    devices: PathBuf,

    /// Settings file
    #[arg(long, default_value = "config/settings.yaml", env = "NETBATCH_SETTINGS")]
    settings: PathBuf,

    /// Reject devices whose host key is not already in known_hosts
    #[arg(long, conflicts_with = "insecure")]
    strict_host_keys: bool,

    /// Skip host key checks entirely (lab use only)
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List device groups
    Groups,

    /// Push a configuration template to every device of a group
    Config {
        /// Device group
        group: String,

        /// Template file name inside the templates directory
        template: String,

        /// Template parameters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Inspect every device of a group
    Inspect {
        /// Device group
        group: String,
    },

    /// Inspect groups on a fixed interval until interrupted
    Schedule {
        /// Seconds between runs (default: inspect.interval from settings)
        #[arg(long)]
        interval: Option<u64>,

        /// Groups to inspect (default: all)
        groups: Vec<String>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn print_report<T: Serialize>(report: &BatchReport<T>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Resolves when `signal` fires. If the listener cannot be installed this
/// never resolves, so the caller keeps running until killed.
async fn shutdown_on(signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("interrupt received, stopping"),
        Err(e) => {
            error!("cannot listen for interrupt ({e}); stop the process to exit");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = Settings::try_load(&cli.settings)?;
    let defaulted = loaded.is_none();
    let settings = loaded.unwrap_or_default();
    let _log_guard = netbatch::logging::init(&settings.log)?;
    if defaulted {
        warn!("Settings file {} not found, using defaults", cli.settings.display());
    }
    let registry = Registry::load(&cli.devices)?;

    let host_keys = if cli.insecure {
        HostKeyVerification::Disabled
    } else if cli.strict_host_keys {
        HostKeyVerification::Strict
    } else {
        HostKeyVerification::AcceptNew
    };
    let provider = SshSessionProvider::new(settings.connect_timeout()).host_key_verification(host_keys);
    let engine = Engine::new(registry, settings, provider);

    match cli.command {
        Command::Groups => {
            for group in engine.groups() {
                let count = engine.registry().resolve(&group).map_or(0, |d| d.len());
                println!("{group} ({count} device(s))");
            }
        }
        Command::Config {
            group,
            template,
            params,
        } => {
            let params: TemplateParams = params.into_iter().collect();
            let report = engine.run_batch_config(&group, &template, params).await;
            print_report(&report)?;
        }
        Command::Inspect { group } => {
            let report = engine.run_batch_inspect(&group).await;
            print_report(&report)?;
        }
        Command::Schedule { interval, groups } => {
            let interval = Duration::from_secs(interval.unwrap_or(engine.settings().inspect.interval));
            Scheduler::new(&engine, interval)
                .with_groups(groups)
                .run(shutdown_on(tokio::signal::ctrl_c()))
                .await;
        }
    }

    Ok(())
}
