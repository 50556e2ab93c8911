use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use filter_core::{InvokeType, Role};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{run_explain, run_invoke, InvokeArgs};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "filter-chain")]
#[command(about = "Inspect and exercise RPC filter chains")]
#[command(version)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the selected and loaded filters of every configured service
    Explain {
        /// Service configuration file (json, yaml or toml)
        #[arg(short, long)]
        config: PathBuf,

        /// Only show chains for this side (both if omitted)
        #[arg(short, long, value_enum)]
        role: Option<RoleArg>,
    },
    /// Send one call through a service's chain to an echo terminal
    Invoke {
        /// Service configuration file (json, yaml or toml)
        #[arg(short, long)]
        config: PathBuf,

        /// Target service interface
        #[arg(short, long)]
        service: String,

        /// Method to call
        #[arg(short, long)]
        method: String,

        /// Arguments as a JSON array (a single value is wrapped)
        #[arg(short, long)]
        args: Option<String>,

        /// Side of the call to build the chain for
        #[arg(short, long, value_enum, default_value = "consumer")]
        role: RoleArg,

        /// Delivery mode of the response
        #[arg(short = 't', long, value_enum, default_value = "sync")]
        invoke_type: InvokeTypeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Provider,
    Consumer,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Provider => Role::Provider,
            RoleArg::Consumer => Role::Consumer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InvokeTypeArg {
    Sync,
    Future,
    Callback,
    Oneway,
}

impl From<InvokeTypeArg> for InvokeType {
    fn from(invoke_type: InvokeTypeArg) -> Self {
        match invoke_type {
            InvokeTypeArg::Sync => InvokeType::Sync,
            InvokeTypeArg::Future => InvokeType::Future,
            InvokeTypeArg::Callback => InvokeType::Callback,
            InvokeTypeArg::Oneway => InvokeType::Oneway,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Explain { config, role } => {
            let config = load(&config)?;
            let roles = match role {
                Some(role) => vec![role.into()],
                None => vec![Role::Provider, Role::Consumer],
            };
            print!("{}", run_explain(&config, &roles)?);
        }
        Commands::Invoke {
            config,
            service,
            method,
            args,
            role,
            invoke_type,
        } => {
            let config = load(&config)?;
            let args = InvokeArgs {
                service,
                method,
                args: parse_args(args.as_deref())?,
                role: role.into(),
                invoke_type: invoke_type.into(),
            };
            let response = run_invoke(&config, args).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<CliConfig> {
    CliConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn parse_args(args: Option<&str>) -> Result<Vec<serde_json::Value>> {
    let Some(args) = args else {
        return Ok(Vec::new());
    };
    let value: serde_json::Value =
        serde_json::from_str(args).with_context(|| format!("Invalid JSON arguments: {}", args))?;

    Ok(match value {
        serde_json::Value::Array(values) => values,
        other => vec![other],
    })
}
