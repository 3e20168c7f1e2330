//! gws: operator CLI for the gateway config synchronizer.
//!
//! Reads JSON snapshots (desired content, current gateway state) and layered
//! YAML settings; never talks to a live control plane.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gws_config::ConfigMode;

mod commands;

#[derive(Parser)]
#[command(name = "gws")]
#[command(about = "Declarative gateway config synchronizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the changes needed to reach the desired state and print them
    /// (dry-run solve; no calls are made).
    Diff {
        /// Desired content documents (JSON), merged in order
        #[arg(long = "desired", required = true)]
        desired: Vec<String>,

        /// Current gateway state snapshot (JSON list of entities); empty if omitted
        #[arg(long)]
        current: Option<String>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Refuse configs carrying keys this command does not read
        #[arg(long, default_value_t = false)]
        strict_config: bool,

        /// Exit with status 2 when the plan is not empty
        #[arg(long, default_value_t = false)]
        exit_code: bool,
    },

    /// Flatten, validate and resolve the desired state without planning.
    Validate {
        #[arg(long = "desired", required = true)]
        desired: Vec<String>,

        #[arg(long)]
        current: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> team ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Diff {
            desired,
            current,
            config_paths,
            strict_config,
            exit_code,
        } => {
            let inputs = commands::Inputs::load(
                ConfigMode::Diff,
                &desired,
                current.as_deref(),
                &config_paths,
                strict_config,
            )?;
            let changed = commands::plan::run_diff(inputs).await?;
            if exit_code && changed {
                std::process::exit(2);
            }
        }

        Commands::Validate {
            desired,
            current,
            config_paths,
            strict_config,
        } => {
            let inputs = commands::Inputs::load(
                ConfigMode::Validate,
                &desired,
                current.as_deref(),
                &config_paths,
                strict_config,
            )?;
            commands::plan::run_validate(inputs)?;
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = gws_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
