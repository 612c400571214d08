//! Site Builder - Terminal Front End
//!
//! Entry point for `site-builder`, which drives the builder core from a
//! terminal: one-shot generation and refinement, an interactive chat, and
//! version history management.
//!
//! # Usage
//!
//! ```bash
//! # Generate a page and write it to a file
//! site-builder generate "A landing page for a bakery" -o bakery.html
//!
//! # Refine the most recent version
//! site-builder refine accessibility
//!
//! # Interactive session
//! site-builder chat
//!
//! # Verbose logging
//! RUST_LOG=debug site-builder generate "..."
//! ```
//!
//! Generated HTML goes to stdout (or `--output`); progress and logs go to
//! stderr.

mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use builder_core::{
    default_config_path, load_config_from_path, BuilderConfig, ConfigOverrides, RefinementKind,
};

/// Site Builder - turn prompts into websites
#[derive(Parser, Debug)]
#[command(name = "site-builder")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "SITE_BUILDER_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Generation service URL
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Model key (see `site-builder models`)
    #[arg(short = 'm', long, value_name = "KEY", global = true)]
    model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Directory holding version history
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Write generated HTML here instead of stdout
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "SITE_BUILDER_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a website from a prompt
    Generate {
        /// What to build
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Refine existing HTML
    Refine {
        /// style, functionality, accessibility, performance or custom
        kind: RefinementKind,

        /// Instruction (defaults to the kind's built-in instruction)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Refine the HTML in this file
        #[arg(long, value_name = "FILE", conflicts_with = "version_id")]
        from: Option<PathBuf>,

        /// Refine a saved version (defaults to the most recent)
        #[arg(long = "version", value_name = "ID")]
        version_id: Option<String>,
    },

    /// Interactive chat session
    Chat,

    /// Manage saved versions
    Versions {
        #[command(subcommand)]
        action: VersionsAction,
    },

    /// List selectable models
    Models,
}

/// `versions` actions
#[derive(Subcommand, Debug)]
pub enum VersionsAction {
    /// List saved versions, most recent first
    List,
    /// Print a saved version's HTML
    Show {
        /// Version ID
        id: String,
    },
    /// Delete a saved version
    Delete {
        /// Version ID
        id: String,
    },
    /// Delete all saved versions
    Clear,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so stdout can carry generated HTML.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("site_builder={level},builder_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Resolve configuration: defaults, file, environment, then CLI flags
fn load_settings(args: &Args) -> Result<BuilderConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.api_url {
        overrides = overrides.with_api_url(url.clone());
    }
    if let Some(ref model) = args.model {
        overrides = overrides.with_model(model.clone());
    }
    if let Some(secs) = args.timeout {
        overrides = overrides.with_timeout_secs(secs);
    }
    if let Some(ref dir) = args.data_dir {
        overrides = overrides.with_data_dir(dir.clone());
    }
    overrides.apply(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Site builder starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_settings(&args)?;
    info!(
        api = %config.api.base_url,
        model = %config.default_model,
        source = %config.source(),
        "Configuration loaded"
    );

    commands::run(args.command, &config, args.output.as_deref()).await
}
