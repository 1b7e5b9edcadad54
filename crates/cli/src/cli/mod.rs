pub mod config;
pub mod history;
pub mod models;
pub mod run;

use clap::{Parser, Subcommand};

/// Parley: retrieval-augmented chat over pluggable model families.
#[derive(Debug, Parser)]
#[command(name = "parley", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one message and append the exchange to the session history.
    Run {
        /// The message to send.
        message: String,
        /// Session id.
        #[arg(long, default_value = "cli")]
        session: String,
        /// User id owning the session.
        #[arg(long, default_value = "local")]
        user: String,
        /// Provider-qualified model id (e.g. "bedrock.anthropic.claude-v2:1").
        #[arg(long)]
        model: String,
        /// Answer from this workspace's documents.
        #[arg(long)]
        workspace: Option<String>,
        /// Generation parameters as a JSON object
        /// (e.g. '{"temperature":0.2,"maxTokens":512}').
        #[arg(long)]
        kwargs: Option<String>,
        /// Print the full response, metadata included, as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print a session's stored turns.
    History {
        #[arg(long, default_value = "cli")]
        session: String,
        #[arg(long, default_value = "local")]
        user: String,
        /// Print the raw turns as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the model catalog and whether an adapter serves each entry.
    Models,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `PARLEY_CONFIG` (or `parley.toml`). A
/// missing file yields the defaults. Returns the path that was used.
pub fn load_config() -> anyhow::Result<(pl_domain::config::Config, String)> {
    let config_path = std::env::var("PARLEY_CONFIG").unwrap_or_else(|_| "parley.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        pl_domain::config::Config::default()
    };

    Ok((config, config_path))
}
