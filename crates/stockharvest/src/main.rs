//! stockharvest CLI - harvest stock-photo thumbnails and metadata by keyword.
//!
//! Searches the catalog for every keyword in a file, downloads and crops each
//! matching thumbnail, and writes one metadata row per saved image.
//!
//! # Usage
//!
//! ```bash
//! # Harvest every keyword in keywords.txt into ./out
//! stockharvest run --root-dir ./out --keywords keywords.txt --credentials creds.json
//!
//! # Same, with 16 download workers and JSON Lines output
//! stockharvest run -r ./out -k keywords.txt -c creds.json --workers 16 --format jsonl
//!
//! # View configuration
//! stockharvest config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockharvest_core::Config;

mod cli;
mod logging;

/// stockharvest - harvest stock-photo thumbnails and metadata by keyword.
#[derive(Parser, Debug)]
#[command(name = "stockharvest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "STOCKHARVEST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Search keywords, download thumbnails and write metadata
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Load the config named on the command line, or the default one.
///
/// An explicitly named file must load; a broken default file falls back to
/// defaults with a warning.
fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        let path = Config::expand_path(path);
        return Config::load_from(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()));
    }

    // Logging isn't initialized yet, so config warnings go through eprintln.
    Ok(match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `stockharvest config path`."
            );
            Config::default()
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("stockharvest v{}", stockharvest_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "stockharvest",
            "run",
            "--root-dir",
            "out",
            "--keywords",
            "kw.txt",
            "--credentials",
            "creds.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["stockharvest"]).is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\npage_size = 50\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.page_size, 50);
    }
}
