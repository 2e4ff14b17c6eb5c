//! DocShelf Daemon
//!
//! Read-only HTTP service for a documents directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use daemon::config::{default_config_path, Config};
use daemon::{logging, server};
use protocol::TreeNode;

/// DocShelf Daemon - serve a documents directory over HTTP.
#[derive(Parser, Debug)]
#[command(name = "docshelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listen address, e.g. 127.0.0.1:5080
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Documents directory to serve
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Print the top-level document listing
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the document tree as JSON
    Tree,

    /// Show the effective configuration
    Config {
        /// Write the configuration file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;

    // Environment overrides the file, flags override both
    config.apply_env_overrides();
    if let Commands::Serve { bind, root } = &cli.command {
        if let Some(bind) = bind {
            config.server.bind_addr = bind.clone();
        }
        if let Some(root) = root {
            config.documents.path = root.clone();
        }
    }

    config.validate()?;

    let level = logging::effective_level(cli.verbose, &config.logging.log_level);
    let _log_guard = logging::init(&level, config.logging.log_dir.as_deref())?;
    tracing::debug!("Using config file: {:?}", config_path);

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("DocShelf daemon starting...");
            server::serve(&config).await?;
        }
        Commands::List { json } => {
            let documents = server::open_documents(&config)?;
            let entries = documents.list();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No documents in {}", documents.root().display());
            } else {
                for entry in &entries {
                    println!(
                        "{:<40} {:>12}  {}",
                        entry.name,
                        entry.size,
                        entry.last_modified.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
        Commands::Tree => {
            let documents = server::open_documents(&config)?;
            let tree: TreeNode = documents.tree();
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Commands::Config { init } => {
            if init {
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                } else {
                    Config::default()
                        .save(&config_path)
                        .context("Failed to write default configuration")?;
                    println!("Wrote default config to {}", config_path.display());
                }
            } else {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::try_parse_from([
            "docshelf",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--root",
            "/srv/docs",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve { bind, root } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:8080"));
                assert_eq!(root, Some(PathBuf::from("/srv/docs")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from(["docshelf", "list", "--json", "-v", "-c", "/tmp/c.toml"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::List { json: true }));
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["docshelf", "config", "--init"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { init: true }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["docshelf"]).is_err());
    }
}
