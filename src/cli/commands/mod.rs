//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod detect;
mod platforms;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, Settings};

#[derive(Parser)]
#[command(name = "linkprobe")]
#[command(about = "Detect paid-content profile links behind bio link pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "LINKPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Probe one or more bio link pages
    Detect {
        /// Bio link page URLs (scheme optional)
        #[arg(required = true)]
        urls: Vec<String>,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
        /// Skip the rendering engine phase
        #[arg(long)]
        no_browser: bool,
        /// Pages probed at once (default: server.batch_concurrency)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// Override the target domain
        #[arg(long)]
        domain: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8080 (default: server.bind)
        #[arg(short, long)]
        bind: Option<String>,
        /// Skip the rendering engine phase
        #[arg(long)]
        no_browser: bool,
    },

    /// List the platform interaction profiles
    Platforms,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Detect {
            urls,
            json,
            no_browser,
            concurrency,
            domain,
        } => {
            let mut config = config;
            if let Some(domain) = domain {
                config.target.domain = domain;
                config.target.brand = None;
            }
            let settings = resolve(config, no_browser)?;
            detect::cmd_detect(settings, &urls, json, concurrency, cli.verbose).await
        }
        Commands::Serve { bind, no_browser } => {
            let settings = resolve(config, no_browser)?;
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            serve::cmd_serve(settings, &bind).await
        }
        Commands::Platforms => platforms::cmd_platforms(),
    }
}

fn resolve(mut config: Config, no_browser: bool) -> anyhow::Result<Settings> {
    if no_browser {
        config.browser.enabled = false;
    }
    Ok(config.into_settings()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from([
            "linkprobe",
            "detect",
            "linktr.ee/a",
            "beacons.ai/b",
            "--json",
            "-j",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Detect {
                urls,
                json,
                concurrency,
                no_browser,
                ..
            } => {
                assert_eq!(urls, vec!["linktr.ee/a", "beacons.ai/b"]);
                assert!(json);
                assert!(!no_browser);
                assert_eq!(concurrency, Some(2));
            }
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn test_detect_requires_url() {
        assert!(Cli::try_parse_from(["linkprobe", "detect"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["linkprobe", "serve", "-v", "--bind", "0.0.0.0:9000"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { bind: Some(ref b), .. } if b == "0.0.0.0:9000"));
    }
}
