//! sitepipe CLI - static-site asset pipeline.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Static-site asset pipeline with watch mode and live reload")]
#[command(version)]
pub struct Cli {
    /// Defaults to `watch`
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to sitepipe.toml config file
    #[arg(short, long, default_value = "sitepipe.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a source tree and config in the project directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Clean, then build every asset kind
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Build, then rebuild on change and serve with live reload
    Watch {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Run a single named task (e.g. `css`, `spriteSVG`, `otf2ttf`)
    Run {
        /// Task name
        task: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let root = project_root(&cli.config);

    if let Some(Commands::Init { yes }) = cli.command {
        return commands::init::run(&root, yes).await;
    }

    let mut config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Watch {
        port: None,
        no_open: false,
    }) {
        Commands::Init { .. } => {}
        Commands::Build { output } => {
            if let Some(output) = output {
                config.project.output = output;
            }
            commands::build::run(&config, &root).await?;
        }
        Commands::Watch { port, no_open } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if no_open {
                config.server.open = false;
            }
            commands::watch::run(&config, &root).await?;
        }
        Commands::Run { task } => {
            commands::run::run(&config, &root, &task).await?;
        }
    }

    Ok(())
}

/// Directory containing the config file; patterns are relative to it.
fn project_root(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
