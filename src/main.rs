//! verdocs - Build versioned documentation sites from git branches and tags.

mod build;
mod cli;
mod config;
mod error;
mod export;
mod inventory;
mod logger;
mod postprocess;
mod renderer;
mod utils;
mod vcs;
mod versions;

use anyhow::{Context, Result, bail};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::{DEFAULT_CONFIG_FILE, SiteConfig};
use renderer::CommandRenderer;
use std::{env, process::ExitCode};
use vcs::GitCli;

fn main() -> ExitCode {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    logger::init(cli.verbose, cli.no_colors);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log!("error"; "{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &'static Cli) -> Result<()> {
    if let Some(dir) = &cli.chdir {
        env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {}", dir.display()))?;
    }

    let mut config = load_config(cli)?;
    let git = GitCli::open(config.get_root(), &config.build.remote)?;
    if config.banner.project.is_none() {
        config.banner.project = git
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }
    let config: &'static SiteConfig = Box::leak(Box::new(config));

    match &cli.command {
        Commands::Build { .. } => {
            let renderer = CommandRenderer::new(config.build.command.clone());
            build_site(config, &git, &renderer).map(|_| ())
        }
    }
}

/// Load and validate configuration from CLI arguments.
///
/// The config file is optional unless given explicitly with `-C`.
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let config_path = cli.config.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

    let mut config = if config_path.exists() {
        let mut config = SiteConfig::from_path(&config_path)?;
        config.config_path = config_path
            .canonicalize()
            .unwrap_or_else(|_| config_path.clone());
        debug!("config"; "loaded {}", config.config_path.display());
        config
    } else if cli.config.is_some() {
        bail!("Config file `{}` not found.", config_path.display());
    } else {
        SiteConfig::default()
    };

    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}
