use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(about = "AI-assisted screening interviews", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: <config dir>/screener/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the interview server (default)
    Serve(ServeCliArgs),
    /// Print version information
    Version,
    /// Print the resolved configuration
    Config,
}

#[derive(ClapArgs, Debug, Default)]
pub struct ServeCliArgs {
    /// Address to bind, overrides the config file
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

impl ServeCliArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

pub fn handle_config_command(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    println!("# {}", path.display());
    println!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    Ok(())
}
