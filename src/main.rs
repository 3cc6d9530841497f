use anyhow::Result;
use clap::Parser;
use screener::{
    app,
    cli::{handle_config_command, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Loads GOOGLE_API_KEY and friends from a local .env when present.
    dotenvy::dotenv().ok();

    let mut config = match &cli.command {
        Some(CliCommand::Version) => {
            println!("Screener {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Config) => {
            handle_config_command(&cli)?;
            return Ok(());
        }
        Some(CliCommand::Serve(_)) | None => cli.load_config()?,
    };

    if let Some(CliCommand::Serve(args)) = &cli.command {
        args.apply(&mut config);
    }

    app::run_service(config).await
}
