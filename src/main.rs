use anyhow::Result;
use clap::Parser;
use gijiroku::{
    cli::{handle_auth_command, handle_render_command, handle_run_command, Cli, CliCommand},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("gijiroku {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Render(args)) => handle_render_command(args),
        Some(CliCommand::Auth) => {
            let config = Config::load(cli.config.as_deref())?;
            handle_auth_command(config).await
        }
        Some(CliCommand::Run) | None => {
            let config = Config::load(cli.config.as_deref())?;
            handle_run_command(config).await
        }
    }
}
