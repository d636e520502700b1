//! trakt-auth CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use trakt_auth::cli::{AuthCommands, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.load_config() {
        Ok(config) => match &cli.command {
            Commands::Auth(auth_args) => match auth_args.command {
                AuthCommands::Login => trakt_auth::cli::auth::handle_login(&config).await,
                AuthCommands::Token => trakt_auth::cli::auth::handle_token(&config).await,
                AuthCommands::Status => trakt_auth::cli::auth::handle_status(&config).await,
            },
            Commands::Get(args) => trakt_auth::cli::api::handle_get(&config, &args.path).await,
            Commands::Post(args) => {
                trakt_auth::cli::api::handle_post(&config, &args.path, &args.body).await
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
