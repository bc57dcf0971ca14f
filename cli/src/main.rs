use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::Cli;
use tikit_client::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tikit_cli=info,tikit_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = config::load(&cli.global)?;
    tracing::debug!(
        api_base_url = %config.api_base_url,
        storage_path = %config.storage_path.display(),
        request_timeout_secs = config.request_timeout.as_secs(),
        service_account = ?config.service_account,
        "Loaded configuration from environment/.env"
    );

    let services = Services::from_config(config)?;
    commands::run(cli.command, &services).await
}
