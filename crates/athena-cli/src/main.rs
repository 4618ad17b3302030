//! Athena CLI entry point.

use athena_cli::{commands, Cli};
use athena_llm::{create_provider, provider_from_config, ProviderConfig, DEFAULT_EMBEDDING_DIM};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let loaded = athena_core::config::load_env();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(files = ?loaded, "Loaded environment files");

    let provider = if cli.offline {
        provider_from_config(&ProviderConfig::HashBased {
            dimension: DEFAULT_EMBEDDING_DIM,
        })
    } else {
        create_provider()
    };
    debug!(provider = provider.name(), "Using provider");

    match commands::execute(cli.command, provider).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
