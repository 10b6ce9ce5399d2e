//! Regmaid CLI - enforce tag retention policies on container registries.

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.global.verbose {
        "regmaid=debug"
    } else {
        "regmaid=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.selected() {
        Commands::Clean => {
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());
            commands::clean::execute(&cli.global, cancel).await
        }
        Commands::Version => {
            println!("regmaid {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });
}
