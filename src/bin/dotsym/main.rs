mod app;
mod commands;
mod output;

use clap::Parser;
use dotsym::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::app::{Cli, Command, GlobalOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelled.");
            trigger.cancel();
        }
    });

    match &cli.command {
        Command::Info { path } => commands::info::run(path, &cli.global),
        Command::Resolve { path, offline } => {
            commands::resolve::run(path, !*offline, &cli.global, &cancel).await
        }
        Command::Validate { pdb, image } => commands::validate::run(pdb, image, &cli.global),
        Command::Source {
            source_link,
            document,
        } => commands::source::run(source_link, document, &cli.global, &cancel).await,
    }
}

/// dotsym records go to stderr at info (debug with `--verbose`); `RUST_LOG` overrides.
fn init_logging(opts: &GlobalOptions) {
    let level = if opts.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dotsym={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if opts.log_json {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };

    if let Err(error) = installed {
        eprintln!("failed to initialize logging: {error}");
    }
}
