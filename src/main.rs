use anyhow::Result;
use clap::Parser;
use fruit_classifier::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fruit_classifier=info".parse()?))
        .init();

    Cli::parse().run()
}
