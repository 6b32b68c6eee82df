use alertwire::Config;
use alertwire::cli::Cli;
use alertwire::observability::{create_observer, init_tracing};
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.observability)?;

    let observer = create_observer(&config.observability);
    alertwire::app::dispatch(cli, config, observer).await
}
