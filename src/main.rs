use clap::Parser as _;
use tracing::debug;

use treecrawl::application::data::LogLevel;
use treecrawl::application::{Application, ApplicationError};
use treecrawl::cli::Cli;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(cli_args.log_level);
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await
}

/// Logs go to stderr; stdout carries snapshot YAML and rendered trees.
fn setup_tracing(log_level: LogLevel) {
    if let Some(level) = log_level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .compact()
            .init();
    }
}
