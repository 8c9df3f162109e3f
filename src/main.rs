use clap::Parser;
use claudo::app::{handle_fatal_error, init_logging, AppConfig};
use claudo::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::new(cli.verbose) {
        Ok(config) => config.with_debug_from_env(),
        Err(e) => handle_fatal_error(e, cli.verbose),
    };
    init_logging(&config);

    if let Err(e) = execute_command(cli.command, &config).await {
        handle_fatal_error(e, config.verbose);
    }
}
