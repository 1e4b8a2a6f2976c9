//! `cardmgr`: command-line front end over the `cardmgr-session` facade.

mod cli;
mod commands;
mod display;
mod exit;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();
}

fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = commands::run(cli) {
        eprintln!("{}", display::error(&error.to_string()));
        std::process::exit(error.exit_code());
    }
}
