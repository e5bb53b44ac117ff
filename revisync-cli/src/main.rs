//! revisync
//!
//! Sync schemas and rows between branches of revisioned projects.
//!
//! # Commands
//!
//! - `migrate apply` / `migrate save` - replay or save migration histories
//! - `rows upload` / `rows save` - move rows between a folder and a project
//! - `sync schema` / `sync data` - copy from one project to another

mod api;
mod cli;
mod config;
mod sync;

use clap::Parser;
use colored::*;

use cli::Cli;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,revisync={}", level)),
    )
    .format_timestamp(None)
    .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = cli::run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}
