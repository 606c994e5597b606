//! parkmon library root.
//! Exposes the CLI parser, the high-level run() function and the internal
//! modules: sensor loop, slot table, record store and command surface.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod hw;
pub mod models;
pub mod net;
pub mod sensor;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use std::path::Path;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Serve { .. } => cli::commands::serve::handle(&cli.command, cfg),
        Commands::Export { .. } => cli::commands::export::handle(&cli.command, cfg),
        Commands::Status
        | Commands::Slot { .. }
        | Commands::Checkin { .. }
        | Commands::Checkout { .. }
        | Commands::History { .. } => cli::commands::query::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // config is loaded once; command-line overrides win
    let mut cfg = Config::load(cli.config.as_deref().map(Path::new))?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    if let Some(addr) = &cli.addr {
        cfg.listen = addr.clone();
    }

    dispatch(&cli, &cfg)
}
