use crate::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Command-line interface definition for parkmon
/// Parking slot monitor: ultrasonic sensors, occupancy table and a SQLite ledger
#[derive(Parser)]
#[command(
    name = "parkmon",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parking slot monitor: sensor loop, occupancy state and check-in/check-out ledger",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Read configuration from this file instead of ~/.parkmon/parkmon.conf
    #[arg(global = true, long = "config", value_name = "FILE")]
    pub config: Option<String>,

    /// Daemon address for client commands (overrides `listen`)
    #[arg(global = true, long = "addr", value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show the configuration
    Config {
        #[arg(long = "print", help = "Print the effective configuration")]
        print_config: bool,
    },

    /// Manage the database (migrations, integrity checks, info)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity and ledger invariants")]
        check: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Run the sensor loop and the command server
    Serve {
        #[arg(long = "simulate", help = "Use simulated sensor lines instead of GPIO")]
        simulate: bool,
    },

    /// Overall occupancy of every slot
    Status,

    /// State of a single slot
    Slot {
        /// Slot number
        slot_id: u32,
    },

    /// Register a vehicle on a slot
    Checkin {
        /// Slot number
        slot_id: u32,

        /// Vehicle registration
        vehicle_id: String,
    },

    /// Close the active record of a slot
    Checkout {
        /// Slot number
        slot_id: u32,
    },

    /// Most recent check-ins, newest first
    History {
        #[arg(long, short = 'l', help = "Maximum number of records (default from config)")]
        limit: Option<usize>,
    },

    /// Export the whole ledger
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        output: String,

        #[arg(long, short = 'f')]
        force: bool,
    },
}
