//! Unified application error type.
//! All modules (db, sensor, api, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Record store
    // ---------------------------
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Request validation
    // ---------------------------
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid slot ID: {0}")]
    InvalidSlot(String),

    #[error("Slot {0} not found")]
    SlotNotFound(u32),

    // ---------------------------
    // Ledger conflicts
    // ---------------------------
    #[error("Slot {0} is already occupied")]
    SlotOccupiedConflict(u32),

    #[error("Vehicle already checked in at slot {0}")]
    VehicleAlreadyParked(u32),

    #[error("No active parking record found for slot {0}")]
    NoActiveRecord(u32),

    // ---------------------------
    // Hardware
    // ---------------------------
    #[error("Hardware line error on pin {pin}: {message}")]
    Hardware { pin: u8, message: String },

    // ---------------------------
    // Command transport
    // ---------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export error: {0}")]
    Export(String),
}

pub type AppResult<T> = Result<T, AppError>;
