//! Request/response contract of the command surface.
//!
//! Requests are JSON objects with an `op` field; every response is an
//! [`ApiResponse`] carrying an HTTP-like status code and a JSON body.

pub mod handlers;

pub use handlers::{handle_line, handle_request};

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INTERNAL: u16 = 500;
pub const STATUS_UNAVAILABLE: u16 = 503;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Human readable error text of a failed response.
    pub fn error_message(&self) -> String {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string())
    }
}

impl From<&AppError> for ApiResponse {
    fn from(err: &AppError) -> Self {
        let mut body = json!({
            "error": err.to_string(),
            "kind": error_kind(err),
        });
        if let AppError::VehicleAlreadyParked(slot) = err {
            body["slot_id"] = json!(slot);
        }
        Self {
            status: status_for(err),
            body,
        }
    }
}

pub fn status_for(err: &AppError) -> u16 {
    match err {
        AppError::MissingField(_)
        | AppError::InvalidSlot(_)
        | AppError::Protocol(_)
        | AppError::Json(_) => STATUS_BAD_REQUEST,
        AppError::SlotNotFound(_) | AppError::NoActiveRecord(_) => STATUS_NOT_FOUND,
        AppError::SlotOccupiedConflict(_) | AppError::VehicleAlreadyParked(_) => STATUS_CONFLICT,
        AppError::StoreUnavailable(_) => STATUS_UNAVAILABLE,
        AppError::Rejected { status, .. } => *status,
        _ => STATUS_INTERNAL,
    }
}

/// Stable machine-readable name of an error kind.
pub fn error_kind(err: &AppError) -> &'static str {
    match err {
        AppError::Io(_) => "Io",
        AppError::StoreUnavailable(_) => "StoreUnavailable",
        AppError::Migration(_) => "Migration",
        AppError::MissingField(_) => "MissingField",
        AppError::InvalidSlot(_) => "InvalidSlot",
        AppError::SlotNotFound(_) => "SlotNotFound",
        AppError::SlotOccupiedConflict(_) => "SlotOccupiedConflict",
        AppError::VehicleAlreadyParked(_) => "VehicleAlreadyParked",
        AppError::NoActiveRecord(_) => "NoActiveRecord",
        AppError::Hardware { .. } => "Hardware",
        AppError::Protocol(_) => "Protocol",
        AppError::Rejected { .. } => "Rejected",
        AppError::Json(_) => "Json",
        AppError::Config(_) => "Config",
        AppError::Export(_) => "Export",
    }
}
