// src/export/logic.rs

use crate::db::pool::DbPool;
use crate::db::queries::load_all;
use crate::errors::{AppError, AppResult};
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::{ExportFormat, RecordExport};
use crate::ui::messages::warning;
use chrono::Utc;
use std::path::Path;

/// High level export of the parking ledger.
pub struct ExportLogic;

impl ExportLogic {
    /// Writes every record, oldest check-in first, to `file`.
    ///
    /// Returns the number of exported records.
    pub fn export(
        pool: &DbPool,
        format: ExportFormat,
        file: &str,
        force: bool,
    ) -> AppResult<usize> {
        let path = Path::new(file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        ensure_writable(path, force)?;

        let now = Utc::now();
        let rows: Vec<RecordExport> = load_all(&pool.conn)?
            .iter()
            .map(|r| RecordExport::from_record(r, now))
            .collect();

        if rows.is_empty() {
            warning("No parking records to export.");
            return Ok(0);
        }

        match format {
            ExportFormat::Csv => export_csv(&rows, path)?,
            ExportFormat::Json => export_json(&rows, path)?,
        }

        Ok(rows.len())
    }
}
