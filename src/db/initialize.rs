use crate::db::integrity;
use crate::db::migrate::run_pending_migrations;
use crate::errors::AppResult;
use rusqlite::Connection;

/// Initialize the database.
/// Schema comes from the migration engine; the result is then checked
/// against the ledger invariants before anyone writes to it.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    run_pending_migrations(conn)?;
    integrity::ensure_consistent(conn)?;
    Ok(())
}
