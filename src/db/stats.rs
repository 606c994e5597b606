use crate::db::pool::DbPool;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: i64,
    pub active: i64,
    pub first_check_in: Option<String>,
    pub last_check_in: Option<String>,
}

pub fn ledger_stats(pool: &DbPool) -> rusqlite::Result<LedgerStats> {
    let conn = &pool.conn;
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM parking_records", [], |r| r.get(0))?;
    let active: i64 = conn.query_row(
        "SELECT COUNT(*) FROM parking_records WHERE status = 'active'",
        [],
        |r| r.get(0),
    )?;
    let first_check_in: Option<String> = conn
        .query_row(
            "SELECT check_in_time FROM parking_records ORDER BY check_in_time ASC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let last_check_in: Option<String> = conn
        .query_row(
            "SELECT check_in_time FROM parking_records ORDER BY check_in_time DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;

    Ok(LedgerStats {
        total,
        active,
        first_check_in,
        last_check_in,
    })
}

pub fn print_db_info(pool: &DbPool, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_kb = (file_size as f64) / 1024.0;

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.1} KB", CYAN, RESET, file_kb);

    //
    // 2) RECORD COUNTS
    //
    let stats = ledger_stats(pool)?;
    println!(
        "{}• Total records:{} {}{}{}",
        CYAN, RESET, GREEN, stats.total, RESET
    );
    println!(
        "{}• Active records:{} {}{}{}",
        CYAN, RESET, GREEN, stats.active, RESET
    );

    //
    // 3) CHECK-IN RANGE
    //
    let fmt_first = stats
        .first_check_in
        .unwrap_or_else(|| format!("{GREY}--{RESET}"));
    let fmt_last = stats
        .last_check_in
        .unwrap_or_else(|| format!("{GREY}--{RESET}"));

    println!("{}• Check-in range:{}", CYAN, RESET);
    println!("    from: {}", fmt_first);
    println!("    to:   {}", fmt_last);

    println!();
    Ok(())
}
