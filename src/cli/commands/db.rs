use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::integrity;
use crate::db::migrate::{run_pending_migrations, schema_current};
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::{AppError, AppResult};
use crate::utils::colors::{CYAN, GREEN, RED, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        info,
    } = cmd
    {
        let pool = DbPool::new(&cfg.database)?;

        //
        // 1) MIGRATE
        //
        if *migrate {
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            run_pending_migrations(&pool.conn)?;
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        } else if !schema_current(&pool.conn)? {
            // info and check read the current layout
            run_pending_migrations(&pool.conn)?;
        }

        //
        // 2) INFO
        //
        if *info {
            stats::print_db_info(&pool, &cfg.database)?;
        }

        //
        // 3) CHECK
        //
        if *check {
            println!("{}▶ Running integrity check…{}", CYAN, RESET);

            let report = integrity::check(&pool.conn)?;
            if report.is_ok() {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                if report.sqlite != "ok" {
                    println!("{}✘ SQLite:{} {}", RED, RESET, report.sqlite);
                }
                for problem in &report.problems {
                    println!("{}✘ Ledger:{} {}", RED, RESET, problem);
                }
                return Err(AppError::Migration("integrity check failed".into()));
            }
        }
    }

    Ok(())
}
