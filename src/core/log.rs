use crate::db::log::{LogEntry, load_log};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;

const OP_TARGET_MAX: usize = 40;

/// Colour used for an operation keyword.
fn color_for_operation(op: &str) -> Colour {
    match op {
        "checkin" => Colour::Green,
        "checkout" => Colour::Red,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51), // orange
        _ => Colour::White,
    }
}

/// `operation (target)`, truncated to `max` visible characters.
fn op_target_label(entry: &LogEntry, max: usize) -> String {
    let label = if entry.target.is_empty() {
        entry.operation.clone()
    } else {
        format!("{} ({})", entry.operation, entry.target)
    };

    if label.chars().count() > max {
        let mut s: String = label.chars().take(max.saturating_sub(3)).collect();
        s.push_str("...");
        s
    } else {
        label
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(pool: &DbPool) -> AppResult<()> {
        let entries = load_log(&pool.conn)?;

        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let labels: Vec<String> = entries
            .iter()
            .map(|e| op_target_label(e, OP_TARGET_MAX))
            .collect();
        let op_w = labels.iter().map(|l| l.chars().count()).max().unwrap_or(10);
        let id_w = entries
            .iter()
            .map(|e| e.id.to_string().len())
            .max()
            .unwrap_or(1);
        let date_w = entries.iter().map(|e| e.date.len()).max().unwrap_or(10);

        println!("📜 Internal log:\n");

        for (entry, label) in entries.iter().zip(labels) {
            let color = color_for_operation(&entry.operation);

            // only the operation word is coloured
            let (op, rest) = match label.split_once(' ') {
                Some((op, rest)) => (op.to_string(), format!(" {}", rest)),
                None => (label.clone(), String::new()),
            };
            let padding = " ".repeat(op_w.saturating_sub(label.chars().count()));

            println!(
                "{:>id_w$}: {:<date_w$} | {}{}{} => {}",
                entry.id,
                entry.date,
                color.paint(op),
                rest,
                padding,
                entry.message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}
