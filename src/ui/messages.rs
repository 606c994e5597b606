//! Coloured one-line messages for the interactive commands.
//! The daemon logs through `log` instead.

use std::fmt;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

#[derive(Clone, Copy)]
enum Kind {
    Info,
    Success,
    Warning,
    Error,
}

impl Kind {
    fn style(self) -> (&'static str, &'static str) {
        match self {
            Kind::Info => ("\x1b[34m", "ℹ️"),
            Kind::Success => ("\x1b[32m", "✅"),
            Kind::Warning => ("\x1b[33m", "⚠️"),
            Kind::Error => ("\x1b[31m", "❌"),
        }
    }
}

fn emit<T: fmt::Display>(kind: Kind, msg: T) {
    let (colour, icon) = kind.style();
    let line = format!("{colour}{BOLD}{icon} {RESET}{msg}");
    match kind {
        Kind::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

pub fn info<T: fmt::Display>(msg: T) {
    emit(Kind::Info, msg);
}

pub fn success<T: fmt::Display>(msg: T) {
    emit(Kind::Success, msg);
}

pub fn warning<T: fmt::Display>(msg: T) {
    emit(Kind::Warning, msg);
}

/// Goes to stderr.
pub fn error<T: fmt::Display>(msg: T) {
    emit(Kind::Error, msg);
}
