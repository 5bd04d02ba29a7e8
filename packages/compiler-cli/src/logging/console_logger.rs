//! A [`Logger`] that writes to stderr/stdout, used by the `cadlc` binary.

use super::logger::{LogLevel, Logger};

pub struct ConsoleLogger {
    level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Logger for ConsoleLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn debug(&self, msg: &str) {
        if self.is_enabled(LogLevel::Debug) {
            eprintln!("[debug] {msg}");
        }
    }

    fn info(&self, msg: &str) {
        if self.is_enabled(LogLevel::Info) {
            println!("{msg}");
        }
    }

    fn warn(&self, msg: &str) {
        if self.is_enabled(LogLevel::Warn) {
            eprintln!("warning: {msg}");
        }
    }

    fn error(&self, msg: &str) {
        if self.is_enabled(LogLevel::Error) {
            eprintln!("error: {msg}");
        }
    }
}
