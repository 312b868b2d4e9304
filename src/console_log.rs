use std::sync::Mutex;
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use log::{LevelFilter, Log, Metadata, Record};

use crate::state::Delta;

/// Routes `log` records into the in-app console instead of stderr, which would tear the
/// alternate screen.
pub struct ConsoleLogger {
    level: LevelFilter,
    sink: Mutex<Sender<Delta>>,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter, sink: Sender<Delta>) -> Self {
        Self {
            level,
            sink: Mutex::new(sink),
        }
    }

    pub fn install(level: LevelFilter, sink: Sender<Delta>) -> Result<()> {
        log::set_boxed_logger(Box::new(Self::new(level, sink)))
            .context("logger already installed")?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);
        if let Ok(sink) = self.sink.lock() {
            let _ = sink.send(Delta::Log(line));
        }
    }

    fn flush(&self) {}
}

fn format_line(record: &Record) -> String {
    format!("[{}] {}", record.level(), record.args())
}
