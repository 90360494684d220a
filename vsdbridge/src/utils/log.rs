// SPDX-License-Identifier: MIT

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

impl LogLevel {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => LogLevel::Quiet,
            (false, 0) => LogLevel::Normal,
            _ => LogLevel::Verbose,
        }
    }

    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::Warn,
            LogLevel::Normal => LevelFilter::Info,
            LogLevel::Verbose => LevelFilter::Trace,
        }
    }
}

struct BridgeLogger;

static LOGGER: BridgeLogger = BridgeLogger;

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow(),
            Level::Info => "INFO ".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".dimmed(),
        };
        if record.level() >= Level::Debug {
            eprintln!(
                "[vsdbridge] {level} {}: {}",
                record.target().dimmed(),
                record.args()
            );
        } else {
            eprintln!("[vsdbridge] {level} {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the stderr logger. Only the first call takes effect.
pub fn init(level: LogLevel) -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("logger: {e}"))?;
    log::set_max_level(level.filter());
    Ok(())
}
