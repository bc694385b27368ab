use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Mutex, OnceLock},
};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::{PROGRAM_LOG_FILE, PROGRAM_LOG_LEVEL};

/// Dependency targets that only get through at `warn` or above regardless of
/// the configured level. The watcher backends are chatty at debug.
const QUIET_TARGETS: &[&str] = &["notify", "mio", "inotify"];

enum LogTarget {
    Stderr,
    File(Mutex<File>),
}

pub struct Logger {
    level: Level,
    target: LogTarget,
}

impl Logger {
    fn format(record: &Record<'_>) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        let quiet = QUIET_TARGETS
            .iter()
            .any(|prefix| metadata.target().starts_with(prefix));
        let ceiling = if quiet {
            self.level.min(Level::Warn)
        } else {
            self.level
        };
        metadata.level() <= ceiling
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = Self::format(record);
        match &self.target {
            LogTarget::Stderr => eprintln!("{msg}"),
            LogTarget::File(file) => {
                if let Ok(mut file) = file.lock() {
                    // Nowhere left to report a failing log sink.
                    let _ = writeln!(file, "{msg}");
                }
            }
        }
    }

    fn flush(&self) {
        if let LogTarget::File(file) = &self.target
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
    }
}

fn get_level_from_env() -> Level {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .and_then(|filter| filter.to_level())
        .unwrap_or(Level::Warn)
}

fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn get_target_from_env() -> LogTarget {
    std::env::var_os(PROGRAM_LOG_FILE)
        .filter(|p| !p.is_empty())
        .and_then(|p| open_log_file(Path::new(&p)))
        .map(|f| LogTarget::File(Mutex::new(f)))
        .unwrap_or(LogTarget::Stderr)
}

/// Install the process-wide logger. Level comes from `VFSDIR_LOG_LEVEL`
/// (default `warn`); output goes to stderr unless `VFSDIR_LOG_FILE` names a
/// writable file. Only the first call has any effect.
pub fn init() -> Result<(), SetLoggerError> {
    _init(get_level_from_env())
}

pub fn _init(level: Level) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    // log::set_max_level takes the level of the first call, so the logger and
    // the global filter must be installed together exactly once.
    let init_call = LOGGER.get().is_none();

    let logger = LOGGER.get_or_init(|| Logger {
        level,
        target: get_target_from_env(),
    });

    if init_call {
        log::set_logger(logger)?;
        log::set_max_level(level.to_level_filter());
    }

    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
