use super::*;
use log::{Level, Metadata, Record};
use serial_test::serial;

fn stderr_logger(level: Level) -> Logger {
    Logger {
        level,
        target: LogTarget::Stderr,
    }
}

#[test]
#[serial]
fn get_level_from_env_parses_cases() {
    let cases: &[(Option<&str>, Level)] = &[
        (None, Level::Warn),
        (Some("debug"), Level::Debug),
        (Some("DEBUG"), Level::Debug),
        (Some("info"), Level::Info),
        (Some("warn"), Level::Warn),
        (Some("error"), Level::Error),
        (Some("trace"), Level::Trace),
        (Some("garbage"), Level::Warn),
        (Some("off"), Level::Warn),
    ];

    for (value, expected) in cases {
        match value {
            Some(v) => unsafe { std::env::set_var(PROGRAM_LOG_LEVEL, v) },
            None => unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) },
        }

        let lvl = get_level_from_env();
        assert_eq!(
            lvl, *expected,
            "env {:?} should yield level {:?}, got {:?}",
            value, expected, lvl
        );
    }

    unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) };
}

#[test]
fn enabled_respects_level_threshold() {
    let levels = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    for logger_level in levels {
        let logger = stderr_logger(logger_level);

        for record_level in levels {
            let meta = Metadata::builder()
                .level(record_level)
                .target("vfsdir_core::dir")
                .build();

            let expected = record_level <= logger_level;
            assert_eq!(
                logger.enabled(&meta),
                expected,
                "logger level {:?}, record level {:?}",
                logger_level,
                record_level
            );
        }
    }
}

#[test]
fn quiet_targets_are_capped_at_warn() {
    let logger = stderr_logger(Level::Trace);

    let debug_meta = Metadata::builder()
        .level(Level::Debug)
        .target("notify::inotify")
        .build();
    assert!(!logger.enabled(&debug_meta));

    let warn_meta = Metadata::builder()
        .level(Level::Warn)
        .target("notify::inotify")
        .build();
    assert!(logger.enabled(&warn_meta));

    let own_meta = Metadata::builder()
        .level(Level::Debug)
        .target("vfsdir_core::monitor")
        .build();
    assert!(logger.enabled(&own_meta));
}

#[test]
fn file_target_appends_formatted_lines() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("vfsdir.log");
    let file = open_log_file(&path).expect("open log file");

    let logger = Logger {
        level: Level::Info,
        target: LogTarget::File(Mutex::new(file)),
    };

    let args = format_args!("scan finished");
    let record = Record::builder()
        .level(Level::Info)
        .target("vfsdir_core::dir")
        .args(args)
        .build();
    logger.log(&record);

    let args = format_args!("too chatty");
    let record = Record::builder()
        .level(Level::Debug)
        .target("vfsdir_core::dir")
        .args(args)
        .build();
    logger.log(&record);
    logger.flush();

    let contents = std::fs::read_to_string(&path).expect("read log file");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("INFO [vfsdir_core::dir] scan finished"));
}

#[test]
#[serial]
fn target_from_env_falls_back_to_stderr() {
    unsafe { std::env::remove_var(PROGRAM_LOG_FILE) };
    assert!(matches!(get_target_from_env(), LogTarget::Stderr));

    unsafe { std::env::set_var(PROGRAM_LOG_FILE, "/nonexistent-dir/vfsdir.log") };
    assert!(matches!(get_target_from_env(), LogTarget::Stderr));

    unsafe { std::env::remove_var(PROGRAM_LOG_FILE) };
}

#[test]
fn stderr_logger_does_not_panic() {
    let logger = stderr_logger(Level::Info);

    for (lvl, msg) in [(Level::Debug, "debug"), (Level::Error, "error")] {
        let args = format_args!("{msg}");
        let record = Record::builder().level(lvl).target("t").args(args).build();
        logger.log(&record);
    }

    logger.flush();
}
