//! Logger initialization for the daemon and for tests.
//!
//! The log level expression accepted by [`init_logger`] follows the
//! `RUST_LOG` convention: a comma-separated list of `target=level` pairs
//! where a bare `level` sets the root level, e.g.
//! `info,chainstore_history=trace`.

mod appender;
mod consts;
mod logger;

use consts::{CONSOLE_APPENDER, DEFAULT_LOGGER_ENV, ERR_FILE_APPENDER, ERR_LOG_FILE_NAME, FILE_APPENDER, LOG_FILE_NAME};
use log::LevelFilter;
use log4rs::config::{Config, Root};
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global logger. `log_dir = None` logs to console only,
/// otherwise rolling log files are written alongside the console output.
///
/// Panics if a global logger was already installed.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    let mut specs = logger::Builder::new();
    specs.parse_env(DEFAULT_LOGGER_ENV);
    specs.parse_expression(filters);
    let loggers = specs.build();

    let mut appenders = vec![appender::console(CONSOLE_APPENDER)];
    let mut appender_names = vec![CONSOLE_APPENDER];
    if let Some(log_dir) = log_dir {
        appenders.push(appender::roller(FILE_APPENDER, None, log_dir, LOG_FILE_NAME));
        appenders.push(appender::roller(ERR_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME));
        appender_names.extend([FILE_APPENDER, ERR_FILE_APPENDER]);
    }

    let config = Config::builder()
        .appenders(appenders)
        .loggers(loggers.items())
        .build(Root::builder().appenders(appender_names).build(loggers.root_level()))
        .expect("logger config is statically valid");

    log4rs::init_config(config).expect("the logger is initialized at most once");
    LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
}

/// Console-only logger initialization that tolerates repeated calls.
/// Intended for tests, where multiple cases race to install the logger.
pub fn try_init_logger(filters: &str) {
    if !LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
        init_logger(None, filters);
    }
}
