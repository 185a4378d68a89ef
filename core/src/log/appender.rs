use super::consts::{
    LOG_ARCHIVE_SUFFIX, LOG_FILE_BASE_ROLLS, LOG_FILE_MAX_ROLLS, LOG_FILE_MAX_SIZE, LOG_LINE_PATTERN, LOG_LINE_PATTERN_COLORED,
};
use log::LevelFilter;
use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::Appender,
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use std::path::PathBuf;

/// Colored console appender
pub(super) fn console(name: &'static str) -> Appender {
    let append = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN_COLORED))).build();
    Appender::builder().build(name, Box::new(append))
}

/// Size-rolling file appender. An optional threshold restricts the appender
/// to records at `level` or above (used for the dedicated error log file).
pub(super) fn roller(name: &'static str, level: Option<LevelFilter>, log_dir: &str, file_name: &str) -> Appender {
    let file_path = PathBuf::from(log_dir).join(file_name);
    let roller_pattern = PathBuf::from(log_dir).join(format!("{}{}", file_name, LOG_ARCHIVE_SUFFIX));
    let roller = FixedWindowRoller::builder()
        .base(LOG_FILE_BASE_ROLLS)
        .build(roller_pattern.to_str().unwrap(), LOG_FILE_MAX_ROLLS)
        .expect("the roll pattern is statically valid");
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
    let append = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(file_path, Box::new(policy))
        .expect("the log dir was validated by the caller");

    let mut builder = Appender::builder();
    if let Some(level) = level {
        builder = builder.filter(Box::new(ThresholdFilter::new(level)));
    }
    builder.build(name, Box::new(append))
}
