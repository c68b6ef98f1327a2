//! Central filtering logic shared by every level-specific log function.

use super::config::get_logger_config;
use super::levels::LogLevel;
use super::tags::LogTag;

/// Errors always log; everything else is gated by the configured minimum
/// level.
pub fn should_log(_tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }
    let config = get_logger_config();
    level <= config.min_level
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    super::format::format_and_log(tag, level.as_str(), message);
}
