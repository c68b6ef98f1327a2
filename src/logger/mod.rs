//! Structured logging facade.
//!
//! ```rust,ignore
//! logger::error(LogTag::Chain, "explorer request failed");
//! logger::info(LogTag::Trading, "opened paper position");
//! logger::debug(LogTag::Scheduler, "rotated to slice 2/4");
//! ```
//!
//! Call `logger::init` once in `main`, after `Config::from_env`, before any
//! other component starts logging.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

pub fn init(level: &str, log_dir: &str) {
    config::init_from_level(level);
    file::init_file_logging(log_dir);
}

pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

pub fn flush() {
    file::flush_file_logging();
}
