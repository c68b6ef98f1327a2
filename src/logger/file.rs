//! File logging with daily-named files, `latest.log` symlink, and retention
//! cleanup.

use chrono::Local;
use once_cell::sync::OnceCell;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

const LOG_RETENTION_HOURS: u64 = 24 * 7;
const MAX_LOG_FILES: usize = 7;
const FILE_BUFFER_SIZE: usize = 4 * 1024;
const CLEANUP_INTERVAL_WRITES: u64 = 1000;

struct FileLogger {
    file_writer: BufWriter<File>,
    log_dir: PathBuf,
    write_counter: u64,
}

impl FileLogger {
    fn new(log_dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let now = Local::now();
        let timestamp = now.format("%Y-%m-%d_%H-%M-%S").to_string();
        let log_file_path = log_dir.join(format!("paperwatch_{}.log", timestamp));

        let file = OpenOptions::new().create(true).append(true).open(&log_file_path)?;
        let file_writer = BufWriter::with_capacity(FILE_BUFFER_SIZE, file);

        let latest_link = log_dir.join("latest.log");
        let _ = fs::remove_file(&latest_link);
        #[cfg(unix)]
        {
            let _ = std::os::unix::fs::symlink(&log_file_path, &latest_link);
        }

        Ok(FileLogger { file_writer, log_dir, write_counter: 0 })
    }

    fn write_line(&mut self, message: &str) -> std::io::Result<()> {
        writeln!(self.file_writer, "{}", message)?;
        self.write_counter += 1;
        self.file_writer.flush()?;

        if self.write_counter % CLEANUP_INTERVAL_WRITES == 0 {
            let log_dir = self.log_dir.clone();
            tokio::spawn(async move {
                let _ = tokio::task::spawn_blocking(move || cleanup_old_logs(&log_dir)).await;
            });
        }
        Ok(())
    }
}

fn cleanup_old_logs(log_dir: &std::path::Path) {
    let now = Local::now();
    let cutoff = now - chrono::Duration::hours(LOG_RETENTION_HOURS as i64);

    let Ok(entries) = fs::read_dir(log_dir) else { return };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with("paperwatch_") && name.ends_with(".log")
        })
        .collect();

    log_files.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).unwrap_or(std::time::SystemTime::UNIX_EPOCH));

    for entry in &log_files {
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            if chrono::DateTime::<Local>::from(modified) < cutoff {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    let remaining: Vec<_> = log_files.iter().filter(|e| e.path().exists()).collect();
    if remaining.len() > MAX_LOG_FILES {
        for entry in remaining.iter().take(remaining.len() - MAX_LOG_FILES) {
            let _ = fs::remove_file(entry.path());
        }
    }
}

static FILE_LOGGER: OnceCell<Mutex<Option<FileLogger>>> = OnceCell::new();

/// Must be called once, before any `write_to_file` call, with the directory
/// from `LoggingConfig::log_dir`.
pub fn init_file_logging(log_dir: &str) {
    let logger = match FileLogger::new(PathBuf::from(log_dir)) {
        Ok(logger) => Some(logger),
        Err(e) => {
            eprintln!("failed to initialize file logger at {}: {}", log_dir, e);
            None
        }
    };
    let _ = FILE_LOGGER.set(Mutex::new(logger));
}

pub fn flush_file_logging() {
    if let Some(cell) = FILE_LOGGER.get() {
        if let Ok(mut guard) = cell.lock() {
            if let Some(logger) = guard.as_mut() {
                let _ = logger.file_writer.flush();
            }
        }
    }
}

pub fn write_to_file(message: &str) {
    let Some(cell) = FILE_LOGGER.get() else { return };
    if let Ok(mut guard) = cell.lock() {
        if let Some(logger) = guard.as_mut() {
            let clean = strip_ansi_codes(message);
            let _ = logger.write_line(&clean);
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;
    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}
