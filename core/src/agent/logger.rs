//! Process-wide debug log
//!
//! Keeps the most recent entries in memory (for the `/logs` command) and
//! optionally appends every entry to a file. Use the `debug_log!`,
//! `info_log!` and `error_log!` macros rather than calling [`log`] directly.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const DEFAULT_CAPACITY: usize = 1000;

pub struct LogEntry {
    pub timestamp: String,
    pub level: &'static str,
    pub module: String,
    pub message: String,
}

impl LogEntry {
    fn render(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp, self.level, self.module, self.message
        )
    }
}

pub struct DebugLogger {
    ring_buffer: VecDeque<LogEntry>,
    max_entries: usize,
    file_path: Option<PathBuf>,
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new(DEFAULT_CAPACITY)))
}

impl DebugLogger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            ring_buffer: VecDeque::with_capacity(max_entries),
            max_entries: max_entries.max(1),
            file_path: None,
        }
    }

    pub fn set_file_path(&mut self, path: PathBuf) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        self.file_path = Some(path);
    }

    pub fn log(&mut self, level: &'static str, module: &str, message: String) {
        let entry = LogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level,
            module: module.to_string(),
            message,
        };

        // File output is best effort; the ring buffer always gets the entry
        if let Some(path) = &self.file_path {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", entry.render());
            }
        }

        if self.ring_buffer.len() >= self.max_entries {
            self.ring_buffer.pop_front();
        }
        self.ring_buffer.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        self.ring_buffer
            .iter()
            .rev()
            .take(n)
            .map(LogEntry::render)
            .collect()
    }
}

/// Route log output to `<dir>/debug.log` in addition to the ring buffer.
pub fn init(dir: &Path) {
    logger().lock().set_file_path(dir.join("debug.log"));
}

pub fn log(level: &'static str, module: &str, message: impl Into<String>) {
    logger().lock().log(level, module, message.into());
}

pub fn get_recent_logs(n: usize) -> Vec<String> {
    logger().lock().recent(n)
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("DEBUG", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("INFO", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("ERROR", module_path!(), format!($($arg)*))
    };
}
