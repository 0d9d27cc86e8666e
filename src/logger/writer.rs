//! Log writer module
//!
//! Thread-safe log writing to files or stdout/stderr.
//! Log files can be reopened at runtime (e.g. after rotation).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(File),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(p) => Ok(Self::File(open_log_file(p)?)),
            None => Ok(fallback),
        }
    }

    fn write_line(&mut self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                let _ = writeln!(file, "{message}");
            }
        }
    }
}

/// Thread-safe log writer
pub struct LogWriter {
    access_path: Option<String>,
    error_path: Option<String>,
    access: Mutex<LogTarget>,
    error: Mutex<LogTarget>,
}

impl LogWriter {
    fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access_path: access_log_file.map(ToString::to_string),
            error_path: error_log_file.map(ToString::to_string),
            access: Mutex::new(LogTarget::open(access_log_file, LogTarget::Stdout)?),
            error: Mutex::new(LogTarget::open(error_log_file, LogTarget::Stderr)?),
        })
    }

    /// Write to access log
    pub fn write_access(&self, message: &str) {
        self.access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_line(message);
    }

    /// Write to error log
    pub fn write_error(&self, message: &str) {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_line(message);
    }

    /// Close and reopen both log files at their configured paths
    pub fn reopen(&self) -> io::Result<()> {
        let access = LogTarget::open(self.access_path.as_deref(), LogTarget::Stdout)?;
        let error = LogTarget::open(self.error_path.as_deref(), LogTarget::Stderr)?;
        *self.access.lock().unwrap_or_else(PoisonError::into_inner) = access;
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
        Ok(())
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global log writer
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer, if initialized
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
