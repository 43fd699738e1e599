//! Process-wide `tracing` setup.
//!
//! Every line goes to stdout and, when a log directory is configured, is also
//! appended to `<log_dir>/evo-hub.log`. `RUST_LOG` wins when set; otherwise
//! `--debug` selects `debug`, then `EVO_LOG_LEVEL`, then `info`.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

pub const LOG_FILE_NAME: &str = "evo-hub.log";

type SharedFile = Arc<Mutex<File>>;

/// Keeps the log file open for the life of the process.
pub struct LogGuard {
    file: Option<SharedFile>,
}

impl LogGuard {
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

pub fn init(debug: bool, log_dir: &str) -> Option<LogGuard> {
    let level = match (debug, crate::env_value("EVO_LOG_LEVEL")) {
        (true, _) => "debug".to_string(),
        (false, Some(level)) => level,
        (false, None) => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let guard = open_log_file(log_dir).unwrap_or_else(|err| {
        eprintln!("log_file_error: {err}");
        LogGuard { file: None }
    });
    let file = guard.file.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(BoxMakeWriter::new(move || TeeWriter {
            stdout: io::stdout(),
            file: file.clone(),
        }))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok()?;
    Some(guard)
}

/// A blank directory disables file output. A directory that cannot be
/// created also falls back to stdout only.
pub fn open_log_file(log_dir: &str) -> io::Result<LogGuard> {
    let dir = Path::new(log_dir.trim());
    if dir.as_os_str().is_empty() || std::fs::create_dir_all(dir).is_err() {
        return Ok(LogGuard { file: None });
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    Ok(LogGuard {
        file: Some(Arc::new(Mutex::new(file))),
    })
}

struct TeeWriter {
    stdout: io::Stdout,
    file: Option<SharedFile>,
}

impl TeeWriter {
    fn with_file(&self, op: impl FnOnce(&mut File) -> io::Result<()>) {
        if let Some(Ok(mut file)) = self.file.as_ref().map(|file| file.lock()) {
            let _ = op(&mut file);
        }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = self.stdout.write_all(buf);
        self.with_file(|file| file.write_all(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.stdout.flush();
        self.with_file(|file| file.flush());
        Ok(())
    }
}
