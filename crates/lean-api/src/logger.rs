//! Logging for `lean-api` runs.
//!
//! Warnings go to stderr unless `-v` or `RUST_LOG` asks for more. Every run also leaves a debug
//! log in `<tmp>/lean-api.log`; request lines and two-factor progress end up there, cookie and
//! code values never do. The file is only mentioned to the user when the run fails.
use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
};

use log::{info, LevelFilter, Log, Metadata, Record};

/// Forwards every record to all loggers that accept it.
struct Tee {
    loggers: Vec<env_logger::Logger>,
}

impl Log for Tee {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.loggers.iter().any(|logger| logger.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        for logger in &self.loggers {
            if logger.enabled(record.metadata()) {
                logger.log(record);
            }
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

/// Points the user to the full log unless disarmed by a successful run.
pub struct Guard {
    file: Option<PathBuf>,
}

impl Guard {
    pub fn disarm(&mut self) {
        if let Some(file) = self.file.take() {
            info!("Full log stored in {file:?}");
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(file) = self.file.as_ref() {
            eprintln!("Full log stored in {file:?}");
        }
    }
}

fn file_path() -> Option<PathBuf> {
    let current_exe = env::current_exe().ok()?;
    let name = current_exe.file_stem()?.to_str()?;
    Some(env::temp_dir().join(name).with_extension("log"))
}

// Debug rather than trace; the HTTP stack logs headers, cookies included, at trace.
fn file_logger(path: &Path) -> Option<env_logger::Logger> {
    let target = env_logger::Target::Pipe(Box::new(File::create(path).ok()?));
    Some(
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .target(target)
            .build(),
    )
}

fn stderr_logger(verbosity: u8) -> env_logger::Logger {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .build()
}

/// Log to stderr and, if possible, everything down to debug to a file in the temp dir.
pub fn init(verbosity: u8) -> Guard {
    let mut loggers = vec![stderr_logger(verbosity)];
    let mut file = None;
    if let Some(path) = file_path() {
        if let Some(logger) = file_logger(&path) {
            loggers.push(logger);
            file = Some(path);
        }
    }

    let max_level = loggers
        .iter()
        .map(|logger| logger.filter())
        .max()
        .unwrap_or(LevelFilter::Warn);
    if log::set_boxed_logger(Box::new(Tee { loggers })).is_ok() {
        log::set_max_level(max_level);
    }

    Guard { file }
}
