//! Run logging
//!
//! Each run writes one log file under `<output_dir>/logs`, named after the
//! program and the start time. Lines look like
//! `01/05 14:03:22.417 (pipeline.rs:38) DEBUG: Loaded 3 stat file(s)`.

use crate::error::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOG_PREFIX: &str = "lead_by_date";

/// Where log records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// `<log_dir>/lead_by_date_runon<YYYYmmddHHMMSS>.log`
    File(PathBuf),
    Stderr,
}

/// Log file name for a run started at `started`
pub fn log_file_name(started: chrono::DateTime<chrono::Local>) -> String {
    format!("{}_runon{}.log", LOG_PREFIX, started.format("%Y%m%d%H%M%S"))
}

fn format_record(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let file = record
        .file()
        .and_then(|f| Path::new(f).file_name())
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.target().to_string());
    writeln!(
        buf,
        "{} ({}:{}) {}: {}",
        chrono::Local::now().format("%m/%d %H:%M:%S%.3f"),
        file,
        record.line().unwrap_or(0),
        record.level(),
        record.args()
    )
}

/// Install the global logger
///
/// Defaults to `debug`; `RUST_LOG` overrides the filter. Returns the log
/// file path when logging to a file.
pub fn init(log_dir: &Path, to_stderr: bool) -> Result<LogTarget> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug"),
    );
    builder.format(format_record);

    let target = if to_stderr {
        builder.target(env_logger::Target::Stderr);
        LogTarget::Stderr
    } else {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(log_file_name(chrono::Local::now()));
        let file = File::create(&path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        LogTarget::File(path)
    };

    // A second init in the same process keeps the first logger
    if builder.try_init().is_err() {
        log::debug!("Logger already installed");
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let started = chrono::Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 1)
            .single()
            .unwrap();
        assert_eq!(log_file_name(started), "lead_by_date_runon20240307090501.log");
    }

    #[test]
    fn test_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        match init(&log_dir, false).unwrap() {
            LogTarget::File(path) => {
                assert!(path.starts_with(&log_dir));
                assert!(path.exists());
            }
            LogTarget::Stderr => panic!("expected a log file"),
        }
    }
}
