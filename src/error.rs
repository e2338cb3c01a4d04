use std::io;

use thiserror::Error;

/// Errors surfaced by the alarm library
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("no such local time {0} (skipped by a clock change)")]
    NonexistentLocalTime(chrono::NaiveDateTime),

    #[error("logging already initialised")]
    Logger(#[from] log::SetLoggerError),

    #[error("invalid {name} {value}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("audio unavailable: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, AlarmError>;
