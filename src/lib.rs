// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod dismissal;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod motion;
pub mod presentation;
pub mod runtime;
pub mod schedule;
pub mod sensor;
pub mod sound;
pub mod target;
pub mod ui;

pub use error::{AlarmError, Result};
