use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "tilt-o-clock";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("tilt-o-clock.json"))
    }

    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
                .join("tilt-o-clock.log")
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("tilt-o-clock.log"))
                .unwrap_or_else(|| PathBuf::from("tilt-o-clock.log"))
        }
    }
}
