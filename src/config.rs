use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    app_dirs::AppDirs,
    dismissal::Tuning,
    error::{AlarmError, Result},
    hit_test::DEFAULT_OVERLAP_FACTOR,
    motion::DEFAULT_GAIN,
    sound::SoundKind,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Cursor pixels per unit of angular rate
    pub gain: f64,
    pub overlap_factor: f64,
    pub cursor_diameter: f64,
    pub target_diameter: f64,
    /// Used when the terminal does not report its pixel size
    pub cell_width_px: u16,
    pub cell_height_px: u16,
    /// Angular rate sent per arrow key press
    pub keyboard_rate: f64,
    pub sound: SoundKind,
    /// Looped instead of the synthesized tone when playing through the audio device
    pub sound_file: Option<PathBuf>,
    pub bell_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            overlap_factor: DEFAULT_OVERLAP_FACTOR,
            cursor_diameter: 100.0,
            target_diameter: 150.0,
            cell_width_px: 10,
            cell_height_px: 20,
            keyboard_rate: 1.0,
            sound: SoundKind::Bell,
            sound_file: None,
            bell_interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn tuning(&self) -> Tuning {
        Tuning {
            gain: self.gain,
            overlap_factor: self.overlap_factor,
        }
    }

    pub fn bell_interval(&self) -> Duration {
        Duration::from_millis(self.bell_interval_ms)
    }

    /// Gain, overlap factor and keyboard rate must be finite and positive,
    /// diameters finite and not negative.
    pub fn validate(&self) -> Result<()> {
        positive("gain", self.gain)?;
        positive("overlap_factor", self.overlap_factor)?;
        positive("keyboard_rate", self.keyboard_rate)?;
        not_negative("cursor_diameter", self.cursor_diameter)?;
        not_negative("target_diameter", self.target_diameter)?;
        Ok(())
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlarmError::InvalidSetting {
            name,
            value,
            reason: "must be a finite number",
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if finite(name, value)? > 0.0 {
        Ok(())
    } else {
        Err(AlarmError::InvalidSetting {
            name,
            value,
            reason: "must be greater than zero",
        })
    }
}

fn not_negative(name: &'static str, value: f64) -> Result<()> {
    if finite(name, value)? >= 0.0 {
        Ok(())
    } else {
        Err(AlarmError::InvalidSetting {
            name,
            value,
            reason: "must not be negative",
        })
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing file means defaults; an unreadable or out-of-range one is logged and also means defaults
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        let parsed = serde_json::from_slice::<Config>(&bytes)
            .map_err(AlarmError::from)
            .and_then(|cfg| cfg.validate().map(|_| cfg));
        match parsed {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring invalid config {}: {}", self.path.display(), e);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
