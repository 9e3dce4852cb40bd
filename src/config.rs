use crate::effects::{RippleParams, TrailParams};
use crate::field::FieldParams;
use crate::perf::{MemoryParams, PerfParams};
use crate::render::RenderParams;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not resolve project directories")]
    NoProjectDirs,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid setting `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Fails with [`ConfigError::Invalid`] unless `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be > 0, got {value}")))
    }
}

/// Fails with [`ConfigError::Invalid`] unless `value` lies in `[lo, hi]`.
pub(crate) fn require_within(
    name: &'static str,
    value: f32,
    lo: f32,
    hi: f32,
) -> Result<(), ConfigError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            name,
            format!("must be within [{lo}, {hi}], got {value}"),
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fps_cap: u32,
    /// Logical units covered by one canvas pixel (braille dot).
    pub units_per_px: f32,
    pub enable_color: bool,
    pub show_hud: bool,
    /// Keep the field down to a handful of particles.
    pub reduced_motion: bool,
    pub seed: Option<u64>,
    pub max_consecutive_faults: u32,
    pub field: FieldParams,
    pub render: RenderParams,
    pub trail: TrailParams,
    pub ripple: RippleParams,
    pub perf: PerfParams,
    pub memory: MemoryParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            units_per_px: 4.0,
            enable_color: true,
            show_hud: false,
            reduced_motion: false,
            seed: None,
            max_consecutive_faults: 30,
            field: FieldParams::default(),
            render: RenderParams::default(),
            trail: TrailParams::default(),
            ripple: RippleParams::default(),
            perf: PerfParams::default(),
            memory: MemoryParams::default(),
        }
    }
}

impl Settings {
    /// Checks the settings the app itself consumes. Each layer validates its
    /// own parameter block when it is brought up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("units_per_px", self.units_per_px)?;
        if self.fps_cap == 0 {
            return Err(ConfigError::invalid("fps_cap", "must be > 0"));
        }
        if self.max_consecutive_faults == 0 {
            return Err(ConfigError::invalid("max_consecutive_faults", "must be > 0"));
        }
        Ok(())
    }

    /// Frame rate actually used by the loop.
    pub fn effective_fps(&self) -> u32 {
        self.fps_cap.clamp(10, 240)
    }
}

pub struct Paths {
    pub settings_path: PathBuf,
    pub log_path: PathBuf,
}

pub fn project_paths() -> Result<Paths, ConfigError> {
    let proj =
        ProjectDirs::from("com", "cyberfield", "Cyberfield").ok_or(ConfigError::NoProjectDirs)?;
    Ok(Paths {
        settings_path: proj.config_dir().join("settings.json"),
        log_path: proj.data_local_dir().join("cyberfield.log"),
    })
}

/// Reads settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings_atomic(path: &Path, s: &Settings) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, data).map_err(write_err)?;
    atomic_rename(&tmp, path).map_err(write_err)
}

fn atomic_rename(from: &Path, to: &Path) -> io::Result<()> {
    // rename-over-existing is not atomic on Windows; remove first there
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}
