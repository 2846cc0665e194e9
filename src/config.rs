use anyhow::{Context, Result};
use facemetrics_vision::{model::DETECTOR_MODEL_FILE, DetectorOptions};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(
        option_env!("FACEMETRICS_CONFIG_PATH").unwrap_or("/usr/local/etc/facemetrics/config.toml"),
    )
});

pub static MODEL_DIR: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEMETRICS_MODEL_DIR").unwrap_or("/usr/local/share/facemetrics"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YuNet ONNX model.
    pub model: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    /// Assign tracking ids across consecutive frames.
    pub tracking: bool,
}

impl Default for Config {
    fn default() -> Self {
        let detector = DetectorOptions::default();
        Self {
            model: MODEL_DIR.join(DETECTOR_MODEL_FILE),
            score_threshold: detector.score_threshold,
            nms_threshold: detector.nms_threshold,
            tracking: detector.tracking,
        }
    }
}

impl Config {
    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            score_threshold: self.score_threshold,
            nms_threshold: self.nms_threshold,
            tracking: self.tracking,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
