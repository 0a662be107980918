use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::output::EncodeOptions;
use crate::settings::MontageSettings;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "INSTA_MONTAGE_CONFIG";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
/// Persisted defaults for montage runs.
pub struct MontageConfig {
    pub montage: MontageSettings,
    /// TrueType/OpenType font for annotations; built-in glyphs when unset.
    pub font_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub jpg_quality: Option<u8>,
    pub png_compression: Option<u8>,
}

impl MontageConfig {
    /// Returns the config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        if let Some(raw) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(raw));
        }
        dirs::config_dir().map(|d| d.join("insta-montage").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring unreadable config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Writes config to disk, ignoring filesystem/serialization errors.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(&path, s);
        }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        let defaults = EncodeOptions::default();
        EncodeOptions {
            jpg_quality: self.jpg_quality.unwrap_or(defaults.jpg_quality).clamp(1, 100),
            png_compression: self.png_compression.unwrap_or(defaults.png_compression).min(9),
        }
    }

    /// Directory for montages written without an explicit output path.
    pub fn default_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::picture_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
