//! Configuration for SkeinPath runs
//!
//! Supports JSON and TOML files. Every section and field has a default, so a
//! file only needs the values it changes.
//!
//! Configuration is organized into sections:
//! - Comb settings (jitter, arrival follow, perimeter departure)
//! - Fillet settings (mode and radius ratio)
//! - Stream defaults (widths and insets until the toolpath states its own)
//! - Output settings (decimal places)

use serde::{Deserialize, Serialize};
use skeinpath_core::FilletMode;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Most decimal places the emitter will carry
const MAX_DECIMAL_PLACES: u32 = 10;

/// Travel combing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombSettings {
    pub enabled: bool,
    /// Loop-start jitter distance in extrusion widths
    pub jitter_over_perimeter_width: f64,
    /// Arrival approach distance in fill insets
    pub arrival_inset_follow_distance_over_inset_width: f64,
    /// Outer perimeter distance to follow before leaving it, in extrusion widths
    pub minimum_departure_distance_over_perimeter_width: f64,
}

impl Default for CombSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            jitter_over_perimeter_width: 2.0,
            arrival_inset_follow_distance_over_inset_width: 3.0,
            minimum_departure_distance_over_perimeter_width: 0.0,
        }
    }
}

/// Corner fillet settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilletSettings {
    pub enabled: bool,
    pub mode: FilletMode,
    pub fillet_radius_over_half_extrusion_width: f64,
}

impl Default for FilletSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: FilletMode::Bevel,
            fillet_radius_over_half_extrusion_width: 0.7,
        }
    }
}

/// Stream parameters assumed until the toolpath overrides them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub extrusion_width: f64,
    pub fill_inset: f64,
    pub bridge_extrusion_width_over_solid: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            extrusion_width: 0.4,
            fill_inset: 0.36,
            bridge_extrusion_width_over_solid: 1.0,
        }
    }
}

/// Output formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub decimal_places: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { decimal_places: 3 }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub comb: CombSettings,
    pub fillet: FilletSettings,
    pub stream: StreamSettings,
    pub output: OutputSettings,
}

/// File formats the config can be stored in
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// `<platform config dir>/skeinpath/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("skeinpath").join("config.toml"))
        .ok_or_else(|| ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()))
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("stream.extrusion_width", self.stream.extrusion_width),
            ("stream.fill_inset", self.stream.fill_inset),
            (
                "stream.bridge_extrusion_width_over_solid",
                self.stream.bridge_extrusion_width_over_solid,
            ),
        ];
        for (key, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::out_of_range(key, value));
            }
        }

        let ratios = [
            ("comb.jitter_over_perimeter_width", self.comb.jitter_over_perimeter_width),
            (
                "comb.arrival_inset_follow_distance_over_inset_width",
                self.comb.arrival_inset_follow_distance_over_inset_width,
            ),
            (
                "comb.minimum_departure_distance_over_perimeter_width",
                self.comb.minimum_departure_distance_over_perimeter_width,
            ),
            (
                "fillet.fillet_radius_over_half_extrusion_width",
                self.fillet.fillet_radius_over_half_extrusion_width,
            ),
        ];
        for (key, value) in ratios {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::out_of_range(key, value));
            }
        }

        if self.output.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ConfigError::out_of_range(
                "output.decimal_places",
                self.output.decimal_places,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.fillet.mode, FilletMode::Bevel);
        assert_eq!(config.output.decimal_places, 3);
    }

    #[test]
    fn test_validate_rejects_negative_ratio() {
        let mut config = Config::new();
        config.comb.jitter_over_perimeter_width = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::out_of_range("comb.jitter_over_perimeter_width", -1.0))
        );
    }

    #[test]
    fn test_validate_rejects_zero_width_and_precision() {
        let mut config = Config::new();
        config.stream.extrusion_width = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.output.decimal_places = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[fillet]\nmode = \"arc_point\"\n").unwrap();
        assert_eq!(config.fillet.mode, FilletMode::ArcPoint);
        assert_eq!(config.fillet.fillet_radius_over_half_extrusion_width, 0.7);
        assert_eq!(config.comb, CombSettings::default());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            format_of(Path::new("config.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
