use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::{ColorEncoder, ColorScheme, Palette, Rgb};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to `config.toml`. Refuses to overwrite unless `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Pass force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read and parse `config.toml` from this directory. A missing file yields defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub window: WindowConfig,
    pub coercion: CoercionConfig,
    pub color: ColorConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
}

/// Navigation window sizes, in rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub default_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub default_step: usize,
    pub min_step: usize,
    pub max_step: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionConfig {
    /// Append `_formatted`, `_date`, `_time` and `_timestamp` columns for time headers.
    pub derive_time_columns: bool,
    /// Headers treated as time columns, matched case-insensitively.
    pub time_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// "auto" or "continuous"
    pub scheme: String,
    pub near_zero_ratio: f64,
    pub negative: String,
    pub negative_light: String,
    pub negative_beyond: String,
    pub neutral: String,
    pub positive: String,
    pub positive_light: String,
    pub positive_beyond: String,
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            window: WindowConfig::default(),
            coercion: CoercionConfig::default(),
            color: ColorConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_size: 1000,
            min_size: 1,
            max_size: 100_000,
            default_step: 100,
            min_step: 1,
            max_step: 100_000,
        }
    }
}

impl Default for CoercionConfig {
    fn default() -> Self {
        Self {
            derive_time_columns: true,
            time_columns: vec!["time".to_string()],
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        let palette = Palette::default();
        Self {
            scheme: "auto".to_string(),
            near_zero_ratio: crate::color::DEFAULT_NEAR_ZERO_RATIO,
            negative: palette.negative.to_hex(),
            negative_light: palette.negative_light.to_hex(),
            negative_beyond: palette.negative_beyond.to_hex(),
            neutral: palette.neutral.to_hex(),
            positive: palette.positive.to_hex(),
            positive_light: palette.positive_light.to_hex(),
            positive_beyond: palette.positive_beyond.to_hex(),
            fallback: palette.fallback.to_hex(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        match ConfigManager::new(app_name).and_then(|manager| manager.load_file()) {
            Ok(user_config) => config.merge(user_config),
            Err(e) => tracing::warn!("Ignoring user config: {}", e),
        }

        config.validate()?;

        Ok(config)
    }

    /// Load defaults merged with the config file in `manager`'s directory.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.load_file()?);
        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.window.merge(other.window);
        self.coercion.merge(other.coercion);
        self.color.merge(other.color);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        self.window.validate()?;

        if self.coercion.time_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(eyre!("coercion.time_columns must not contain empty names"));
        }

        self.color.validate(&ColorParser::new())?;

        if self.debug.log_level.trim().is_empty() {
            return Err(eyre!("debug.log_level must not be empty"));
        }

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
    }
}

impl WindowConfig {
    pub fn merge(&mut self, other: Self) {
        let default = WindowConfig::default();
        if other.default_size != default.default_size {
            self.default_size = other.default_size;
        }
        if other.min_size != default.min_size {
            self.min_size = other.min_size;
        }
        if other.max_size != default.max_size {
            self.max_size = other.max_size;
        }
        if other.default_step != default.default_step {
            self.default_step = other.default_step;
        }
        if other.min_step != default.min_step {
            self.min_step = other.min_step;
        }
        if other.max_step != default.max_step {
            self.max_step = other.max_step;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 || self.min_step == 0 {
            return Err(eyre!("window.min_size and window.min_step must be greater than 0"));
        }
        if self.min_size > self.max_size {
            return Err(eyre!(
                "window.min_size ({}) exceeds window.max_size ({})",
                self.min_size,
                self.max_size
            ));
        }
        if self.min_step > self.max_step {
            return Err(eyre!(
                "window.min_step ({}) exceeds window.max_step ({})",
                self.min_step,
                self.max_step
            ));
        }
        if !(self.min_size..=self.max_size).contains(&self.default_size) {
            return Err(eyre!(
                "window.default_size ({}) must be within {}..={}",
                self.default_size,
                self.min_size,
                self.max_size
            ));
        }
        if !(self.min_step..=self.max_step).contains(&self.default_step) {
            return Err(eyre!(
                "window.default_step ({}) must be within {}..={}",
                self.default_step,
                self.min_step,
                self.max_step
            ));
        }
        Ok(())
    }
}

impl CoercionConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CoercionConfig::default();
        if other.derive_time_columns != default.derive_time_columns {
            self.derive_time_columns = other.derive_time_columns;
        }
        if other.time_columns != default.time_columns {
            self.time_columns = other.time_columns;
        }
    }

    pub fn is_time_column(&self, header: &str) -> bool {
        self.time_columns
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(header.trim()))
    }
}

impl ColorConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        if other.scheme != default.scheme {
            self.scheme = other.scheme;
        }
        if other.near_zero_ratio != default.near_zero_ratio {
            self.near_zero_ratio = other.near_zero_ratio;
        }
        if other.negative != default.negative {
            self.negative = other.negative;
        }
        if other.negative_light != default.negative_light {
            self.negative_light = other.negative_light;
        }
        if other.negative_beyond != default.negative_beyond {
            self.negative_beyond = other.negative_beyond;
        }
        if other.neutral != default.neutral {
            self.neutral = other.neutral;
        }
        if other.positive != default.positive {
            self.positive = other.positive;
        }
        if other.positive_light != default.positive_light {
            self.positive_light = other.positive_light;
        }
        if other.positive_beyond != default.positive_beyond {
            self.positive_beyond = other.positive_beyond;
        }
        if other.fallback != default.fallback {
            self.fallback = other.fallback;
        }
    }

    fn palette_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("negative", self.negative.as_str()),
            ("negative_light", self.negative_light.as_str()),
            ("negative_beyond", self.negative_beyond.as_str()),
            ("neutral", self.neutral.as_str()),
            ("positive", self.positive.as_str()),
            ("positive_light", self.positive_light.as_str()),
            ("positive_beyond", self.positive_beyond.as_str()),
            ("fallback", self.fallback.as_str()),
        ]
    }

    pub fn validate(&self, parser: &ColorParser) -> Result<()> {
        if ColorScheme::parse(&self.scheme).is_none() {
            return Err(eyre!(
                "Invalid color scheme: {}. Must be 'auto' or 'continuous'",
                self.scheme
            ));
        }
        if !(0.0..1.0).contains(&self.near_zero_ratio) {
            return Err(eyre!(
                "color.near_zero_ratio must be in [0, 1), got {}",
                self.near_zero_ratio
            ));
        }
        for (name, value) in self.palette_fields() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn palette(&self, parser: &ColorParser) -> Result<Palette> {
        Ok(Palette {
            negative: parser.parse(&self.negative)?,
            negative_light: parser.parse(&self.negative_light)?,
            negative_beyond: parser.parse(&self.negative_beyond)?,
            neutral: parser.parse(&self.neutral)?,
            positive: parser.parse(&self.positive)?,
            positive_light: parser.parse(&self.positive_light)?,
            positive_beyond: parser.parse(&self.positive_beyond)?,
            fallback: parser.parse(&self.fallback)?,
        })
    }

    pub fn encoder(&self) -> Result<ColorEncoder> {
        let scheme = ColorScheme::parse(&self.scheme)
            .ok_or_else(|| eyre!("Invalid color scheme: {}", self.scheme))?;
        Ok(ColorEncoder::new(
            self.palette(&ColorParser::new())?,
            scheme,
            self.near_zero_ratio,
        ))
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
        if other.log_level != default.log_level {
            self.log_level = other.log_level;
        }
    }
}

/// Parses palette strings: `#rrggbb` hex or a basic color name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorParser;

impl ColorParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, s: &str) -> Result<Rgb> {
        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(Rgb(r, g, b));
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "black" => Ok(Rgb(0, 0, 0)),
            "red" => Ok(Rgb(255, 0, 0)),
            "green" => Ok(Rgb(0, 128, 0)),
            "yellow" => Ok(Rgb(255, 255, 0)),
            "blue" => Ok(Rgb(0, 0, 255)),
            "magenta" => Ok(Rgb(255, 0, 255)),
            "cyan" => Ok(Rgb(0, 255, 255)),
            "white" => Ok(Rgb(255, 255, 255)),
            "orange" => Ok(Rgb(255, 165, 0)),
            "steelblue" | "steel_blue" => Ok(Rgb(70, 130, 180)),
            "gray" | "grey" => Ok(Rgb(128, 128, 128)),
            "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => Ok(Rgb(64, 64, 64)),
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Rgb(211, 211, 211)),
            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic color names (red, blue, gray, etc.) \
                 or hex colors (#ff0000)",
                trimmed
            )),
        }
    }
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 || !s.is_ascii() {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let r = u8::from_str_radix(&s[1..3], 16)
        .map_err(|_| eyre!("Invalid red component in hex color: {}", s))?;
    let g = u8::from_str_radix(&s[3..5], 16)
        .map_err(|_| eyre!("Invalid green component in hex color: {}", s))?;
    let b = u8::from_str_radix(&s[5..7], 16)
        .map_err(|_| eyre!("Invalid blue component in hex color: {}", s))?;

    Ok((r, g, b))
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn merge_takes_non_default_values() {
        let mut base = AppConfig::default();
        let mut other = AppConfig::default();
        other.window.default_size = 250;
        other.color.scheme = "continuous".to_string();
        other.debug.enabled = true;
        base.merge(other);
        assert_eq!(base.window.default_size, 250);
        assert_eq!(base.window.max_size, 100_000);
        assert_eq!(base.color.scheme, "continuous");
        assert!(base.debug.enabled);
    }

    #[test]
    fn window_validation() {
        let mut config = AppConfig::default();
        config.window.min_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.window.default_step = 200_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.window.min_size = 10;
        config.window.max_size = 5;
        config.window.default_size = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn color_validation() {
        let mut config = AppConfig::default();
        config.color.neutral = "not-a-color".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("neutral"));

        let mut config = AppConfig::default();
        config.color.near_zero_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.color.scheme = "plasma".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parser_accepts_hex_and_names() {
        let parser = ColorParser::new();
        assert_eq!(parser.parse("#FF8000").unwrap(), Rgb(255, 128, 0));
        assert_eq!(parser.parse("  red ").unwrap(), Rgb(255, 0, 0));
        assert_eq!(parser.parse("Grey").unwrap(), Rgb(128, 128, 128));
        assert!(parser.parse("#12345").is_err());
        assert!(parser.parse("#gg0000").is_err());
        assert!(parser.parse("chartreuse-ish").is_err());
    }

    #[test]
    fn encoder_from_config() {
        let mut config = ColorConfig::default();
        config.scheme = "continuous".to_string();
        config.positive = "#00ff00".to_string();
        let encoder = config.encoder().unwrap();
        assert_eq!(encoder.scheme, ColorScheme::Continuous);
        assert_eq!(encoder.palette.positive, Rgb(0, 255, 0));
        assert_eq!(
            ColorConfig::default().encoder().unwrap(),
            ColorEncoder::default()
        );
    }

    #[test]
    fn time_column_matching_is_case_insensitive() {
        let config = CoercionConfig::default();
        assert!(config.is_time_column("Time"));
        assert!(config.is_time_column(" TIME "));
        assert!(!config.is_time_column("timestamp"));
    }
}
