use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use gumdrop::schema;
use gumdrop::visual::{PanelOptions, RibbonOptions, ThumbprintOptions};

/// Log verbosity, overridden by RUST_LOG when set
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Main gumdrop configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub paths: PathsConfig,
    pub render: RenderConfig,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Keystore directory holding `<key_id>.json` entries
    pub keystore: PathBuf,
    /// Where bare cartridge names are resolved
    pub containers: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub thumbprint_width: usize,
    pub thumbprint_height: usize,
    pub panel_grid: usize,
    pub ribbon_perspective: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Remembered facts included in a compiled prompt
    pub fact_limit: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let gumdrop_dir = Config::gumdrop_dir();

        Self {
            keystore: gumdrop_dir.join("keys"),
            containers: gumdrop_dir.join("cartridges"),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        let thumbprint = ThumbprintOptions::default();
        Self {
            thumbprint_width: thumbprint.width,
            thumbprint_height: thumbprint.height,
            panel_grid: PanelOptions::default().grid_size,
            ribbon_perspective: RibbonOptions::default().perspective,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            fact_limit: schema::DEFAULT_FACT_LIMIT,
        }
    }
}

impl RenderConfig {
    pub fn thumbprint(&self, framed: bool) -> ThumbprintOptions {
        ThumbprintOptions {
            width: self.thumbprint_width.max(1),
            height: self.thumbprint_height.max(1),
            framed,
        }
    }

    pub fn panel(&self) -> PanelOptions {
        PanelOptions {
            grid_size: self.panel_grid.max(1),
            ..Default::default()
        }
    }

    pub fn ribbon(&self) -> RibbonOptions {
        RibbonOptions {
            perspective: self.ribbon_perspective,
            ..Default::default()
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("GUMDROP_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from GUMDROP_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(gumdrop_dir) = std::env::var("GUMDROP_DIR") {
            let path = PathBuf::from(gumdrop_dir).join("gumdrop.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from GUMDROP_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/gumdrop/gumdrop.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("gumdrop").join("gumdrop.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./gumdrop.yaml (for development)
        let local_config = PathBuf::from("gumdrop.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The gumdrop home directory (`$GUMDROP_DIR` or `~/.gumdrop`)
    pub fn gumdrop_dir() -> PathBuf {
        std::env::var("GUMDROP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".gumdrop"))
    }

    pub fn keystore_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.keystore)
    }

    /// Resolve a cartridge argument. A bare name without extension or
    /// directory is looked up in the containers directory.
    pub fn resolve_cartridge(&self, arg: &str) -> PathBuf {
        let path = Self::expand_path(Path::new(arg));
        let bare = path.components().count() == 1 && path.extension().is_none();
        if bare {
            Self::expand_path(&self.paths.containers).join(format!("{}.{}", arg, schema::CARTRIDGE_EXTENSION))
        } else {
            path
        }
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.render.thumbprint_width, 18);
        assert_eq!(config.render.thumbprint_height, 6);
        assert_eq!(config.render.panel_grid, 8);
        assert!(config.render.ribbon_perspective);
        assert_eq!(config.prompt.fact_limit, 20);
    }

    #[test]
    fn test_partial_yaml_uses_section_defaults() {
        let yaml = "log_level: debug\nrender:\n  thumbprint_width: 24\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.render.thumbprint_width, 24);
        assert_eq!(config.render.thumbprint_height, 6);
        assert_eq!(config.prompt.fact_limit, 20);
    }

    #[test]
    fn test_render_options() {
        let config = Config::default();
        let thumb = config.render.thumbprint(false);
        assert_eq!((thumb.width, thumb.height, thumb.framed), (18, 6, false));
        assert_eq!(config.render.panel().grid_size, 8);
        assert!(config.render.ribbon().perspective);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert_eq!(LogLevel::Off.level_filter(), log::LevelFilter::Off);
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("test"));
    }

    #[test]
    fn test_resolve_cartridge() {
        let mut config = Config::default();
        config.paths.containers = PathBuf::from("/srv/carts");
        assert_eq!(config.resolve_cartridge("atlas"), PathBuf::from("/srv/carts/atlas.gdp"));
        assert_eq!(config.resolve_cartridge("./atlas.gdp"), PathBuf::from("./atlas.gdp"));
        assert_eq!(config.resolve_cartridge("atlas.gdp"), PathBuf::from("atlas.gdp"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.log_level, config.log_level);
        assert_eq!(parsed.paths.keystore, config.paths.keystore);
        assert_eq!(parsed.render.panel_grid, config.render.panel_grid);
    }
}
