//! Application configuration: JSON file plus command-line overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::{CullSettings, GrassConfig, Placement};

/// How compute and graphics work for consecutive frames is kept apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// One buffer set; each frame waits for the previous compute submission
    QueueIdle,
    /// One buffer set per frame slot; the slot fence is the only wait
    #[default]
    DoubleBuffered,
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queue-idle" => Ok(Self::QueueIdle),
            "double-buffered" => Ok(Self::DoubleBuffered),
            other => Err(format!("unknown sync mode '{other}' (expected queue-idle or double-buffered)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "meadow".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Top-level configuration. Every field has a default, so an empty JSON
/// object (or no file at all) is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub grass: GrassConfig,
    pub cull: CullSettings,
    pub sync: SyncMode,
    /// Log GPU pass timings (needs timestamp query support)
    pub profile: bool,
    /// Ground texture; a procedural checker is used when unset or unreadable
    pub ground_texture: Option<PathBuf>,
}

impl AppConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Build the configuration from command-line arguments: `--config` is
    /// loaded first, then the remaining flags override it.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = match parse_value_arg(args, "--config", "-c") {
            Some(path) => Self::load(Path::new(path))?,
            None => Self::default(),
        };
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the current values.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(value) = parse_value_arg(args, "--blades", "-n") {
            self.grass.blade_count = value
                .parse()
                .map_err(|_| Error::Config(format!("invalid --blades value '{value}'")))?;
        }
        if let Some(value) = parse_value_arg(args, "--bounds", "-b") {
            self.grass.bounds = value
                .parse()
                .map_err(|_| Error::Config(format!("invalid --bounds value '{value}'")))?;
        }
        if let Some(value) = parse_value_arg(args, "--placement", "-p") {
            self.grass.placement = value.parse::<Placement>().map_err(Error::Config)?;
        }
        if let Some(value) = parse_value_arg(args, "--sync", "-s") {
            self.sync = value.parse::<SyncMode>().map_err(Error::Config)?;
        }
        if args.iter().any(|a| a == "--profile") {
            self.profile = true;
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a frame.
    pub fn validate(&self) -> Result<()> {
        if self.grass.effective_count() == 0 {
            return Err(Error::Config("blade count must be at least 1".to_string()));
        }
        if !(self.grass.bounds > 0.0) {
            return Err(Error::Config(format!("bounds must be positive, got {}", self.grass.bounds)));
        }
        self.grass.ranges.validate().map_err(Error::Config)?;
        if self.cull.distance && !(self.cull.max_distance > 0.0) {
            return Err(Error::Config(format!(
                "max_distance must be positive when distance culling is on, got {}",
                self.cull.max_distance
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config("window size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Value following `long` or `short` on the command line
fn parse_value_arg<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a str> {
    let i = args.iter().position(|a| a == long || a == short)?;
    args.get(i + 1).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("meadow").chain(list.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.grass.blade_count, 4000);
        assert_eq!(config.sync, SyncMode::DoubleBuffered);
        assert!(config.window.resizable);
        assert!(!config.profile);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "grass": { "blade_count": 12, "placement": "heart" }, "sync": "queue-idle" }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.grass.blade_count, 12);
        assert_eq!(config.grass.placement, Placement::Heart);
        assert_eq!(config.grass.bounds, 30.0);
        assert_eq!(config.sync, SyncMode::QueueIdle);
        assert!(config.cull.frustum);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("meadow.json");
        let mut config = AppConfig::default();
        config.grass.blade_count = 321;
        config.cull.max_distance = 12.5;
        config.ground_texture = Some(PathBuf::from("assets/ground.png"));
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "grass": {{ "blade_count": 0 }} }}"#).unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(Error::Config(_))));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        assert!(matches!(AppConfig::load(bad.path()), Err(Error::Json(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::from_args(&args(&[
            "--blades", "10", "--placement", "single", "--sync", "queue-idle", "--profile",
        ]))
        .unwrap();
        assert_eq!(config.grass.blade_count, 10);
        assert_eq!(config.grass.placement, Placement::Single);
        assert_eq!(config.sync, SyncMode::QueueIdle);
        assert!(config.profile);
    }

    #[test]
    fn test_cli_config_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "grass": { "blade_count": 50, "bounds": 10.0 } }"#).unwrap();
        let path_str = path.to_string_lossy().to_string();
        let config = AppConfig::from_args(&args(&["--config", &path_str, "--bounds", "20"])).unwrap();
        assert_eq!(config.grass.blade_count, 50);
        assert_eq!(config.grass.bounds, 20.0);
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(AppConfig::from_args(&args(&["--blades", "lots"])).is_err());
        assert!(AppConfig::from_args(&args(&["--sync", "triple"])).is_err());
        assert!(AppConfig::from_args(&args(&["--blades", "0"])).is_err());
    }

    #[test]
    fn test_single_placement_ignores_zero_count() {
        let config = AppConfig::from_args(&args(&["--placement", "single", "--blades", "0"])).unwrap();
        assert_eq!(config.grass.effective_count(), 1);
    }
}
