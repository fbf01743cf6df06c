//! Layered configuration loading with figment.
//!
//! # Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic values passed to [`ConfigLoader::merge`]
//! 3. Profile file (`bronze.{profile}.toml`)
//! 4. Main file (`bronze.toml` or `config.toml`)
//! 5. Environment variables (`BRONZE_*`)
//!
//! # Environment variables
//!
//! `__` separates nesting levels:
//!
//! - `BRONZE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `BRONZE_RUNTIME__RESTART_DELAY=30s` → `runtime.restart_delay = "30s"`
//!
//! The profile is read from `BRONZE_PROFILE` unless set explicitly.
//!
//! # Feature flags
//!
//! - `toml-config` *(default)*: `bronze.toml`, `config.toml`
//! - `yaml-config`: `bronze.yaml`, `bronze.yml`, `config.yaml`, `config.yml`

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BronzeConfig;
use super::validation::validate_config;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BRONZE_";

/// Environment variable selecting the profile.
pub const PROFILE_VAR: &str = "BRONZE_PROFILE";

/// Directory name under the user config directory.
const APP_DIR: &str = "bronze";

/// Configuration profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `BRONZE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder-style loader over figment.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("deploy/bronze.toml")
///     .profile("production")
///     .load()?;
/// ```
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search for configuration files.
    ///
    /// Without any search path the current directory and
    /// `<user config dir>/bronze` are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` above the built-in defaults.
    pub fn merge(mut self, config: BronzeConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<BronzeConfig> {
        let profile = self.profile.clone();
        let config: BronzeConfig = self.figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            bots = config.bots.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(mut self) -> ConfigResult<Figment> {
        let overrides = std::mem::take(&mut self.overrides);
        let mut figment =
            Figment::from(Serialized::defaults(BronzeConfig::default())).merge(overrides);

        match self.config_file.take() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, &path)?;
            }
            Some(path) => return Err(ConfigError::FileNotFound(path)),
            None => figment = self.search(figment),
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Merging environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR));
        }
        paths
    }

    #[allow(unused_mut, unused_variables)]
    fn search(&self, mut figment: Figment) -> Figment {
        let mut found = false;
        let paths = self.search_paths();

        #[cfg(feature = "toml-config")]
        {
            let (merged, hit) = self.search_format(
                figment,
                &paths,
                &["bronze.toml", "config.toml"],
                |f, path| f.merge(Toml::file(path)),
            );
            figment = merged;
            found |= hit;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (merged, hit) = self.search_format(
                figment,
                &paths,
                &["bronze.yaml", "bronze.yml", "config.yaml", "config.yml"],
                |f, path| f.merge(Yaml::file(path)),
            );
            figment = merged;
            found |= hit;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }

    /// Merges the first of `names` found in `paths`, preceded by its profile
    /// variant when one exists next to it.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn search_format(
        &self,
        mut figment: Figment,
        paths: &[PathBuf],
        names: &[&str],
        merge: fn(Figment, &Path) -> Figment,
    ) -> (Figment, bool) {
        for dir in paths {
            for name in names {
                let Some((stem, ext)) = name.rsplit_once('.') else {
                    continue;
                };

                let profiled = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if profiled.exists() {
                    debug!(path = %profiled.display(), "Loading profile configuration");
                    figment = merge(figment, &profiled);
                }

                let base = dir.join(name);
                if base.exists() {
                    info!(path = %base.display(), "Loading configuration file");
                    return (merge(figment, &base), true);
                }
            }
        }
        (figment, false)
    }
}

/// Merges one file, choosing the provider by extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "unsupported or disabled configuration format: .{ext}"
        ))),
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<BronzeConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BronzeConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, PlatformConfig};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bronze-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_without_sources() {
        let dir = std::env::temp_dir().join("bronze-config-empty");
        std::fs::create_dir_all(&dir).unwrap();
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.bots.is_empty());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/bronze.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn loads_bots_from_toml() {
        let path = temp_file(
            "bots.toml",
            r#"
[logging]
level = "debug"

[runtime]
restart_on_failure = true
restart_delay = "2s"

[[bots]]
id = "main"

[bots.platform]
type = "discord"
token = "abc"
close_timeout = "1s"
"#,
        );

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.runtime.restart_on_failure);
        assert_eq!(config.bots.len(), 1);
        let PlatformConfig::Discord(discord) = &config.bots[0].platform;
        assert_eq!(discord.token, "abc");
        assert_eq!(discord.close_timeout, std::time::Duration::from_secs(1));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn invalid_files_fail_validation() {
        let path = temp_file(
            "empty-token.toml",
            r#"
[[bots]]
id = "main"

[bots.platform]
type = "discord"
token = ""
"#,
        );

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn profile_names_are_normalised() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("Staging"), Profile::Custom("staging".into()));
        assert_eq!(Profile::Production.to_string(), "production");
    }
}
