//! Configuration management for the FogBugz client.
//!
//! This module handles loading, saving, and managing user configuration
//! including profiles and application settings. Configuration lives in
//! `config.toml` under the platform config directory, or under
//! `$FOGBUGZ_CONFIG_DIR` when that is set.

mod profile;
mod settings;

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::Profile;
pub use settings::Settings;

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "FOGBUGZ_CONFIG_DIR";

/// Name of the configuration file inside the configuration directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration directory could be determined.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    #[error("Failed to create configuration directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Failed to read configuration file: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write configuration file: {0}")]
    WriteError(std::io::Error),

    #[error("Invalid configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A profile or setting failed validation.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The complete on-disk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// The directory holding the configuration file.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join("fogbugz"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// The full path of the configuration file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load the configuration, falling back to defaults if no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        debug!(path = %path.display(), profiles = config.profiles.len(), "Loaded configuration");
        Ok(config)
    }

    /// Save the configuration, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).map_err(ConfigError::CreateDirError)?;

        let path = dir.join(CONFIG_FILE_NAME);
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents).map_err(ConfigError::WriteError)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check every profile and that profile names are unique.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(default) = &self.settings.default_profile {
            if !self.profiles.iter().any(|p| &p.name == default) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' does not exist",
                    default
                )));
            }
        }

        Ok(())
    }

    /// Resolve a profile by name, or the default profile when `name` is `None`.
    ///
    /// With no default configured, a single profile is used implicitly.
    pub fn profile(&self, name: Option<&str>) -> Result<&Profile> {
        let name = match name.or(self.settings.default_profile.as_deref()) {
            Some(name) => name,
            None if self.profiles.len() == 1 => return Ok(&self.profiles[0]),
            None => {
                return Err(ConfigError::ValidationError(
                    "no profile given and no default profile set".to_string(),
                ))
            }
        };

        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// Add a profile, replacing one with the same name.
    pub fn upsert_profile(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Remove a profile by name, clearing it as default if needed.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;

        if self.settings.default_profile.as_deref() == Some(name) {
            self.settings.default_profile = None;
        }
        Ok(self.profiles.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn work_profile() -> Profile {
        Profile::new(
            "work".to_string(),
            "https://company.fogbugz.com/api.asp".to_string(),
            "user@company.com".to_string(),
        )
    }

    #[test]
    #[serial]
    fn test_load_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, dir.path());

        let config = Config::load().unwrap();
        assert_eq!(config, Config::default());

        std::env::remove_var(CONFIG_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::env::set_var(CONFIG_DIR_ENV, &nested);

        let mut config = Config::default();
        config.upsert_profile(work_profile()).unwrap();
        config.settings.default_profile = Some("work".to_string());
        config.save().unwrap();

        assert!(nested.join("config.toml").exists());
        let loaded = Config::load().unwrap();
        assert_eq!(loaded, config);

        std::env::remove_var(CONFIG_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, dir.path());
        fs::write(dir.path().join("config.toml"), "profiles = 3 = 4").unwrap();

        assert!(matches!(Config::load(), Err(ConfigError::ParseError(_))));

        std::env::remove_var(CONFIG_DIR_ENV);
    }

    #[test]
    fn test_duplicate_profiles_rejected() {
        let config = Config {
            settings: Settings::default(),
            profiles: vec![work_profile(), work_profile()],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate profile"));
    }

    #[test]
    fn test_missing_default_profile_rejected() {
        let config = Config {
            settings: Settings {
                default_profile: Some("home".to_string()),
            },
            profiles: vec![work_profile()],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_profile_resolution() {
        let mut config = Config::default();
        config.upsert_profile(work_profile()).unwrap();

        assert_eq!(config.profile(None).unwrap().name, "work");
        assert_eq!(config.profile(Some("work")).unwrap().name, "work");
        assert!(matches!(
            config.profile(Some("home")),
            Err(ConfigError::ProfileNotFound(_))
        ));

        let mut home = work_profile();
        home.name = "home".to_string();
        config.upsert_profile(home).unwrap();
        assert!(config.profile(None).is_err());

        config.settings.default_profile = Some("home".to_string());
        assert_eq!(config.profile(None).unwrap().name, "home");
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut config = Config::default();
        config.upsert_profile(work_profile()).unwrap();

        let mut updated = work_profile();
        updated.email = "other@company.com".to_string();
        config.upsert_profile(updated).unwrap();

        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].email, "other@company.com");
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.upsert_profile(work_profile()).unwrap();
        config.settings.default_profile = Some("work".to_string());

        let removed = config.remove_profile("work").unwrap();
        assert_eq!(removed.name, "work");
        assert!(config.profiles.is_empty());
        assert_eq!(config.settings.default_profile, None);
        assert!(config.remove_profile("work").is_err());
    }
}
