//! FogBugz profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// Script name of the FogBugz API under the installation URL.
const API_SCRIPT: &str = "api.asp";

/// A FogBugz profile configuration.
///
/// Profiles store connection details for a FogBugz installation.
/// Session tokens are stored separately in the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The FogBugz installation URL, or the full `api.asp` URL.
    pub url: String,

    /// The email address used to log in.
    pub email: String,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, url: String, email: String) -> Self {
        Self { name, url, email }
    }

    /// Validate this profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL cannot be empty",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        if self.email.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': email cannot be empty",
                self.name
            )));
        }

        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': '{}' does not appear to be a valid email address",
                self.name, self.email
            )));
        }

        Ok(())
    }

    /// The API endpoint for this profile.
    ///
    /// A bare installation URL gets `/api.asp` appended.
    pub fn endpoint(&self) -> String {
        let url = self.url.trim_end_matches('/');
        if url.ends_with(".asp") {
            url.to_string()
        } else {
            format!("{}/{}", url, API_SCRIPT)
        }
    }
}
