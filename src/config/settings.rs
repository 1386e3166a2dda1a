//! Application settings configuration.

use serde::{Deserialize, Serialize};

/// Application-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// The name of the profile used when none is given.
    #[serde(default)]
    pub default_profile: Option<String>,
}
