//! Centralized error types for the FogBugz client.
//!
//! This module provides a unified error hierarchy for the command-line tool
//! with user-friendly error messages.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// The main application error type.
///
/// Aggregates configuration and API errors while preserving the
/// underlying error for logging.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line input that clap could not catch.
    #[error("{0}")]
    Usage(String),
}

impl AppError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        AppError::Usage(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Set FOGBUGZ_CONFIG_DIR.".to_string()
                }
                ConfigError::CreateDirError(_) | ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check it is readable.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
            },
            AppError::Api(e) => match e {
                ApiError::InvalidArgument(msg) => msg.clone(),
                ApiError::Unauthenticated(_) => "You are not logged in.".to_string(),
                ApiError::Timeout(limit) => {
                    format!("FogBugz did not answer within {:?}.", limit)
                }
                ApiError::NoResponse => "FogBugz returned an empty response.".to_string(),
                ApiError::MalformedResponse(_) => {
                    "FogBugz returned something that is not XML. Check the URL.".to_string()
                }
                ApiError::Api(msg) => format!("FogBugz says: {}", msg),
                ApiError::UnexpectedShape(_) => {
                    "Unexpected response from FogBugz. Please try again.".to_string()
                }
                ApiError::Network(_) => {
                    "Connection failed. Please check your network and the FogBugz URL.".to_string()
                }
                ApiError::Keyring(_) => {
                    "Could not access secure storage for the session token.".to_string()
                }
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            AppError::Usage(msg) => msg.clone(),
        }
    }

    /// Check if this error means the tool cannot work without user action.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Api(ApiError::Unauthenticated(_))
                | AppError::Api(ApiError::Keyring(_))
        )
    }

    /// Process exit status for this error.
    ///
    /// 2 when the tool needs setup (profile, login), 3 when the server could
    /// not be reached or answered with something unusable, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            e if e.is_critical() => 2,
            AppError::Api(e) if e.is_transport() => 3,
            _ => 1,
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::ProfileNotFound(_))
            | AppError::Config(ConfigError::ValidationError(_)) => {
                Some("Run 'fogbugz profile add' to configure a profile.")
            }
            AppError::Api(ApiError::Unauthenticated(_)) | AppError::Api(ApiError::Keyring(_)) => {
                Some("Run 'fogbugz login' to start a session.")
            }
            AppError::Api(ApiError::Timeout(_)) | AppError::Api(ApiError::Network(_)) => {
                Some("Run 'fogbugz ping' to check that the server is reachable.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_app_error_from_config_error() {
        let app_err: AppError = ConfigError::NoConfigDir.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::NoConfigDir)));
    }

    #[test]
    fn test_app_error_from_api_error() {
        let app_err: AppError = ApiError::NoResponse.into();
        assert!(matches!(app_err, AppError::Api(ApiError::NoResponse)));
    }

    #[test]
    fn test_user_message_api_error() {
        let err = AppError::Api(ApiError::Api("Case 12 is closed".to_string()));
        assert_eq!(err.user_message(), "FogBugz says: Case 12 is closed");
    }

    #[test]
    fn test_user_message_timeout() {
        let err = AppError::Api(ApiError::Timeout(Duration::from_secs(10)));
        assert!(err.user_message().contains("10s"));
    }

    #[test]
    fn test_user_message_profile_not_found() {
        let err = AppError::Config(ConfigError::ProfileNotFound("home".to_string()));
        assert_eq!(err.user_message(), "Profile 'home' not found.");
    }

    #[test]
    fn test_is_critical() {
        assert!(AppError::Api(ApiError::Unauthenticated("new".to_string())).is_critical());
        assert!(AppError::Config(ConfigError::NoConfigDir).is_critical());
        assert!(!AppError::Api(ApiError::NoResponse).is_critical());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(AppError::Config(ConfigError::NoConfigDir).exit_code(), 2);
        assert_eq!(
            AppError::Api(ApiError::Unauthenticated("search".to_string())).exit_code(),
            2
        );
        assert_eq!(AppError::Api(ApiError::NoResponse).exit_code(), 3);
        assert_eq!(
            AppError::Api(ApiError::Timeout(Duration::from_secs(10))).exit_code(),
            3
        );
        assert_eq!(AppError::Api(ApiError::Api("nope".to_string())).exit_code(), 1);
        assert_eq!(AppError::usage("bad").exit_code(), 1);
    }

    #[test]
    fn test_suggested_action_unauthenticated() {
        let err = AppError::Api(ApiError::Unauthenticated("search".to_string()));
        assert!(err.suggested_action().unwrap().contains("fogbugz login"));
    }

    #[test]
    fn test_suggested_action_none_for_api_error() {
        let err = AppError::Api(ApiError::Api("nope".to_string()));
        assert!(err.suggested_action().is_none());
    }

    #[test]
    fn test_usage_error() {
        let err = AppError::usage("expected name=value");
        assert_eq!(err.user_message(), "expected name=value");
    }
}
