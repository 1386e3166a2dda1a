//! Session token storage in the OS keyring.
//!
//! FogBugz hands out a token at `logon` that stays valid until `logoff`.
//! The command-line tool keeps it in the keyring, keyed by profile, so
//! later invocations can reuse the session without asking for a password.
//! Passwords themselves are never stored.

use super::error::{ApiError, Result};

/// The keyring service name for FogBugz session tokens.
const KEYRING_SERVICE: &str = "fogbugz";

fn entry(profile_name: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))
}

/// Store a session token for a profile.
///
/// # Errors
///
/// Returns an error if the token cannot be stored in the keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<()> {
    entry(profile_name)?
        .set_password(token)
        .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))
}

/// Retrieve the session token for a profile.
///
/// # Errors
///
/// Returns an error if no token is stored or the keyring is unavailable.
pub fn get_token(profile_name: &str) -> Result<String> {
    entry(profile_name)?
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve token: {}", e)))
}

/// Delete the session token for a profile.
///
/// A missing entry is not an error.
pub fn delete_token(profile_name: &str) -> Result<()> {
    match entry(profile_name)?.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(ApiError::Keyring(format!("failed to delete token: {}", e))),
    }
}

/// Check if a session token is stored for a profile.
pub fn has_token(profile_name: &str) -> bool {
    get_token(profile_name).is_ok()
}
