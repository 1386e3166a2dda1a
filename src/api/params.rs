//! Command construction for the FogBugz query-string API.
//!
//! Every request is a single `GET` whose query string selects the command
//! with `cmd=` and carries its arguments as URL-encoded key/value pairs.
//! Callers may pass options under friendly names (`priority`, `owner`, ...)
//! which are translated to the API's field names here.

use super::error::{ApiError, Result};

/// The only command that may be sent without a session token.
pub const LOGON_COMMAND: &str = "logon";

/// Friendly option names and the API fields they stand for.
const PARAMETER_ALIASES: &[(&str, &str)] = &[
    ("area", "ixArea"),
    ("category", "ixCategory"),
    ("content", "sEvent"),
    ("description", "sEvent"),
    ("owner", "ixPersonAssignedTo"),
    ("priority", "ixPriority"),
    ("project", "ixProject"),
];

/// Translate a friendly parameter name into the API field name.
///
/// Names without an alias are returned unchanged.
pub fn translate(name: &str) -> &str {
    PARAMETER_ALIASES
        .iter()
        .find(|(friendly, _)| *friendly == name)
        .map(|(_, field)| *field)
        .unwrap_or(name)
}

/// Validate a numeric identifier that an operation requires.
///
/// Zero and negative values are rejected the same way a missing id is.
pub fn require_id(what: &str, id: i64) -> Result<i64> {
    if id <= 0 {
        return Err(ApiError::invalid(format!("{} must be specified", what)));
    }
    Ok(id)
}

/// Coerce a textual identifier into an integer.
///
/// Surrounding whitespace is ignored; empty, non-numeric and non-positive
/// input fails with `InvalidArgument`.
pub fn parse_id(what: &str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(format!("{} must be specified", what)));
    }
    let id = trimmed
        .parse::<i64>()
        .map_err(|_| ApiError::invalid(format!("{} must be a number, got '{}'", what, raw)))?;
    require_id(what, id)
}

/// Reject empty required text fields.
pub(crate) fn require_text<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(ApiError::invalid(format!("{} must be specified", what)));
    }
    Ok(value)
}

/// Which kinds of account `listPeople` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeopleQuery {
    pub include_normal: bool,
    pub include_virtual: bool,
    pub include_community: bool,
}

impl Default for PeopleQuery {
    fn default() -> Self {
        Self {
            include_normal: true,
            include_virtual: false,
            include_community: false,
        }
    }
}

/// A single API command and its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: String,
    params: Vec<(String, String)>,
}

impl CommandRequest {
    /// Start a request for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Vec::new(),
        }
    }

    /// Append a fixed API field.
    pub fn param(mut self, field: &str, value: impl ToString) -> Self {
        self.params.push((field.to_string(), value.to_string()));
        self
    }

    /// Append a flag field set to `1` when `enabled` is true.
    pub fn flag(self, field: &str, enabled: bool) -> Self {
        if enabled {
            self.param(field, 1)
        } else {
            self
        }
    }

    /// Append caller options, translating friendly names.
    ///
    /// Options keep the caller's order and follow the fixed fields.
    pub fn options(mut self, options: &[(&str, &str)]) -> Self {
        for (name, value) in options {
            self.params
                .push((translate(name).to_string(), (*value).to_string()));
        }
        self
    }

    /// The command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The parameters added so far, with API field names.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether this is the login command.
    pub fn is_logon(&self) -> bool {
        self.command == LOGON_COMMAND
    }

    /// Build the encoded query string.
    ///
    /// A present token is prepended to every command except `logon`. Any
    /// other command without a token fails with `Unauthenticated`.
    pub fn to_query(&self, token: Option<&str>) -> Result<String> {
        let token = token.filter(|t| !t.is_empty());
        let mut query = String::new();

        if !self.is_logon() {
            let token = token.ok_or_else(|| ApiError::Unauthenticated(self.command.clone()))?;
            query.push_str("token=");
            query.push_str(&urlencoding::encode(token));
            query.push('&');
        }

        query.push_str("cmd=");
        query.push_str(&self.command);

        for (field, value) in &self.params {
            query.push('&');
            query.push_str(&urlencoding::encode(field));
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }

        Ok(query)
    }

    /// The query string with the token and password masked, for logging.
    pub fn redacted(&self) -> String {
        let mut out = format!("cmd={}", self.command);
        for (field, value) in &self.params {
            if field == "password" {
                out.push_str(&format!("&{}=***", field));
            } else {
                out.push_str(&format!("&{}={}", field, urlencoding::encode(value)));
            }
        }
        out
    }
}
