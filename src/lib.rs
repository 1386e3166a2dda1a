//! Client for the FogBugz XML API.
//!
//! The [`api`] module holds the protocol layer: a [`FogbugzClient`] owns the
//! session token, turns typed operations into `cmd=...` query strings, sends
//! them with a bounded timeout and decodes the XML answers.
//!
//! ```no_run
//! use fogbugz_client::FogbugzClient;
//!
//! # async fn demo() -> fogbugz_client::api::Result<()> {
//! let mut client = FogbugzClient::new("https://example.fogbugz.com/api.asp")?;
//! client.login("me@example.com", "secret").await?;
//! let case = client.open_ticket("Printer on fire", "Smoke everywhere", &[("priority", "1")]).await?;
//! client.resolve_ticket(case).await?;
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

pub use api::{ApiError, FogbugzClient, SessionState};
pub use error::AppError;
