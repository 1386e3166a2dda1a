//! FogBugz API client and types.
//!
//! This module provides the interface for communicating with the FogBugz
//! XML API: session handling, command construction, transport and
//! response decoding.

pub mod auth;
mod client;
pub mod error;
pub mod params;
mod session;
mod transport;
pub mod types;
pub mod xml;

pub use client::FogbugzClient;
pub use error::{ApiError, Result};
pub use params::{parse_id, translate, CommandRequest, PeopleQuery};
pub use session::{Session, SessionState};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT_SECS};
pub use types::{CaseEvent, CaseSummary, Filter, Person, Priority, Project, Status};
pub use xml::XmlNode;
