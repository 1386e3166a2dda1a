//! FogBugz API client implementation.
//!
//! This module provides the main client for the FogBugz XML API. It owns the
//! session (endpoint, token, last error), builds each command's query
//! string, sends it through a [`Transport`] and decodes the XML answer.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use super::error::{ApiError, Result};
use super::params::{require_id, require_text, CommandRequest, PeopleQuery, LOGON_COMMAND};
use super::session::{Session, SessionState};
use super::transport::{HttpTransport, Transport};
use super::types::{self, CaseEvent, CaseSummary, Filter, Person, Priority, Project, Status};
use super::xml::{self, XmlNode};

/// Columns requested by `search`.
const SEARCH_COLUMNS: &str = "fOpen,ixStatus,ixPersonAssignedTo,sPersonAssignedTo,sTitle";

/// Columns requested when fetching a single case's history.
const TICKET_COLUMNS: &str =
    "fOpen,latestEvent,ixBugEvent,ixStatus,ixPersonAssignedTo,sPersonAssignedTo,events";

/// Last-error text recorded for an empty body.
const NO_XML_MESSAGE: &str = "No XML returned";

/// The FogBugz API client.
///
/// Each operation performs exactly one round trip. Operations take
/// `&mut self` because they update the session's token or last error, so
/// one client serves one logical session at a time.
#[derive(Debug)]
pub struct FogbugzClient<T = HttpTransport> {
    transport: T,
    session: Session,
}

impl FogbugzClient<HttpTransport> {
    /// Create a client for an endpoint such as
    /// `https://example.fogbugz.com/api.asp`.
    ///
    /// Performs no I/O; call [`login`](Self::login) before other operations.
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Self::with_transport(endpoint, HttpTransport::new()?))
    }

    /// Create a client that reuses a token obtained earlier.
    pub fn with_token(endpoint: &str, token: &str) -> Result<Self> {
        let mut client = Self::new(endpoint)?;
        client.set_token(token);
        Ok(client)
    }
}

impl<T: Transport> FogbugzClient<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(endpoint: &str, transport: T) -> Self {
        Self {
            transport,
            session: Session::new(normalize_endpoint(endpoint)),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    pub fn set_endpoint(&mut self, endpoint: &str) {
        self.session.set_endpoint(normalize_endpoint(endpoint));
    }

    pub fn token(&self) -> &str {
        self.session.token()
    }

    pub fn set_token(&mut self, token: &str) {
        self.session.set_token(token);
    }

    /// The text of the most recent failure, for diagnostics.
    pub fn last_error(&self) -> Option<&str> {
        self.session.last_error()
    }

    pub fn set_last_error(&mut self, message: &str) {
        self.session.set_last_error(message);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Check whether the endpoint answers at all.
    ///
    /// Sends no command and no token. Any HTTP answer, whatever its status
    /// or body, counts as reachable; only a transport failure does not.
    #[instrument(skip(self))]
    pub async fn server_status(&self) -> bool {
        if self.session.endpoint().is_empty() {
            return false;
        }
        match self.transport.get(self.session.endpoint()).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Server status check failed: {}", e);
                false
            }
        }
    }

    /// Log in and store the returned token on the session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without sending anything if the endpoint,
    /// email or password is empty. A server-side rejection is returned as
    /// `ApiError::Api` and leaves the client logged out.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        if self.session.endpoint().is_empty() {
            return Err(ApiError::invalid("URL for FogBugz API not specified"));
        }
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::invalid(
                "Credentials for use with the FogBugz API must be specified",
            ));
        }

        let request = CommandRequest::new(LOGON_COMMAND)
            .param("email", email)
            .param("password", password);
        let response = self.send(&request).await?;
        let token = types::decode_token(&response)?;
        self.session.set_token(token);

        info!("Logged in to FogBugz");
        Ok(())
    }

    /// Log off and forget the token.
    ///
    /// The token is cleared even when the `logoff` call fails; the remote
    /// failure is still returned. Logging out while logged out does nothing.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        if self.session.state() == SessionState::Unauthenticated {
            debug!("Already logged out");
            return Ok(());
        }

        let result = self.send(&CommandRequest::new("logoff")).await;
        self.session.clear_token();

        match result {
            Ok(_) => {
                info!("Logged out of FogBugz");
                Ok(())
            }
            Err(e) => {
                warn!("Logoff failed, local session cleared anyway: {}", e);
                Err(e)
            }
        }
    }

    /// Open a new case and return its id.
    ///
    /// `options` are `(name, value)` pairs; friendly names such as
    /// `priority` or `owner` are translated to API fields.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn open_ticket(
        &mut self,
        title: &str,
        description: &str,
        options: &[(&str, &str)],
    ) -> Result<i64> {
        let request = CommandRequest::new("new")
            .param("sTitle", require_text("title", title)?)
            .param("sEvent", require_text("description", description)?)
            .options(options);

        let case_id = self.send_for_case(&request).await?;
        info!(case_id, "Opened case");
        Ok(case_id)
    }

    /// Add an event to an existing case.
    #[instrument(skip(self, content, options))]
    pub async fn update_ticket(
        &mut self,
        case_id: i64,
        content: &str,
        options: &[(&str, &str)],
    ) -> Result<i64> {
        let request = CommandRequest::new("edit")
            .param("ixBug", require_id("caseID", case_id)?)
            .param("sEvent", require_text("content", content)?)
            .options(options);
        self.send_for_case(&request).await
    }

    /// Reopen a resolved or closed case.
    #[instrument(skip(self, options))]
    pub async fn reopen_ticket(&mut self, case_id: i64, options: &[(&str, &str)]) -> Result<i64> {
        let request = CommandRequest::new("reopen")
            .param("ixBug", require_id("caseID", case_id)?)
            .options(options);
        self.send_for_case(&request).await
    }

    #[instrument(skip(self))]
    pub async fn resolve_ticket(&mut self, case_id: i64) -> Result<i64> {
        let request = CommandRequest::new("resolve").param("ixBug", require_id("caseID", case_id)?);
        self.send_for_case(&request).await
    }

    #[instrument(skip(self))]
    pub async fn close_ticket(&mut self, case_id: i64) -> Result<i64> {
        let request = CommandRequest::new("close").param("ixBug", require_id("caseID", case_id)?);
        self.send_for_case(&request).await
    }

    /// Fetch the event history of one case.
    #[instrument(skip(self))]
    pub async fn get_ticket(&mut self, case_id: i64) -> Result<Vec<CaseEvent>> {
        let request = CommandRequest::new("search")
            .param("q", require_id("caseID", case_id)?)
            .param("cols", TICKET_COLUMNS);
        let response = self.send(&request).await?;
        types::decode_case_events(&response)
    }

    /// Describe a case status.
    #[instrument(skip(self))]
    pub async fn get_ticket_status(&mut self, status_id: i64) -> Result<Status> {
        let request =
            CommandRequest::new("viewStatus").param("ixStatus", require_id("statusID", status_id)?);
        let response = self.send(&request).await?;
        types::decode_status(&response)
    }

    /// Areas of a project, keyed by area id.
    #[instrument(skip(self))]
    pub async fn get_all_areas(&mut self, project_id: i64) -> Result<BTreeMap<i64, String>> {
        let request =
            CommandRequest::new("listAreas").param("ixProject", require_id("projectID", project_id)?);
        let response = self.send(&request).await?;
        types::decode_areas(&response)
    }

    #[instrument(skip(self))]
    pub async fn get_all_categories(&mut self) -> Result<BTreeMap<i64, String>> {
        let response = self.send(&CommandRequest::new("listCategories")).await?;
        types::decode_categories(&response)
    }

    #[instrument(skip(self))]
    pub async fn get_all_filters(&mut self) -> Result<Vec<Filter>> {
        let response = self.send(&CommandRequest::new("listFilters")).await?;
        types::decode_filters(&response)
    }

    /// Users keyed by person id.
    #[instrument(skip(self))]
    pub async fn get_all_fogbugz_users(
        &mut self,
        query: PeopleQuery,
    ) -> Result<BTreeMap<i64, Person>> {
        let request = CommandRequest::new("listPeople")
            .flag("fIncludeNormal", query.include_normal)
            .flag("fIncludeVirtual", query.include_virtual)
            .flag("fIncludeCommunity", query.include_community);
        let response = self.send(&request).await?;
        types::decode_people(&response)
    }

    #[instrument(skip(self))]
    pub async fn get_all_priorities(&mut self) -> Result<BTreeMap<i64, Priority>> {
        let response = self.send(&CommandRequest::new("listPriorities")).await?;
        types::decode_priorities(&response)
    }

    #[instrument(skip(self))]
    pub async fn get_project_list(&mut self) -> Result<BTreeMap<i64, Project>> {
        let response = self.send(&CommandRequest::new("listProjects")).await?;
        types::decode_projects(&response)
    }

    /// Switch the user's current filter.
    #[instrument(skip(self))]
    pub async fn set_filter(&mut self, filter_id: i64) -> Result<()> {
        let request = CommandRequest::new("setCurrentFilter")
            .param("sFilter", require_id("filterID", filter_id)?);
        let response = self.send(&request).await?;
        match types::api_error(&response) {
            Some(message) => Err(ApiError::Api(message.to_string())),
            None => Ok(()),
        }
    }

    /// Search cases. An empty query searches the current filter.
    #[instrument(skip(self))]
    pub async fn search(&mut self, query: &str) -> Result<Vec<CaseSummary>> {
        let mut request = CommandRequest::new("search");
        if !query.is_empty() {
            request = request.param("q", query);
        }
        let request = request.param("cols", SEARCH_COLUMNS);

        let response = self.send(&request).await?;
        let cases = types::decode_cases(&response)?;
        debug!("Found {} cases", cases.len());
        Ok(cases)
    }

    /// Send any command and return the parsed response untouched.
    ///
    /// An `<error>` element is recorded as the last error but is not a
    /// failure here; inspect the returned tree.
    pub async fn send_command(&mut self, request: &CommandRequest) -> Result<XmlNode> {
        self.send(request).await
    }

    async fn send_for_case(&mut self, request: &CommandRequest) -> Result<i64> {
        let response = self.send(request).await?;
        types::decode_case_id(&response)
    }

    /// Perform one round trip and interpret the body.
    ///
    /// Transport failures, empty bodies and malformed XML abort the call.
    /// An `<error>` element is recorded and the tree is still returned.
    #[instrument(skip_all, fields(cmd = %request.command()))]
    async fn send(&mut self, request: &CommandRequest) -> Result<XmlNode> {
        let query = request.to_query(Some(self.session.token()))?;
        if self.session.endpoint().is_empty() {
            return Err(ApiError::invalid("URL for FogBugz API not specified"));
        }

        debug!(request = %request.redacted(), "Sending command");
        let url = format!("{}?{}", self.session.endpoint(), query);

        let result = self.transport.get(&url).await;
        let body = match result {
            Ok(body) => body,
            Err(e) => return Err(self.record(e)),
        };

        if body.is_empty() {
            warn!("Empty response body");
            self.session.set_last_error(NO_XML_MESSAGE);
            return Err(ApiError::NoResponse);
        }

        let root = xml::parse(&body).map_err(|e| self.record(e))?;

        if let Some(message) = types::api_error(&root) {
            warn!(error = %message, "FogBugz reported an error");
            self.session.set_last_error(message);
        }

        Ok(root)
    }

    fn record(&mut self, err: ApiError) -> ApiError {
        warn!("Request failed: {}", err);
        self.session.set_last_error(err.to_string());
        err
    }
}

/// Normalize the endpoint by trimming whitespace and trailing slashes.
fn normalize_endpoint(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    if !url.is_empty()
        && !url.starts_with("https://")
        && !url.contains("localhost")
        && !url.contains("127.0.0.1")
    {
        debug!("URL does not use HTTPS: {}", url);
    }

    url.to_string()
}
