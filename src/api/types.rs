//! FogBugz response shapes.
//!
//! Each command answers with a `<response>` element holding a
//! command-specific payload. The decoders here navigate that payload and
//! coerce fields, failing with `UnexpectedShape` when a required field is
//! missing.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::{ApiError, Result};
use super::xml::XmlNode;

/// The payload a command is expected to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Token,
    Case,
    Cases,
    Areas,
    Categories,
    Filters,
    People,
    Priorities,
    Projects,
    Status,
}

impl ResponseShape {
    /// The element that carries the payload inside `<response>`.
    pub fn element(self) -> &'static str {
        match self {
            ResponseShape::Token => "token",
            ResponseShape::Case => "case",
            ResponseShape::Cases => "cases",
            ResponseShape::Areas => "areas",
            ResponseShape::Categories => "categories",
            ResponseShape::Filters => "filters",
            ResponseShape::People => "people",
            ResponseShape::Priorities => "priorities",
            ResponseShape::Projects => "projects",
            ResponseShape::Status => "status",
        }
    }

    /// Find the payload element.
    ///
    /// A reported API error takes precedence over a missing payload, since
    /// the error is why the payload is absent.
    pub fn locate(self, root: &XmlNode) -> Result<&XmlNode> {
        if let Some(message) = api_error(root) {
            return Err(ApiError::Api(message.to_string()));
        }
        root.child(self.element())
            .ok_or_else(|| ApiError::shape(format!("response has no <{}> element", self.element())))
    }

    /// Find the payload element of a listing, tolerating its absence.
    pub fn locate_list(self, root: &XmlNode) -> Result<Option<&XmlNode>> {
        if let Some(message) = api_error(root) {
            return Err(ApiError::Api(message.to_string()));
        }
        Ok(root.child(self.element()))
    }
}

/// The message of a top-level `<error>` element, if any.
pub fn api_error(root: &XmlNode) -> Option<&str> {
    root.child("error").map(|e| e.text().trim())
}

/// A required text field.
fn text_field<'a>(node: &'a XmlNode, name: &str) -> Result<&'a str> {
    node.field(name)
        .ok_or_else(|| ApiError::shape(format!("<{}> has no {}", node.name, name)))
}

/// A required integer field.
fn int_field(node: &XmlNode, name: &str) -> Result<i64> {
    let raw = text_field(node, name)?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::shape(format!("<{}> {} is not a number: '{}'", node.name, name, raw)))
}

/// An optional integer field; missing or unparsable values become `None`.
fn opt_int_field(node: &XmlNode, name: &str) -> Option<i64> {
    node.field(name).and_then(|v| v.trim().parse().ok())
}

fn opt_text_field(node: &XmlNode, name: &str) -> Option<String> {
    node.field(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// FogBugz booleans are the strings `true` and `false`.
fn bool_field(node: &XmlNode, name: &str) -> bool {
    node.field(name).map(|v| v.trim() == "true").unwrap_or(false)
}

/// The session token returned by `logon`.
pub fn decode_token(root: &XmlNode) -> Result<String> {
    let token = ResponseShape::Token.locate(root)?.text().trim();
    if token.is_empty() {
        return Err(ApiError::shape("logon returned an empty token"));
    }
    Ok(token.to_string())
}

/// The case id echoed back by `new`, `edit`, `reopen`, `resolve`, `close`.
pub fn decode_case_id(root: &XmlNode) -> Result<i64> {
    let case = ResponseShape::Case.locate(root)?;
    int_field(case, "ixBug")
}

/// A case returned by `search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub id: i64,
    pub title: String,
    pub is_open: bool,
    pub status_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub assigned_to: Option<String>,
}

impl CaseSummary {
    fn decode(node: &XmlNode) -> Result<Self> {
        Ok(Self {
            id: int_field(node, "ixBug")?,
            title: node.field("sTitle").unwrap_or_default().to_string(),
            is_open: bool_field(node, "fOpen"),
            status_id: opt_int_field(node, "ixStatus"),
            assigned_to_id: opt_int_field(node, "ixPersonAssignedTo"),
            assigned_to: opt_text_field(node, "sPersonAssignedTo"),
        })
    }
}

/// Cases from a `search` response. No `<cases>` means no matches.
pub fn decode_cases(root: &XmlNode) -> Result<Vec<CaseSummary>> {
    let Some(cases) = ResponseShape::Cases.locate_list(root)? else {
        return Ok(Vec::new());
    };
    cases.children_named("case").map(CaseSummary::decode).collect()
}

/// One entry in a case's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseEvent {
    pub id: i64,
    pub verb: String,
    pub person: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
}

impl CaseEvent {
    fn decode(node: &XmlNode) -> Result<Self> {
        Ok(Self {
            id: int_field(node, "ixBugEvent")?,
            verb: node.field("sVerb").unwrap_or_default().to_string(),
            person: opt_text_field(node, "sPerson"),
            date: opt_text_field(node, "dt"),
            description: opt_text_field(node, "evtDescription"),
            text: opt_text_field(node, "s"),
        })
    }
}

/// The events of the single case a `search` by id found.
pub fn decode_case_events(root: &XmlNode) -> Result<Vec<CaseEvent>> {
    let cases = ResponseShape::Cases.locate(root)?;
    let case = cases
        .child("case")
        .ok_or_else(|| ApiError::shape("no case matched the requested id"))?;
    let events = case
        .child("events")
        .ok_or_else(|| ApiError::shape("case has no <events> element"))?;
    events.children_named("event").map(CaseEvent::decode).collect()
}

/// A case status from `viewStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub is_work_done: bool,
    pub is_resolved: bool,
    pub is_duplicate: bool,
    pub is_deleted: bool,
    pub order: Option<i64>,
}

pub fn decode_status(root: &XmlNode) -> Result<Status> {
    let node = ResponseShape::Status.locate(root)?;
    Ok(Status {
        id: int_field(node, "ixStatus")?,
        name: text_field(node, "sStatus")?.to_string(),
        category_id: opt_int_field(node, "ixCategory"),
        is_work_done: bool_field(node, "fWorkDone"),
        is_resolved: bool_field(node, "fResolved"),
        is_duplicate: bool_field(node, "fDuplicate"),
        is_deleted: bool_field(node, "fDeleted"),
        order: opt_int_field(node, "iOrder"),
    })
}

/// Decode an `id -> name` listing such as areas or categories.
fn decode_named_ids(
    root: &XmlNode,
    shape: ResponseShape,
    item: &str,
    id_field: &str,
    name_field: &str,
) -> Result<BTreeMap<i64, String>> {
    let Some(list) = shape.locate_list(root)? else {
        return Ok(BTreeMap::new());
    };
    list.children_named(item)
        .map(|node| -> Result<(i64, String)> {
            Ok((int_field(node, id_field)?, text_field(node, name_field)?.to_string()))
        })
        .collect()
}

/// Areas of a project, keyed by area id.
pub fn decode_areas(root: &XmlNode) -> Result<BTreeMap<i64, String>> {
    decode_named_ids(root, ResponseShape::Areas, "area", "ixArea", "sArea")
}

/// Case categories, keyed by category id.
pub fn decode_categories(root: &XmlNode) -> Result<BTreeMap<i64, String>> {
    decode_named_ids(
        root,
        ResponseShape::Categories,
        "category",
        "ixCategory",
        "sCategory",
    )
}

/// A saved or built-in search filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    /// Display name (the element text).
    pub name: String,
    /// `builtin`, `saved` or `shared`.
    pub kind: String,
    /// The value to pass to `setCurrentFilter`.
    pub id: String,
}

pub fn decode_filters(root: &XmlNode) -> Result<Vec<Filter>> {
    let Some(list) = ResponseShape::Filters.locate_list(root)? else {
        return Ok(Vec::new());
    };
    list.children_named("filter")
        .map(|node| -> Result<Filter> {
            Ok(Filter {
                name: node.text().to_string(),
                kind: node.attr("type").unwrap_or_default().to_string(),
                id: node
                    .attr("sFilter")
                    .ok_or_else(|| ApiError::shape("<filter> has no sFilter"))?
                    .to_string(),
            })
        })
        .collect()
}

/// A FogBugz user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub full_name: String,
    pub email: String,
}

pub fn decode_people(root: &XmlNode) -> Result<BTreeMap<i64, Person>> {
    let Some(list) = ResponseShape::People.locate_list(root)? else {
        return Ok(BTreeMap::new());
    };
    list.children_named("person")
        .map(|node| -> Result<(i64, Person)> {
            let person = Person {
                full_name: text_field(node, "sFullName")?.to_string(),
                email: node.field("sEmail").unwrap_or_default().to_string(),
            };
            Ok((int_field(node, "ixPerson")?, person))
        })
        .collect()
}

/// A case priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Priority {
    pub name: String,
    pub is_default: bool,
}

pub fn decode_priorities(root: &XmlNode) -> Result<BTreeMap<i64, Priority>> {
    let Some(list) = ResponseShape::Priorities.locate_list(root)? else {
        return Ok(BTreeMap::new());
    };
    list.children_named("priority")
        .map(|node| -> Result<(i64, Priority)> {
            let priority = Priority {
                name: text_field(node, "sPriority")?.to_string(),
                is_default: bool_field(node, "fDefault"),
            };
            Ok((int_field(node, "ixPriority")?, priority))
        })
        .collect()
}

/// A project and its primary contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub owner_id: Option<i64>,
}

pub fn decode_projects(root: &XmlNode) -> Result<BTreeMap<i64, Project>> {
    let Some(list) = ResponseShape::Projects.locate_list(root)? else {
        return Ok(BTreeMap::new());
    };
    list.children_named("project")
        .map(|node| -> Result<(i64, Project)> {
            let project = Project {
                name: text_field(node, "sProject")?.to_string(),
                owner_id: opt_int_field(node, "ixPersonOwner"),
            };
            Ok((int_field(node, "ixProject")?, project))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    #[test]
    fn test_decode_case_id_from_attribute() {
        let root = parse(r#"<response><case ixBug="42" operations="edit"/></response>"#).unwrap();
        assert_eq!(decode_case_id(&root).unwrap(), 42);
    }

    #[test]
    fn test_decode_case_id_from_child() {
        let root = parse("<response><case><ixBug>17</ixBug></case></response>").unwrap();
        assert_eq!(decode_case_id(&root).unwrap(), 17);
    }

    #[test]
    fn test_decode_case_id_reports_api_error() {
        let root = parse("<response><error code=\"7\">Case 9 is closed</error></response>").unwrap();
        match decode_case_id(&root) {
            Err(ApiError::Api(msg)) => assert_eq!(msg, "Case 9 is closed"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_case_id_missing_case() {
        let root = parse("<response></response>").unwrap();
        assert!(matches!(
            decode_case_id(&root),
            Err(ApiError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_decode_case_id_non_numeric() {
        let root = parse(r#"<response><case ixBug="abc"/></response>"#).unwrap();
        assert!(matches!(
            decode_case_id(&root),
            Err(ApiError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_decode_token() {
        let root = parse("<response><token><![CDATA[24dsg34lok43un23]]></token></response>").unwrap();
        assert_eq!(decode_token(&root).unwrap(), "24dsg34lok43un23");

        let root = parse("<response><token></token></response>").unwrap();
        assert!(matches!(decode_token(&root), Err(ApiError::UnexpectedShape(_))));
    }

    #[test]
    fn test_decode_areas_from_attributes() {
        let root = parse(
            r#"<response><areas>
                <area ixArea="1"><sArea>UI</sArea></area>
                <area ixArea="2"><sArea>Backend</sArea></area>
            </areas></response>"#,
        )
        .unwrap();

        let areas = decode_areas(&root).unwrap();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[&1], "UI");
        assert_eq!(areas[&2], "Backend");
    }

    #[test]
    fn test_decode_areas_empty_and_absent() {
        let root = parse("<response><areas/></response>").unwrap();
        assert!(decode_areas(&root).unwrap().is_empty());

        let root = parse("<response/>").unwrap();
        assert!(decode_areas(&root).unwrap().is_empty());
    }

    #[test]
    fn test_listing_with_error_fails() {
        let root = parse("<response><error>Not logged in</error></response>").unwrap();
        assert!(matches!(decode_categories(&root), Err(ApiError::Api(_))));
        assert!(matches!(decode_projects(&root), Err(ApiError::Api(_))));
    }

    #[test]
    fn test_decode_categories() {
        let root = parse(
            "<response><categories>\
                <category><ixCategory>1</ixCategory><sCategory>Bug</sCategory></category>\
                <category><ixCategory>2</ixCategory><sCategory>Feature</sCategory></category>\
            </categories></response>",
        )
        .unwrap();
        let categories = decode_categories(&root).unwrap();
        assert_eq!(categories.get(&2).map(String::as_str), Some("Feature"));
    }

    #[test]
    fn test_decode_filters() {
        let root = parse(
            r#"<response><filters>
                <filter type="builtin" sFilter="ez349">My Cases</filter>
                <filter type="saved" sFilter="304" status="current">Open bugs</filter>
            </filters></response>"#,
        )
        .unwrap();

        let filters = decode_filters(&root).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name, "My Cases");
        assert_eq!(filters[0].kind, "builtin");
        assert_eq!(filters[1].id, "304");
    }

    #[test]
    fn test_decode_people() {
        let root = parse(
            "<response><people><person>\
                <ixPerson>11</ixPerson><sFullName>Old MacDonald</sFullName>\
                <sEmail>grandpa@oldmacdonald.com</sEmail>\
            </person></people></response>",
        )
        .unwrap();

        let people = decode_people(&root).unwrap();
        assert_eq!(people[&11].full_name, "Old MacDonald");
        assert_eq!(people[&11].email, "grandpa@oldmacdonald.com");
    }

    #[test]
    fn test_decode_priorities_default_flag() {
        let root = parse(
            "<response><priorities>\
                <priority><ixPriority>1</ixPriority><sPriority>Must Fix</sPriority><fDefault>false</fDefault></priority>\
                <priority><ixPriority>3</ixPriority><sPriority>Normal</sPriority><fDefault>true</fDefault></priority>\
            </priorities></response>",
        )
        .unwrap();

        let priorities = decode_priorities(&root).unwrap();
        assert!(!priorities[&1].is_default);
        assert!(priorities[&3].is_default);
        assert_eq!(priorities[&3].name, "Normal");
    }

    #[test]
    fn test_decode_projects() {
        let root = parse(
            "<response><projects><project>\
                <ixProject>5</ixProject><sProject>Inbox</sProject><ixPersonOwner>2</ixPersonOwner>\
            </project></projects></response>",
        )
        .unwrap();

        let projects = decode_projects(&root).unwrap();
        assert_eq!(projects[&5].name, "Inbox");
        assert_eq!(projects[&5].owner_id, Some(2));
    }

    #[test]
    fn test_decode_project_missing_id() {
        let root = parse(
            "<response><projects><project><sProject>Inbox</sProject></project></projects></response>",
        )
        .unwrap();
        assert!(matches!(
            decode_projects(&root),
            Err(ApiError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_decode_cases() {
        let root = parse(
            r#"<response><cases count="1">
                <case ixBug="123" operations="edit,assign">
                    <fOpen>true</fOpen>
                    <ixStatus>1</ixStatus>
                    <ixPersonAssignedTo>4</ixPersonAssignedTo>
                    <sPersonAssignedTo><![CDATA[Jane Doe]]></sPersonAssignedTo>
                    <sTitle><![CDATA[Printer on fire]]></sTitle>
                </case>
            </cases></response>"#,
        )
        .unwrap();

        let cases = decode_cases(&root).unwrap();
        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.id, 123);
        assert!(case.is_open);
        assert_eq!(case.status_id, Some(1));
        assert_eq!(case.assigned_to.as_deref(), Some("Jane Doe"));
        assert_eq!(case.title, "Printer on fire");
    }

    #[test]
    fn test_decode_case_events() {
        let root = parse(
            r#"<response><cases count="1"><case ixBug="9"><events>
                <event ixBugEvent="101" ixBug="9">
                    <sVerb>Opened</sVerb><sPerson>Jane Doe</sPerson>
                    <dt>2024-01-01T00:00:00Z</dt><s>It broke</s>
                    <evtDescription>Opened by Jane Doe</evtDescription>
                </event>
                <event ixBugEvent="102" ixBug="9"><sVerb>Resolved</sVerb></event>
            </events></case></cases></response>"#,
        )
        .unwrap();

        let events = decode_case_events(&root).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, 101);
        assert_eq!(events[0].text.as_deref(), Some("It broke"));
        assert_eq!(events[1].verb, "Resolved");
        assert_eq!(events[1].person, None);
    }

    #[test]
    fn test_decode_case_events_no_match() {
        let root = parse(r#"<response><cases count="0"/></response>"#).unwrap();
        assert!(matches!(
            decode_case_events(&root),
            Err(ApiError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_decode_status() {
        let root = parse(
            "<response><status>\
                <ixStatus>2</ixStatus><sStatus>Resolved (Fixed)</sStatus>\
                <ixCategory>1</ixCategory><fWorkDone>true</fWorkDone>\
                <fResolved>true</fResolved><fDuplicate>false</fDuplicate>\
                <fDeleted>false</fDeleted><iOrder>0</iOrder>\
            </status></response>",
        )
        .unwrap();

        let status = decode_status(&root).unwrap();
        assert_eq!(status.id, 2);
        assert_eq!(status.name, "Resolved (Fixed)");
        assert!(status.is_resolved);
        assert!(!status.is_duplicate);
        assert_eq!(status.order, Some(0));
    }
}
