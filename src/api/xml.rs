//! A small navigable tree over the XML documents FogBugz returns.
//!
//! The API wraps every payload in a `<response>` root and uses CDATA for
//! most text, so the tree keeps only what callers need: element names,
//! attributes, children and the concatenated text content.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::{ApiError, Result};

/// One element of a parsed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// The element's tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
    /// Text and CDATA content directly inside this element.
    pub text: String,
}

impl XmlNode {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The first child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// The value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The text content of this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Look up a field by name.
    ///
    /// FogBugz reports some fields as child elements and others as
    /// attributes, depending on the command. The child element wins.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(XmlNode::text)
            .or_else(|| self.attr(name))
    }
}

/// Parse a response body into its root element.
///
/// Fails with `MalformedResponse` unless the body is a single well-formed
/// element tree.
pub fn parse(body: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(body);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(start) => {
                ensure_single_root(&root)?;
                stack.push(open_element(&start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&root)?;
                let node = open_element(&start)?;
                attach(node, &mut stack, &mut root);
            }
            Event::End(_) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| ApiError::MalformedResponse("unexpected closing tag".into()))?;
                // Indentation between child elements is not content.
                if !node.children.is_empty() && node.text.trim().is_empty() {
                    node.text.clear();
                }
                attach(node, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(&reader, e))?;
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(ApiError::MalformedResponse(
                            "text outside of the root element".into(),
                        ))
                    }
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ApiError::MalformedResponse(format!(
            "unclosed element <{}>",
            stack.last().map(|n| n.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| ApiError::MalformedResponse("document has no root element".into()))
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        node.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(node)
}

fn attach(node: XmlNode, stack: &mut [XmlNode], root: &mut Option<XmlNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

fn ensure_single_root(root: &Option<XmlNode>) -> Result<()> {
    if root.is_some() {
        return Err(ApiError::MalformedResponse(
            "more than one root element".into(),
        ));
    }
    Ok(())
}

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> ApiError {
    ApiError::MalformedResponse(format!(
        "{} at position {}",
        err,
        reader.buffer_position()
    ))
}
