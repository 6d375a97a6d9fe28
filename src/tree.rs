//! Generic markup tree adapter.
//!
//! Report loaders never see the underlying markup parser; they walk an
//! owned tree of nodes with attributes, named children, and text. The tree
//! is built from XML (strict) or HTML (lenient) input using `quick-xml`'s
//! event reader.

use crate::error::{ReportError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One element in a parsed document.
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    text: Option<String>,
}

impl Node {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by name, or `None` when the attribute is missing.
    /// Truly-missing data is always distinguishable from present-but-empty.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Direct children with the given tag, in document order.
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children regardless of tag.
    pub fn all_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Element text, or `None` when the element held no text at all.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Depth-first traversal of this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    fn push_text(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(chunk);
            }
            None => self.text = Some(chunk.to_string()),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A fully parsed input document.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
}

// Elements that HTML closes implicitly; treated as empty in lenient mode.
const HTML_VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "input", "link", "meta", "area", "base", "col", "wbr",
];

impl Document {
    /// Parse strict XML.
    pub fn parse_xml(content: &str, path: &str) -> Result<Self> {
        Self::parse(content, path, false)
    }

    /// Parse HTML leniently: unmatched end tags are tolerated and void
    /// elements do not open a scope.
    pub fn parse_html(content: &str, path: &str) -> Result<Self> {
        Self::parse(content, path, true)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    fn parse(content: &str, path: &str, lenient: bool) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        let config = reader.config_mut();
        config.trim_text(true);
        if lenient {
            config.check_end_names = false;
        }

        let malformed = |message: String| ReportError::MalformedDocument {
            path: path.to_string(),
            message,
        };

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        let mut attach = |stack: &mut Vec<Node>, root: &mut Option<Node>, node: Node| {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => {
                    if root.is_none() {
                        *root = Some(node);
                    }
                }
            }
        };

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let node = Self::open_node(&start, lenient);
                    if lenient && HTML_VOID_ELEMENTS.contains(&node.tag.as_str()) {
                        attach(&mut stack, &mut root, node);
                    } else {
                        stack.push(node);
                    }
                }
                Ok(Event::Empty(start)) => {
                    attach(&mut stack, &mut root, Self::open_node(&start, lenient));
                }
                Ok(Event::End(end)) => {
                    let mut tag = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    if lenient {
                        // HTML tag names are case-insensitive.
                        tag.make_ascii_lowercase();
                    }
                    if lenient {
                        // Drop stray end tags; close through implicitly
                        // closed scopes when a matching open exists.
                        if !stack.iter().any(|n| n.tag == tag) {
                            continue;
                        }
                        while let Some(node) = stack.pop() {
                            let done = node.tag == tag;
                            attach(&mut stack, &mut root, node);
                            if done {
                                break;
                            }
                        }
                    } else {
                        let node = stack
                            .pop()
                            .ok_or_else(|| malformed(format!("unexpected end tag: {tag}")))?;
                        attach(&mut stack, &mut root, node);
                    }
                }
                Ok(Event::Text(text)) => {
                    let chunk = match text.unescape() {
                        Ok(chunk) => chunk.into_owned(),
                        Err(_) if lenient => String::from_utf8_lossy(text.as_ref()).into_owned(),
                        Err(e) => return Err(malformed(e.to_string())),
                    };
                    if let Some(current) = stack.last_mut() {
                        current.push_text(chunk.trim());
                    }
                }
                Ok(Event::CData(cdata)) => {
                    let chunk = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                    if let Some(current) = stack.last_mut() {
                        current.push_text(chunk.trim());
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(_) if lenient => break,
                Err(e) => return Err(malformed(e.to_string())),
            }
        }

        if !lenient && !stack.is_empty() {
            return Err(malformed("unexpected end of document".to_string()));
        }
        // Leftover open elements in lenient mode still belong in the tree.
        while let Some(node) = stack.pop() {
            attach(&mut stack, &mut root, node);
        }

        root.map(|root| Self { root })
            .ok_or_else(|| malformed("no root element".to_string()))
    }

    fn open_node(start: &quick_xml::events::BytesStart<'_>, lenient: bool) -> Node {
        let mut tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        if lenient {
            tag.make_ascii_lowercase();
        }
        let mut attributes = Vec::new();
        for attr in start.attributes().with_checks(false).flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            attributes.push((key, value));
        }
        Node {
            tag,
            attributes,
            children: Vec::new(),
            text: None,
        }
    }
}
