//! Mutable markup tree with lossless round-trip.
//!
//! Document parts are parsed into a small tagged-variant tree ([`XmlNode`]) that
//! keeps qualified names exactly as written: `p:sp`, `r:embed` and `xmlns:a` are
//! plain strings, never resolved against namespace URIs. That way a part can be
//! edited and written back without any consumer-visible prefix churn.
//!
//! What is preserved on an untouched tree:
//!
//! - element and attribute names, including prefixes and namespace declarations
//! - attribute order
//! - text content (whitespace included), CDATA sections, comments,
//!   processing instructions and the doctype
//! - the XML declaration
//!
//! What is not: quote style, entity spelling (`&#60;` comes back as `&lt;`) and
//! `<a></a>` vs `<a/>` for childless elements.

use crate::common::xml::escape::{escape_attr, escape_text};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt;

/// Error raised when bytes are not well-formed markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at byte {position})")]
pub struct MarkupError {
    /// Human readable description of the problem
    pub message: String,
    /// Byte offset in the input where the problem was detected
    pub position: u64,
}

impl MarkupError {
    fn new(message: impl Into<String>, position: u64) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Strip a namespace prefix from a qualified name (`a:blip` → `blip`).
#[inline]
pub fn local_name(qname: &str) -> &str {
    match qname.rfind(':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}

/// A node in the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Character data, entity references already decoded
    Text(String),
    CData(String),
    Comment(String),
    /// Raw content between `<?` and `?>`
    ProcessingInstruction(String),
    /// Raw content between `<!DOCTYPE` and `>`
    DocType(String),
}

impl XmlNode {
    /// Borrow the element if this node is one.
    #[inline]
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// An element with its qualified name, ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Copy of this element's name and attributes without any children.
    pub fn clone_empty(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Qualified name as written in the source (`p:pic`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the namespace prefix (`pic`).
    #[inline]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// All attributes in document order.
    #[inline]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Mutable access to attribute values; keys stay fixed.
    pub fn attribute_values_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.attributes.iter_mut().map(|(_, value)| value)
    }

    /// Look up an attribute by its exact qualified name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up the first attribute whose local name matches, ignoring the prefix.
    ///
    /// Namespace declarations (`xmlns:*`) never match.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| !is_namespace_decl(k) && local_name(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Set the first attribute with the given local name (any prefix), or add
    /// `fallback_key` when none exists. Returns the key that was written.
    pub fn set_attr_local(&mut self, local: &str, fallback_key: &str, value: &str) -> String {
        if let Some((key, existing)) = self
            .attributes
            .iter_mut()
            .find(|(k, _)| !is_namespace_decl(k) && local_name(k) == local)
        {
            *existing = value.to_string();
            return key.clone();
        }
        self.attributes
            .push((fallback_key.to_string(), value.to_string()));
        fallback_key.to_string()
    }

    /// Append a child node.
    pub fn push(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    /// Iterate over direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First direct child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    /// First element (self included, depth-first) with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        if self.local_name() == local {
            return Some(self);
        }
        self.child_elements().find_map(|el| el.find(local))
    }

    /// Visit this element and every descendant element depth-first, parents
    /// before children.
    pub fn walk_mut<F: FnMut(&mut XmlElement)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            if let XmlNode::Element(el) = child {
                el.walk_mut(f);
            }
        }
    }

    /// Concatenated text and CDATA content of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Element(el) => el.collect_text(out),
                _ => {},
            }
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

#[inline]
fn is_namespace_decl(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(el) => el.write_to(out),
        XmlNode::Text(t) => out.push_str(&escape_text(t)),
        XmlNode::CData(t) => {
            out.push_str("<![CDATA[");
            // A literal terminator has to be split across two sections.
            out.push_str(&t.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        },
        XmlNode::Comment(t) => {
            out.push_str("<!--");
            out.push_str(t);
            out.push_str("-->");
        },
        XmlNode::ProcessingInstruction(t) => {
            out.push_str("<?");
            out.push_str(t);
            out.push_str("?>");
        },
        XmlNode::DocType(t) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(t);
            out.push('>');
        },
    }
}

/// The `<?xml ...?>` declaration of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: Some("yes".to_string()),
        }
    }
}

/// A parsed markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<XmlDeclaration>,
    /// Comments, processing instructions, doctype and whitespace before the root
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    /// Comments, processing instructions and whitespace after the root
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Wrap a root element with a standard OOXML declaration.
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            prolog: vec![XmlNode::Text("\n".to_string())],
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a document from raw bytes.
    ///
    /// Fails with [`MarkupError`] if the bytes are not UTF-8 or not well-formed.
    pub fn parse(bytes: &[u8]) -> Result<Self, MarkupError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| MarkupError::new(format!("invalid UTF-8: {}", e), e.valid_up_to() as u64))?;
        // A UTF-8 byte order mark is not part of the markup.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        TreeBuilder::default().build(text)
    }

    /// Serialize the document to a string.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(4096);
        if let Some(decl) = &self.declaration {
            out.push_str("<?xml version=\"");
            out.push_str(&escape_attr(&decl.version));
            out.push('"');
            if let Some(encoding) = &decl.encoding {
                out.push_str(" encoding=\"");
                out.push_str(&escape_attr(encoding));
                out.push('"');
            }
            if let Some(standalone) = &decl.standalone {
                out.push_str(" standalone=\"");
                out.push_str(&escape_attr(standalone));
                out.push('"');
            }
            out.push_str("?>");
        }
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            write_node(node, &mut out);
        }
        out
    }

    /// Serialize the document to UTF-8 bytes.
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

/// Streaming builder turning `quick-xml` events into an [`XmlDocument`].
#[derive(Default)]
struct TreeBuilder {
    declaration: Option<XmlDeclaration>,
    prolog: Vec<XmlNode>,
    epilog: Vec<XmlNode>,
    root: Option<XmlElement>,
    stack: Vec<XmlElement>,
    /// Raw (still escaped) character data awaiting a flush
    pending_text: String,
}

impl TreeBuilder {
    fn build(mut self, text: &str) -> Result<XmlDocument, MarkupError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|e| MarkupError::new(e.to_string(), position))?;

            match event {
                Event::Text(ref t) => {
                    let raw = std::str::from_utf8(t)
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.pending_text.push_str(raw);
                },
                Event::GeneralRef(ref r) => {
                    let name = std::str::from_utf8(r)
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.pending_text.push('&');
                    self.pending_text.push_str(name);
                    self.pending_text.push(';');
                },
                Event::Start(ref e) => {
                    self.flush_text(position)?;
                    let element = start_element(e, position)?;
                    self.stack.push(element);
                },
                Event::Empty(ref e) => {
                    self.flush_text(position)?;
                    let element = start_element(e, position)?;
                    self.attach(XmlNode::Element(element), position)?;
                },
                Event::End(_) => {
                    self.flush_text(position)?;
                    let element = self
                        .stack
                        .pop()
                        .ok_or_else(|| MarkupError::new("unexpected closing tag", position))?;
                    self.attach(XmlNode::Element(element), position)?;
                },
                Event::CData(ref c) => {
                    self.flush_text(position)?;
                    let content = String::from_utf8(c.to_vec())
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.attach(XmlNode::CData(content), position)?;
                },
                Event::Comment(ref c) => {
                    self.flush_text(position)?;
                    let content = String::from_utf8(c.to_vec())
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.attach(XmlNode::Comment(content), position)?;
                },
                Event::PI(ref pi) => {
                    self.flush_text(position)?;
                    let content = String::from_utf8(pi.to_vec())
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.attach(XmlNode::ProcessingInstruction(content), position)?;
                },
                Event::DocType(ref d) => {
                    self.flush_text(position)?;
                    let content = String::from_utf8(d.to_vec())
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    self.attach(XmlNode::DocType(content), position)?;
                },
                Event::Decl(ref d) => {
                    if self.root.is_some() || !self.stack.is_empty() || self.declaration.is_some() {
                        return Err(MarkupError::new("misplaced XML declaration", position));
                    }
                    let version = d
                        .version()
                        .map_err(|e| MarkupError::new(e.to_string(), position))?;
                    let encoding = match d.encoding() {
                        Some(enc) => Some(
                            enc.map_err(|e| MarkupError::new(e.to_string(), position))?
                                .into_owned(),
                        ),
                        None => None,
                    };
                    let standalone = match d.standalone() {
                        Some(sa) => Some(
                            sa.map_err(|e| MarkupError::new(e.to_string(), position))?
                                .into_owned(),
                        ),
                        None => None,
                    };
                    self.declaration = Some(XmlDeclaration {
                        version: bytes_to_string(&version, position)?,
                        encoding: encoding
                            .map(|b| bytes_to_string(&b, position))
                            .transpose()?,
                        standalone: standalone
                            .map(|b| bytes_to_string(&b, position))
                            .transpose()?,
                    });
                },
                Event::Eof => {
                    self.flush_text(position)?;
                    break;
                },
                #[allow(unreachable_patterns)]
                _ => {},
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(MarkupError::new(
                format!("unclosed element <{}>", open.name()),
                text.len() as u64,
            ));
        }
        let root = self
            .root
            .ok_or_else(|| MarkupError::new("document has no root element", 0))?;

        Ok(XmlDocument {
            declaration: self.declaration,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }

    fn flush_text(&mut self, position: u64) -> Result<(), MarkupError> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.pending_text);
        let decoded = quick_xml::escape::unescape(&raw)
            .map_err(|e| MarkupError::new(e.to_string(), position))?
            .into_owned();
        self.attach(XmlNode::Text(decoded), position)
    }

    /// Attach a completed node to the open element, or to the document level.
    fn attach(&mut self, node: XmlNode, position: u64) -> Result<(), MarkupError> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }

        match node {
            XmlNode::Element(element) => {
                if self.root.is_some() {
                    return Err(MarkupError::new("multiple root elements", position));
                }
                self.root = Some(element);
            },
            XmlNode::Text(ref t) if !t.trim().is_empty() => {
                return Err(MarkupError::new("text outside the root element", position));
            },
            XmlNode::CData(_) => {
                return Err(MarkupError::new("CDATA outside the root element", position));
            },
            other => {
                if self.root.is_some() {
                    self.epilog.push(other);
                } else {
                    self.prolog.push(other);
                }
            },
        }
        Ok(())
    }
}

fn start_element(e: &BytesStart<'_>, position: u64) -> Result<XmlElement, MarkupError> {
    let name = bytes_to_string(e.name().as_ref(), position)?;
    let mut element = XmlElement::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|err| MarkupError::new(err.to_string(), position))?;
        let key = bytes_to_string(attr.key.as_ref(), position)?;
        let value = attr
            .unescape_value()
            .map_err(|err| MarkupError::new(err.to_string(), position))?
            .into_owned();
        if element.attr(&key).is_some() {
            return Err(MarkupError::new(
                format!("duplicate attribute '{}' on <{}>", key, element.name()),
                position,
            ));
        }
        element.attributes.push((key, value));
    }

    Ok(element)
}

#[inline]
fn bytes_to_string(bytes: &[u8], position: u64) -> Result<String, MarkupError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| MarkupError::new(e.to_string(), position))
}
