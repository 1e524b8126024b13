//! `[Content_Types].xml` maintenance.
//!
//! Every part in an OPC package must resolve to a content type, either through
//! an `Override` for its exact name or a `Default` for its extension. A media
//! part added without a matching `Default` makes Office report the file as
//! damaged, so new extensions are registered here.

use crate::common::xml::{XmlDocument, XmlElement, XmlNode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::CONTENT_TYPES_URI;
use crate::ooxml::opc::phys_pkg::PhysPkg;

/// Editable view of a package's content type map.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    doc: XmlDocument,
    dirty: bool,
}

impl ContentTypes {
    /// Load `[Content_Types].xml` from the package.
    ///
    /// Returns `Ok(None)` when the package has no content types part.
    pub fn load(pkg: &PhysPkg) -> Result<Option<Self>> {
        if !pkg.contains(CONTENT_TYPES_URI) {
            return Ok(None);
        }
        let xml = pkg.read(CONTENT_TYPES_URI)?;
        let doc = XmlDocument::parse(xml).map_err(|source| OpcError::MalformedPart {
            part: CONTENT_TYPES_URI.to_string(),
            source,
        })?;
        Ok(Some(Self { doc, dirty: false }))
    }

    /// Default content type registered for an extension (case-insensitive).
    pub fn default_for(&self, ext: &str) -> Option<&str> {
        self.entries("Default")
            .find(|el| el.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .and_then(|el| el.attr("ContentType"))
    }

    /// Register a `Default` for `ext` unless one already exists.
    ///
    /// Returns `true` if the map was changed. New defaults go after the last
    /// existing `Default`, since the schema lists them before overrides.
    pub fn ensure_default(&mut self, ext: &str, content_type: &str) -> bool {
        if self.default_for(ext).is_some() {
            return false;
        }

        let name = match self.doc.root.name().split_once(':') {
            Some((prefix, _)) => format!("{}:Default", prefix),
            None => "Default".to_string(),
        };
        let element = XmlElement::new(name)
            .with_attr("Extension", ext.to_ascii_lowercase())
            .with_attr("ContentType", content_type);

        let children = &mut self.doc.root.children;
        let insert_at = children
            .iter()
            .rposition(|node| node.as_element().is_some_and(|el| el.local_name() == "Default"))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        children.insert(insert_at, XmlNode::Element(element));

        self.dirty = true;
        true
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the map back into the package if it was changed.
    pub fn store(&self, pkg: &mut PhysPkg) {
        if self.dirty {
            pkg.write(CONTENT_TYPES_URI, self.doc.to_bytes());
        }
    }

    fn entries<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.doc
            .root
            .child_elements()
            .filter(move |el| el.local_name() == local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as CT;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#;

    fn package() -> PhysPkg {
        let mut pkg = PhysPkg::new();
        pkg.write(CONTENT_TYPES_URI, CONTENT_TYPES.as_bytes().to_vec());
        pkg
    }

    #[test]
    fn test_default_lookup() {
        let types = ContentTypes::load(&package()).unwrap().unwrap();
        assert_eq!(types.default_for("rels"), Some(CT::OPC_RELATIONSHIPS));
        assert_eq!(types.default_for("XML"), Some("application/xml"));
        assert_eq!(types.default_for("png"), None);
        assert!(!types.is_dirty());
    }

    #[test]
    fn test_ensure_default_inserts_once() {
        let mut pkg = package();
        let mut types = ContentTypes::load(&pkg).unwrap().unwrap();
        assert!(types.ensure_default("png", CT::PNG));
        assert!(!types.ensure_default("PNG", CT::PNG));
        types.store(&mut pkg);

        let xml = pkg.read_string(CONTENT_TYPES_URI).unwrap();
        let png = xml.find(r#"<Default Extension="png" ContentType="image/png"/>"#).unwrap();
        let first_override = xml.find("<Override").unwrap();
        assert!(png < first_override);

        let reloaded = ContentTypes::load(&pkg).unwrap().unwrap();
        assert_eq!(reloaded.default_for("png"), Some(CT::PNG));
    }

    #[test]
    fn test_existing_default_leaves_part_untouched() {
        let mut pkg = package();
        let mut types = ContentTypes::load(&pkg).unwrap().unwrap();
        assert!(!types.ensure_default("xml", "application/xml"));
        types.store(&mut pkg);
        assert_eq!(pkg.read_string(CONTENT_TYPES_URI).unwrap(), CONTENT_TYPES);
    }

    #[test]
    fn test_missing_part() {
        assert!(ContentTypes::load(&PhysPkg::new()).unwrap().is_none());
    }
}
