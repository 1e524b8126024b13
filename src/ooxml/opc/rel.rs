//! Relationship lists of OPC parts.
//!
//! Every part that references other parts owns a companion `.rels` part. This
//! module reads that list, allocates new relationship IDs and appends entries
//! while leaving the existing ones exactly as they were.

use crate::common::xml::{MarkupError, XmlDocument, XmlElement, XmlNode};
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::phys_pkg::PhysPkg;
use smallvec::SmallVec;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference, relative to the source part's directory for internal
    /// relationships
    target_ref: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Numeric suffix of an `rId<N>` identifier.
    pub fn r_id_number(&self) -> Option<u64> {
        parse_r_id(&self.r_id)
    }
}

/// Relationship list owned by one source part.
///
/// The backing markup tree is kept so that attributes this crate does not know
/// about survive a load/store cycle untouched. Entries are only ever appended;
/// the new ID is always one past the highest `rId<N>` in the list.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Part that owns this list
    source: PackURI,

    /// The `.rels` document as loaded, or a fresh empty one
    doc: XmlDocument,

    /// Parsed view of the `Relationship` elements, in document order
    rels: SmallVec<[Relationship; 8]>,

    /// Whether entries were appended since loading
    dirty: bool,
}

impl Relationships {
    /// Create an empty list for `source`.
    pub fn new(source: PackURI) -> Self {
        let root = XmlElement::new("Relationships").with_attr("xmlns", namespace::OPC_RELATIONSHIPS);
        Self {
            source,
            doc: XmlDocument::new(root),
            rels: SmallVec::new(),
            dirty: false,
        }
    }

    /// Parse the content of a `.rels` part belonging to `source`.
    pub fn from_xml(source: PackURI, xml: &[u8]) -> std::result::Result<Self, MarkupError> {
        let doc = XmlDocument::parse(xml)?;
        let rels = doc
            .root
            .child_elements()
            .filter(|el| el.local_name() == "Relationship")
            .filter_map(|el| {
                Some(Relationship {
                    r_id: el.attr("Id")?.to_string(),
                    reltype: el.attr("Type")?.to_string(),
                    target_ref: el.attr("Target")?.to_string(),
                    is_external: el.attr("TargetMode") == Some(target_mode::EXTERNAL),
                })
            })
            .collect();

        Ok(Self {
            source,
            doc,
            rels,
            dirty: false,
        })
    }

    /// Load the relationship list of `source` from the package.
    ///
    /// A part without a `.rels` companion gets an empty list; that is a valid
    /// starting state, not an error.
    pub fn load(pkg: &PhysPkg, source: &PackURI) -> Result<Self> {
        let rels_uri = source.rels_uri();
        if !pkg.contains(rels_uri.as_str()) {
            return Ok(Self::new(source.clone()));
        }
        let xml = pkg.read(rels_uri.as_str())?;
        Self::from_xml(source.clone(), xml).map_err(|source| OpcError::MalformedPart {
            part: rels_uri.to_string(),
            source,
        })
    }

    /// The part that owns this list.
    #[inline]
    pub fn source(&self) -> &PackURI {
        &self.source
    }

    /// Name of the `.rels` part backing this list.
    #[inline]
    pub fn rels_uri(&self) -> PackURI {
        self.source.rels_uri()
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id() == r_id)
    }

    /// Iterate over relationships in document order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Whether entries were appended since the list was loaded.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The ID the next call to [`add`](Self::add) will assign.
    ///
    /// One greater than the highest numeric suffix among `rId<N>` IDs, or
    /// `rId1` for an empty list. Gaps are never filled, so an ID that was
    /// removed by an earlier editor is not handed out again. Only when the
    /// highest suffix is `u64::MAX` does allocation fall back to the lowest
    /// unused number.
    pub fn next_r_id(&self) -> String {
        let max = self
            .rels
            .iter()
            .filter_map(Relationship::r_id_number)
            .max()
            .unwrap_or(0);
        let n = match max.checked_add(1) {
            Some(n) => n,
            None => self.lowest_unused_r_id(),
        };
        format!("rId{}", n)
    }

    /// Smallest `N >= 1` with no `rId<N>` in the list; the list is far shorter
    /// than the number space, so one exists.
    fn lowest_unused_r_id(&self) -> u64 {
        let mut used: Vec<u64> = self.rels.iter().filter_map(Relationship::r_id_number).collect();
        used.sort_unstable();
        used.dedup();
        let mut candidate = 1;
        for n in used {
            if n > candidate {
                break;
            }
            if n == candidate {
                candidate += 1;
            }
        }
        candidate
    }

    /// Allocate a fresh ID and append an internal relationship in one step.
    ///
    /// Returns the new ID. Existing entries are never modified.
    pub fn add(&mut self, reltype: &str, target_ref: &str) -> String {
        let r_id = self.next_r_id();

        let element = XmlElement::new(self.relationship_element_name())
            .with_attr("Id", r_id.as_str())
            .with_attr("Type", reltype)
            .with_attr("Target", target_ref);
        self.doc.root.push(XmlNode::Element(element));

        self.rels.push(Relationship {
            r_id: r_id.clone(),
            reltype: reltype.to_string(),
            target_ref: target_ref.to_string(),
            is_external: false,
        });
        self.dirty = true;

        r_id
    }

    /// Serialize the list as `.rels` part content.
    pub fn to_xml(&self) -> Vec<u8> {
        self.doc.to_bytes()
    }

    /// Write the list back into the package under its `.rels` name.
    pub fn store(&self, pkg: &mut PhysPkg) {
        pkg.write(self.rels_uri().as_str(), self.to_xml());
    }

    /// Appended entries reuse the prefix of existing ones, if the part uses one.
    fn relationship_element_name(&self) -> String {
        self.doc
            .root
            .child_elements()
            .find(|el| el.local_name() == "Relationship")
            .map(|el| el.name().to_string())
            .unwrap_or_else(|| match self.doc.root.name().split_once(':') {
                Some((prefix, _)) => format!("{}:Relationship", prefix),
                None => "Relationship".to_string(),
            })
    }
}

/// Parse the numeric part of an `rId<N>` identifier.
#[inline]
fn parse_r_id(r_id: &str) -> Option<u64> {
    let digits = r_id.strip_prefix("rId")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    atoi_simd::parse_pos::<u64, false>(digits.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as RT;
    use proptest::prelude::*;

    const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/></Relationships>"#;

    fn slide_uri() -> PackURI {
        PackURI::new("/ppt/slides/slide1.xml").unwrap()
    }

    #[test]
    fn test_parse_existing_list() {
        let rels = Relationships::from_xml(slide_uri(), SLIDE_RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        let layout = rels.get("rId1").unwrap();
        assert_eq!(layout.reltype(), RT::SLIDE_LAYOUT);
        assert_eq!(layout.target_ref(), "../slideLayouts/slideLayout1.xml");
        assert!(!layout.is_external());
        assert!(rels.get("rId4").unwrap().is_external());
    }

    #[test]
    fn test_next_r_id_is_max_plus_one() {
        let rels = Relationships::from_xml(slide_uri(), SLIDE_RELS.as_bytes()).unwrap();
        // rId2 and rId3 are gaps and must not be reused
        assert_eq!(rels.next_r_id(), "rId5");
    }

    fn list_with_ids(ids: &[&str]) -> Relationships {
        let mut rels = Relationships::new(slide_uri());
        for id in ids {
            let element = XmlElement::new("Relationship")
                .with_attr("Id", *id)
                .with_attr("Type", "t")
                .with_attr("Target", "x.xml");
            rels.doc.root.push(XmlNode::Element(element));
        }
        Relationships::from_xml(slide_uri(), &rels.to_xml()).unwrap()
    }

    #[test]
    fn test_next_r_id_past_u32_range() {
        let mut rels = list_with_ids(&["rId1", "rId4294967295"]);
        assert_eq!(rels.add(RT::IMAGE, "../media/image1.png"), "rId4294967296");
        assert_eq!(rels.add(RT::IMAGE, "../media/image2.png"), "rId4294967297");
    }

    #[test]
    fn test_next_r_id_at_u64_ceiling_stays_unique() {
        let mut rels = list_with_ids(&["rId1", "rId2", "rId4", "rId18446744073709551615"]);
        assert_eq!(rels.add(RT::IMAGE, "../media/image1.png"), "rId3");
        assert_eq!(rels.add(RT::IMAGE, "../media/image2.png"), "rId5");

        let ids: Vec<&str> = rels.iter().map(|r| r.r_id()).collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_empty_list_starts_at_one() {
        let mut rels = Relationships::new(slide_uri());
        assert!(rels.is_empty());
        assert_eq!(rels.next_r_id(), "rId1");
        assert_eq!(rels.add(RT::IMAGE, "../media/image1.png"), "rId1");
        assert_eq!(rels.add(RT::IMAGE, "../media/image2.png"), "rId2");
    }

    #[test]
    fn test_foreign_ids_are_ignored_for_allocation() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="R7f3a" Type="t" Target="x.xml"/><Relationship Id="rId2" Type="t" Target="y.xml"/></Relationships>"#;
        let rels = Relationships::from_xml(slide_uri(), xml.as_bytes()).unwrap();
        assert_eq!(rels.next_r_id(), "rId3");
    }

    #[test]
    fn test_add_keeps_existing_entries_verbatim() {
        let mut rels = Relationships::from_xml(slide_uri(), SLIDE_RELS.as_bytes()).unwrap();
        let r_id = rels.add(RT::IMAGE, "../media/image1.png");
        assert_eq!(r_id, "rId5");
        assert!(rels.is_dirty());

        let reparsed = Relationships::from_xml(slide_uri(), &rels.to_xml()).unwrap();
        let ids: Vec<&str> = reparsed.iter().map(|r| r.r_id()).collect();
        assert_eq!(ids, vec!["rId1", "rId4", "rId5"]);
        assert!(reparsed.get("rId4").unwrap().is_external());

        let xml = String::from_utf8(rels.to_xml()).unwrap();
        assert!(xml.contains(
            r#"<Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>"#
        ));
        assert!(xml.contains(r#"TargetMode="External""#));
    }

    #[test]
    fn test_load_without_rels_part() {
        let pkg = PhysPkg::new();
        let rels = Relationships::load(&pkg, &slide_uri()).unwrap();
        assert!(rels.is_empty());
        assert!(!rels.is_dirty());
        assert_eq!(rels.rels_uri().as_str(), "/ppt/slides/_rels/slide1.xml.rels");
    }

    #[test]
    fn test_load_and_store() {
        let mut pkg = PhysPkg::new();
        pkg.write("ppt/slides/_rels/slide1.xml.rels", SLIDE_RELS.as_bytes().to_vec());

        let mut rels = Relationships::load(&pkg, &slide_uri()).unwrap();
        rels.add(RT::IMAGE, "../media/image1.png");
        rels.store(&mut pkg);

        let reloaded = Relationships::load(&pkg, &slide_uri()).unwrap();
        assert_eq!(reloaded.len(), 3);
        let added = reloaded.get("rId5").unwrap();
        assert_eq!(added.reltype(), RT::IMAGE);
        assert_eq!(added.target_ref(), "../media/image1.png");
    }

    #[test]
    fn test_load_malformed_rels() {
        let mut pkg = PhysPkg::new();
        pkg.write("ppt/slides/_rels/slide1.xml.rels", b"<Relationships>".to_vec());
        assert!(matches!(
            Relationships::load(&pkg, &slide_uri()),
            Err(OpcError::MalformedPart { .. })
        ));
    }

    #[test]
    fn test_parse_r_id() {
        assert_eq!(parse_r_id("rId12"), Some(12));
        assert_eq!(parse_r_id("rId"), None);
        assert_eq!(parse_r_id("rIdx"), None);
        assert_eq!(parse_r_id("RID3"), None);
        assert_eq!(parse_r_id("rId+3"), None);
        assert_eq!(parse_r_id("rId4294967296"), Some(4_294_967_296));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_allocated_ids_strictly_increase(
            existing in proptest::collection::vec(
                prop_oneof![1u64..500, (u64::from(u32::MAX) - 8)..=(u64::from(u32::MAX) + 8)],
                0..12,
            ),
            additions in 1usize..8,
        ) {
            let ids: Vec<String> = existing.iter().map(|n| format!("rId{}", n)).collect();
            let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let mut rels = list_with_ids(&id_refs);

            let mut previous = existing.iter().copied().max().unwrap_or(0);
            for i in 0..additions {
                let r_id = rels.add(RT::IMAGE, &format!("../media/image{}.png", i));
                let n = parse_r_id(&r_id).unwrap();
                prop_assert!(n > previous);
                previous = n;
            }
            prop_assert_eq!(rels.len(), existing.len() + additions);
        }
    }
}
