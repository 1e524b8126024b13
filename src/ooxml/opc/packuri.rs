//! Part names inside an OPC package.
//!
//! A [`PackURI`] is the absolute, slash-rooted name of a part
//! (`/ppt/slides/slide1.xml`). The zip member name is the same string without
//! the leading slash. Relationship targets are stored relative to the source
//! part's directory, so this type also knows how to go back and forth between
//! absolute and relative forms.

use crate::ooxml::opc::error::{OpcError, Result};

/// Absolute name of a part within a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a PackURI from an absolute name; it must begin with `/`.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a zip member name (`ppt/slides/slide1.xml`).
    ///
    /// Names that already carry the leading slash are accepted as well.
    pub fn from_membername(name: &str) -> Self {
        if name.starts_with('/') {
            PackURI {
                uri: name.to_string(),
            }
        } else {
            PackURI {
                uri: format!("/{}", name),
            }
        }
    }

    /// Resolve a relationship target (`../media/image1.png`) against the
    /// directory of its source part (`/ppt/slides`).
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        if relative_ref.starts_with('/') {
            return Self::new(normalize(relative_ref));
        }
        let joined = if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(normalize(&joined))
    }

    /// Directory portion: `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// File name portion: `slide1.xml` for `/ppt/slides/slide1.xml`.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the leading period; empty if there is none.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Numeric suffix of the file stem: 21 for `/ppt/slides/slide21.xml`.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        atoi_simd::parse_pos::<u32, false>(&stem.as_bytes()[stem.len() - digits..]).ok()
    }

    /// Zip member name: the URI without its leading slash.
    #[inline]
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Reference to this part relative to `base_uri`, as written in a
    /// relationship `Target`.
    ///
    /// `/ppt/media/image1.png` relative to `/ppt/slides` is
    /// `../media/image1.png`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
        parts.extend(std::iter::repeat_n("..", from.len() - common));
        parts.extend(&to[common..]);
        parts.join("/")
    }

    /// Name of the companion relationships part:
    /// `/ppt/slides/_rels/slide1.xml.rels` for `/ppt/slides/slide1.xml`.
    pub fn rels_uri(&self) -> PackURI {
        let base = self.base_uri();
        let uri = if base == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base, self.filename())
        };
        PackURI { uri }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

/// Collapse `.` and `..` segments of a slash-rooted path.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/ppt/slides/slide1.xml").is_ok());
        assert!(PackURI::new("ppt/slides/slide1.xml").is_err());
    }

    #[test]
    fn test_from_membername() {
        let uri = PackURI::from_membername("ppt/slides/slide1.xml");
        assert_eq!(uri.as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(PackURI::from_membername("/ppt/slides/slide1.xml"), uri);
    }

    #[test]
    fn test_components() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide21.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.idx(), Some(21));
        assert_eq!(uri.membername(), "ppt/slides/slide21.xml");

        let top = PackURI::new("/[Content_Types].xml").unwrap();
        assert_eq!(top.base_uri(), "/");
        assert_eq!(top.idx(), None);

        assert_eq!(PackURI::new("/ppt/presentation.xml").unwrap().idx(), None);
        assert_eq!(PackURI::new("/ppt/media/42.png").unwrap().idx(), None);
    }

    #[test]
    fn test_rels_uri() {
        let slide = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(slide.rels_uri().as_str(), "/ppt/slides/_rels/slide1.xml.rels");

        let top = PackURI::new("/presentation.xml").unwrap();
        assert_eq!(top.rels_uri().as_str(), "/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_relative_ref_and_back() {
        let media = PackURI::new("/ppt/media/image3.png").unwrap();
        assert_eq!(media.relative_ref("/ppt/slides"), "../media/image3.png");
        assert_eq!(media.relative_ref("/ppt"), "media/image3.png");
        assert_eq!(media.relative_ref("/"), "ppt/media/image3.png");

        let resolved = PackURI::from_rel_ref("/ppt/slides", "../media/image3.png").unwrap();
        assert_eq!(resolved, media);
        let absolute = PackURI::from_rel_ref("/ppt/slides", "/ppt/media/image3.png").unwrap();
        assert_eq!(absolute, media);
    }
}
