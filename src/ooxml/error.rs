//! Error types for template filling.

use crate::common::xml::MarkupError;
use crate::ooxml::opc::error::OpcError;
use thiserror::Error;

/// Result type for OOXML operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for OOXML operations.
///
/// Every variant is fatal for a fill run: no output package is produced.
/// Placeholders that do not occur in the template and picture markers that
/// match nothing are not errors.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Package-level error; a missing entry is [`OpcError::PartNotFound`]
    #[error("OPC error: {0}")]
    Opc(OpcError),

    /// A document part does not parse as well-formed XML
    #[error("Malformed markup in {part}: {source}")]
    MalformedMarkup {
        part: String,
        #[source]
        source: MarkupError,
    },

    /// An image substitution names a slide the package does not contain
    #[error("Missing relationship target: {0}")]
    MissingRelationshipTarget(String),

    /// The image for an image substitution could not be loaded
    #[error("Cannot load media '{value}': {source}")]
    MediaUnavailable {
        value: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OoxmlError {
    /// Whether this is the "requested package entry absent" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OoxmlError::Opc(OpcError::PartNotFound(_)))
    }
}

impl From<OpcError> for OoxmlError {
    fn from(err: OpcError) -> Self {
        match err {
            // Relationship and content type parts are document parts too.
            OpcError::MalformedPart { part, source } => {
                OoxmlError::MalformedMarkup { part, source }
            },
            other => OoxmlError::Opc(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    #[test]
    fn test_not_found_classification() {
        let err: OoxmlError = OpcError::PartNotFound("ppt/slides/slide3.xml".into()).into();
        assert!(err.is_not_found());
        assert!(!OoxmlError::MissingRelationshipTarget("/ppt/slides/slide1.xml".into()).is_not_found());
    }

    #[test]
    fn test_malformed_rels_maps_to_malformed_markup() {
        let source = XmlDocument::parse(b"<Relationships>").unwrap_err();
        let err: OoxmlError = OpcError::MalformedPart {
            part: "/ppt/slides/_rels/slide1.xml.rels".into(),
            source,
        }
        .into();
        match err {
            OoxmlError::MalformedMarkup { part, .. } => {
                assert_eq!(part, "/ppt/slides/_rels/slide1.xml.rels")
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
