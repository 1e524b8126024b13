//! Error types for OPC package operations

use crate::common::xml::MarkupError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Part is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("Malformed part {part}: {source}")]
    MalformedPart {
        part: String,
        #[source]
        source: MarkupError,
    },

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpcError>;
