//! Open Packaging Conventions (OPC) support.
//!
//! The pieces of the OPC model a template filler needs:
//!
//! - [`PhysPkg`]: in-memory ZIP container with read/replace/add by name
//! - [`PackURI`]: part names and relative relationship targets
//! - [`Relationships`]: per-part relationship lists with ID allocation
//! - [`ContentTypes`]: `[Content_Types].xml` defaults for new media

pub mod constants;
pub mod content_types;
pub mod error;
pub mod packuri;
pub mod phys_pkg;
pub mod rel;

// Re-export commonly used types
pub use content_types::ContentTypes;
pub use error::OpcError;
pub use packuri::PackURI;
pub use phys_pkg::PhysPkg;
pub use rel::{Relationship, Relationships};
