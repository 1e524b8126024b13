//! Office Open XML (OOXML) support.
//!
//! Two layers:
//!
//! 1. **OPC Layer** (`opc`): the ZIP container, part names, relationships
//!    and content types
//! 2. **`pptx`**: presentation template filling on top of the OPC layer

pub mod error;
pub mod opc;
pub mod pptx;

pub use error::{OoxmlError, Result};
