//! XML utilities shared by the package and presentation layers.
//!
//! - [`escape`]: character escaping for text and attribute values
//! - [`tree`]: a lossless, mutable markup tree built on `quick-xml`

pub mod escape;
pub mod tree;

pub use escape::{escape_attr, escape_text};
pub use tree::{MarkupError, XmlDocument, XmlElement, XmlNode, local_name};
