//! Slidefill - fill PowerPoint templates with text and images
//!
//! A template is a regular `.pptx` file. Text placeholders such as
//! `{{TITLE}}` are replaced wherever they appear in the package's XML parts,
//! and pictures marked with a placeholder description can be swapped for a
//! supplied image. Everything the fill run does not touch is carried over
//! byte for byte.
//!
//! # Features
//!
//! - **Text substitution**: literal, case-sensitive tokens in text and attribute values
//! - **Multi-line values**: one presentation paragraph per line, formatting kept
//! - **Image substitution**: new media part, relationship and content type per image
//! - **Lossless round trip**: parts without matches keep their original bytes
//!
//! # Example
//!
//! ```no_run
//! use slidefill::{Substitutions, Template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let subs = Substitutions::new()
//!     .with("{{TITLE}}", "Quarterly Review")
//!     .with("{{AGENDA}}", "Numbers\nOutlook\nQuestions")
//!     .with("{{IMAGE_PLACEHOLDER}}", "assets/logo.png");
//!
//! let filled = Template::open("template.pptx")?.fill(&subs)?;
//! for media in &filled.report().media {
//!     println!("{} -> {} ({})", media.key, media.media_part, media.r_id);
//! }
//! filled.save("review.pptx")?;
//! # Ok(())
//! # }
//! ```

/// Shared XML tree and escaping helpers
pub mod common;

/// OOXML packaging and presentation template filling
pub mod ooxml;

// Re-export commonly used types for convenience
pub use ooxml::error::{OoxmlError, Result};
pub use ooxml::pptx::{
    FillReport, Filled, ImagePolicy, ImageRole, ImageTarget, MediaSource, MemoryMediaSource,
    PartScope, Substitutions, Template, TemplateOptions, TokenSyntax, fill_template,
};
