//! PowerPoint (.pptx) template filling.
//!
//! A template is an ordinary presentation whose text contains placeholder
//! tokens such as `{{TITLE}}`, and whose pictures may be marked (through their
//! alternative text or name) as stand-ins for images supplied at fill time.
//!
//! - [`Substitutions`]: ordered key/value map supplied by the caller
//! - [`TemplateOptions`]: scope, token syntax and image roles
//! - [`PlaceholderRewriter`]: token replacement inside one parsed part
//! - [`MediaInjector`]: new media parts, relationships and content types
//! - [`Template`]: the fill engine tying these together
//!
//! # Example
//!
//! ```rust,no_run
//! use slidefill::ooxml::pptx::{Substitutions, TemplateOptions, fill_template};
//!
//! let template = std::fs::read("template.pptx")?;
//! let subs = Substitutions::from([("$name", "Ada"), ("$date", "2026-10-19")]);
//! let output = fill_template(&template, &subs, &TemplateOptions::default())?;
//! std::fs::write("filled.pptx", output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod format;
pub mod media;
pub mod placeholder;
pub mod substitution;
pub mod template;

pub use config::{ImagePolicy, ImageRole, ImageTarget, PartScope, TemplateOptions, TokenSyntax};
pub use format::ImageFormat;
pub use media::{FsMediaSource, MediaInjector, MediaSource, MemoryMediaSource};
pub use placeholder::PlaceholderRewriter;
pub use substitution::Substitutions;
pub use template::{FillReport, Filled, MediaReport, Template, fill_template};
