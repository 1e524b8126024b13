//! Configuration types for template filling.
//!
//! The defaults reproduce the classic behaviour: every XML part is searched,
//! keys are matched verbatim, and the `{{IMAGE_PLACEHOLDER}}` key replaces
//! the pictures marked `LOGO_PLACEHOLDER` on the first slide.
//!
//! # Examples
//!
//! ```rust
//! use slidefill::{ImagePolicy, PartScope, TemplateOptions, TokenSyntax};
//!
//! // Create with defaults
//! let options = TemplateOptions::default();
//!
//! // Or customize
//! let options = TemplateOptions::new()
//!     .with_scope(PartScope::Slides)
//!     .with_token_syntax(TokenSyntax::Sigil("$".into()))
//!     .with_image_policy(ImagePolicy::Always);
//! ```
use crate::ooxml::opc::PackURI;

/// Default key of the image substitution.
pub const DEFAULT_IMAGE_KEY: &str = "{{IMAGE_PLACEHOLDER}}";
/// Default picture marker matched against `cNvPr` `descr`/`name`.
pub const DEFAULT_IMAGE_MARKER: &str = "LOGO_PLACEHOLDER";
/// Default slide that receives the image substitution.
pub const DEFAULT_IMAGE_SLIDE: &str = "/ppt/slides/slide1.xml";

/// Which parts of the package are searched for text placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartScope {
    /// Every part whose name ends in `.xml`.
    #[default]
    AllXml,
    /// Only slide parts (`.../slides/slide<N>.xml`).
    Slides,
}

impl PartScope {
    pub fn includes(&self, partname: &PackURI) -> bool {
        match self {
            PartScope::AllXml => partname.ext().eq_ignore_ascii_case("xml"),
            PartScope::Slides => is_slide_part(partname),
        }
    }
}

/// How substitution keys become the tokens searched for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenSyntax {
    /// The key is the token (`{{TITLE}}`).
    #[default]
    Verbatim,
    /// The token is the key with a prefix (`$` + `title`).
    Sigil(String),
}

impl TokenSyntax {
    pub fn token_for(&self, key: &str) -> String {
        match self {
            TokenSyntax::Verbatim => key.to_string(),
            TokenSyntax::Sigil(prefix) => format!("{}{}", prefix, key),
        }
    }
}

/// When an image substitution adds its media part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Add the media and relationship even if no picture carries the marker.
    Always,
    /// Skip the image when the target slide has no marked picture, so no
    /// unreferenced media is left in the package.
    #[default]
    WhenReferenced,
}

/// Slide(s) an image substitution applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    /// A single slide; its absence from the package is an error.
    Slide(PackURI),
    /// Every slide with at least one marked picture; each gets its own copy
    /// of the media part.
    EveryMarkedSlide,
}

impl Default for ImageTarget {
    fn default() -> Self {
        ImageTarget::Slide(PackURI::from_membername(DEFAULT_IMAGE_SLIDE))
    }
}

/// Declares a substitution key whose value names an image rather than text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRole {
    /// Substitution key holding the image reference.
    pub key: String,
    /// Marker identifying the pictures to repoint.
    pub marker: String,
    pub target: ImageTarget,
}

impl Default for ImageRole {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_KEY, DEFAULT_IMAGE_MARKER)
    }
}

impl ImageRole {
    /// Role targeting the first slide.
    pub fn new(key: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            marker: marker.into(),
            target: ImageTarget::default(),
        }
    }

    #[inline]
    pub fn with_target(mut self, target: ImageTarget) -> Self {
        self.target = target;
        self
    }

    /// Whether this role applies to `partname`.
    pub fn targets(&self, partname: &PackURI) -> bool {
        match &self.target {
            ImageTarget::Slide(slide) => slide == partname,
            ImageTarget::EveryMarkedSlide => is_slide_part(partname),
        }
    }
}

/// Configuration options for a fill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Parts searched for text placeholders
    pub scope: PartScope,
    /// Key-to-token mapping
    pub token_syntax: TokenSyntax,
    /// Media injection policy for unmatched markers
    pub image_policy: ImagePolicy,
    /// Keys treated as image substitutions; never used as text
    pub image_roles: Vec<ImageRole>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            scope: PartScope::default(),
            token_syntax: TokenSyntax::default(),
            image_policy: ImagePolicy::default(),
            image_roles: vec![ImageRole::default()],
        }
    }
}

impl TemplateOptions {
    /// Create a new `TemplateOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_scope(mut self, scope: PartScope) -> Self {
        self.scope = scope;
        self
    }

    #[inline]
    pub fn with_token_syntax(mut self, syntax: TokenSyntax) -> Self {
        self.token_syntax = syntax;
        self
    }

    #[inline]
    pub fn with_image_policy(mut self, policy: ImagePolicy) -> Self {
        self.image_policy = policy;
        self
    }

    /// Add an image role alongside the existing ones.
    #[inline]
    pub fn with_image_role(mut self, role: ImageRole) -> Self {
        self.image_roles.push(role);
        self
    }

    /// Replace all image roles. An empty list makes every key textual.
    #[inline]
    pub fn with_image_roles(mut self, roles: Vec<ImageRole>) -> Self {
        self.image_roles = roles;
        self
    }

    /// The `$key` slide-only flavour: slides only, `$` sigil, no image roles.
    pub fn slide_text_only() -> Self {
        Self::new()
            .with_scope(PartScope::Slides)
            .with_token_syntax(TokenSyntax::Sigil("$".to_string()))
            .with_image_roles(Vec::new())
    }

    pub(crate) fn is_image_key(&self, key: &str) -> bool {
        self.image_roles.iter().any(|role| role.key == key)
    }
}

/// `.../slides/slide<N>.xml`, whatever the package root folder is called.
pub fn is_slide_part(partname: &PackURI) -> bool {
    let Some(stem) = partname.filename().rsplit_once('.').and_then(|(stem, ext)| {
        ext.eq_ignore_ascii_case("xml").then_some(stem)
    }) else {
        return false;
    };
    partname.base_uri().rsplit('/').next() == Some("slides")
        && stem
            .strip_prefix("slide")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
