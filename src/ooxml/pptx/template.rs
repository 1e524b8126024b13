//! The fill engine.
//!
//! A fill run takes the bytes of a presentation template and a
//! [`Substitutions`] map and produces the bytes of a new presentation:
//!
//! 1. Image substitutions are resolved first. Their target slides must exist
//!    and their images must load, otherwise nothing is produced.
//! 2. Every in-scope XML part is parsed once, rewritten by the
//!    [`PlaceholderRewriter`], and for target slides has its marked pictures
//!    repointed at freshly injected media.
//! 3. Parts that changed are serialized back; every other entry keeps its
//!    original bytes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use slidefill::{Substitutions, Template};
//!
//! let subs = Substitutions::new()
//!     .with("{{TITLE}}", "Quarterly Review")
//!     .with("{{IMAGE_PLACEHOLDER}}", "logo.png");
//!
//! let filled = Template::open("template.pptx")?.fill(&subs)?;
//! println!("{} placeholders replaced", filled.report().replacements);
//! filled.save("review.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::common::xml::XmlDocument;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{PackURI, PhysPkg, Relationships};
use crate::ooxml::pptx::config::{ImagePolicy, ImageRole, ImageTarget, TemplateOptions};
use crate::ooxml::pptx::media::{
    FsMediaSource, LoadedImage, MediaInjector, MediaSource, bind_pictures, count_marked_pictures,
};
use crate::ooxml::pptx::placeholder::PlaceholderRewriter;
use crate::ooxml::pptx::substitution::Substitutions;
use log::{debug, info, warn};
use std::path::Path;

/// Media added for one image substitution on one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReport {
    /// Substitution key of the image role
    pub key: String,
    pub slide: String,
    pub media_part: String,
    pub r_id: String,
    /// Number of marked pictures repointed at the new media
    pub pictures_bound: usize,
}

/// What a fill run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Text placeholder occurrences replaced across all parts
    pub replacements: usize,
    /// Document parts whose content was rewritten, in package order
    pub rewritten_parts: Vec<String>,
    pub media: Vec<MediaReport>,
    /// Image keys that were supplied but injected nowhere
    pub skipped_images: Vec<String>,
}

/// Output of [`Template::fill`].
#[derive(Debug, Clone)]
pub struct Filled {
    bytes: Vec<u8>,
    report: FillReport,
}

impl Filled {
    /// The serialized output package.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn report(&self) -> &FillReport {
        &self.report
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the output package to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

struct ImageRequest<'a> {
    role: &'a ImageRole,
    image: LoadedImage,
    used: bool,
}

/// A presentation template ready to be filled.
pub struct Template {
    pkg: PhysPkg,
    options: TemplateOptions,
    media: Box<dyn MediaSource>,
}

impl Template {
    /// Load a template from the bytes of a `.pptx` file.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_package(PhysPkg::from_bytes(data)?))
    }

    /// Load a template from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_package(PhysPkg::open(path)?))
    }

    /// Wrap an already loaded package. Image values are read from the
    /// filesystem unless another source is set.
    pub fn from_package(pkg: PhysPkg) -> Self {
        Self {
            pkg,
            options: TemplateOptions::default(),
            media: Box::new(FsMediaSource::new()),
        }
    }

    #[inline]
    pub fn with_options(mut self, options: TemplateOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve image substitution values through `source`.
    pub fn with_media_source<S: MediaSource + 'static>(mut self, source: S) -> Self {
        self.media = Box::new(source);
        self
    }

    #[inline]
    pub fn package(&self) -> &PhysPkg {
        &self.pkg
    }

    #[inline]
    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Apply `subs` and serialize the result.
    ///
    /// Fails without producing output if any document part is not
    /// well-formed XML, an image target slide is missing, or an image cannot
    /// be loaded. Keys that occur nowhere are not errors.
    pub fn fill(self, subs: &Substitutions) -> Result<Filled> {
        let Template {
            mut pkg,
            options,
            media,
        } = self;
        let mut report = FillReport::default();

        let mut images = Vec::new();
        for role in &options.image_roles {
            let Some(value) = subs.get(&role.key) else {
                continue;
            };
            if let ImageTarget::Slide(slide) = &role.target
                && !pkg.contains(slide.as_str())
            {
                return Err(OoxmlError::MissingRelationshipTarget(slide.to_string()));
            }
            let image = LoadedImage::load(media.as_ref(), value)?;
            debug!("Loaded {:?} image for {} from '{}'", image.format, role.key, value);
            images.push(ImageRequest {
                role,
                image,
                used: false,
            });
        }

        let rewriter = PlaceholderRewriter::new(
            subs.iter()
                .filter(|(key, _)| !options.is_image_key(key))
                .map(|(key, value)| (options.token_syntax.token_for(key), value)),
        );

        let partnames: Vec<PackURI> = pkg
            .member_names()
            .into_iter()
            .map(PackURI::from_membername)
            .filter(|uri| {
                options.scope.includes(uri) || images.iter().any(|req| req.role.targets(uri))
            })
            .collect();

        let mut injector = MediaInjector::new(&pkg);

        for partname in &partnames {
            let mut doc = XmlDocument::parse(pkg.read(partname.as_str())?).map_err(|source| {
                OoxmlError::MalformedMarkup {
                    part: partname.to_string(),
                    source,
                }
            })?;
            let mut changed = false;

            if options.scope.includes(partname) {
                let replaced = rewriter.rewrite(&mut doc);
                if replaced > 0 {
                    debug!("Replaced {} placeholder(s) in {}", replaced, partname);
                    report.replacements += replaced;
                    changed = true;
                }
            }

            let mut rels: Option<Relationships> = None;
            for req in images.iter_mut().filter(|req| req.role.targets(partname)) {
                let marked = count_marked_pictures(&doc.root, &req.role.marker);
                let inject_unmarked = options.image_policy == ImagePolicy::Always
                    && matches!(req.role.target, ImageTarget::Slide(_));
                if marked == 0 && !inject_unmarked {
                    continue;
                }

                if rels.is_none() {
                    rels = Some(Relationships::load(&pkg, partname)?);
                }
                let Some(list) = rels.as_mut() else {
                    continue;
                };

                let injected = injector.inject(&mut pkg, list, &req.image)?;
                let bound = bind_pictures(&mut doc.root, &req.role.marker, &injected.r_id);
                changed |= bound > 0;
                req.used = true;

                info!(
                    "Injected {} into {} as {} ({} picture(s))",
                    injected.partname, partname, injected.r_id, bound
                );
                report.media.push(MediaReport {
                    key: req.role.key.clone(),
                    slide: partname.to_string(),
                    media_part: injected.partname.to_string(),
                    r_id: injected.r_id,
                    pictures_bound: bound,
                });
            }

            if let Some(list) = &rels
                && list.is_dirty()
            {
                list.store(&mut pkg);
            }
            if changed {
                pkg.write(partname.as_str(), doc.to_bytes());
                report.rewritten_parts.push(partname.to_string());
            }
        }

        for req in images.iter().filter(|req| !req.used) {
            warn!(
                "No picture marked '{}' for {}; image not added",
                req.role.marker, req.role.key
            );
            report.skipped_images.push(req.role.key.clone());
        }

        injector.finish(&mut pkg)?;
        let bytes = pkg.to_bytes()?;

        info!(
            "Filled template: {} replacement(s) in {} part(s), {} media part(s) added",
            report.replacements,
            report.rewritten_parts.len(),
            report.media.len()
        );
        Ok(Filled { bytes, report })
    }
}

/// Fill the template in `template` and return the output package bytes.
///
/// Image values are read from the filesystem; use [`Template`] to supply
/// another [`MediaSource`] or to get the [`FillReport`].
pub fn fill_template(
    template: &[u8],
    subs: &Substitutions,
    options: &TemplateOptions,
) -> Result<Vec<u8>> {
    Template::from_bytes(template)?
        .with_options(options.clone())
        .fill(subs)
        .map(Filled::into_bytes)
}
