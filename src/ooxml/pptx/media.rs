//! Image media injection for picture placeholders.
//!
//! An image substitution adds the image bytes as a new media part, links it
//! from the slide through a fresh image relationship, and points every
//! marked picture's `blip` at that relationship.

use crate::common::xml::XmlElement;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{namespace, relationship_type as RT};
use crate::ooxml::opc::{ContentTypes, PackURI, PhysPkg, Relationships};
use crate::ooxml::pptx::format::ImageFormat;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Resolves the value of an image substitution to image bytes.
///
/// The default implementation, [`FsMediaSource`], treats the value as a file
/// path.
pub trait MediaSource {
    fn load(&self, value: &str) -> std::io::Result<Vec<u8>>;
}

/// Loads image values as paths on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsMediaSource {
    root: Option<PathBuf>,
}

impl FsMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` instead of the working directory.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }
}

impl MediaSource for FsMediaSource {
    fn load(&self, value: &str) -> std::io::Result<Vec<u8>> {
        match &self.root {
            Some(root) => std::fs::read(root.join(value)),
            None => std::fs::read(value),
        }
    }
}

/// Serves image bytes registered up front under their substitution values.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaSource {
    items: HashMap<String, Vec<u8>>,
}

impl MemoryMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.items.insert(value.into(), data.into());
        self
    }

    #[inline]
    pub fn with(mut self, value: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(value, data);
        self
    }
}

impl MediaSource for MemoryMediaSource {
    fn load(&self, value: &str) -> std::io::Result<Vec<u8>> {
        self.items.get(value).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no media registered for '{}'", value),
            )
        })
    }
}

/// An image loaded from a [`MediaSource`] and ready to inject.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl LoadedImage {
    /// Load `value` through `source` and determine its format.
    pub fn load(source: &dyn MediaSource, value: &str) -> Result<Self> {
        let data = source
            .load(value)
            .map_err(|source| OoxmlError::MediaUnavailable {
                value: value.to_string(),
                source,
            })?;
        let format = ImageFormat::resolve(value, &data).ok_or_else(|| OoxmlError::MediaUnavailable {
            value: value.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unrecognized image format",
            ),
        })?;
        Ok(Self { data, format })
    }
}

/// Outcome of one injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedMedia {
    /// The new media part.
    pub partname: PackURI,
    /// Relationship ID allocated in the referencing part's list.
    pub r_id: String,
}

/// Adds media parts to a package without clobbering existing ones.
///
/// New parts are named `<media dir>/image<N>.<ext>` where `N` continues after
/// the highest number already used in the package. Content type defaults for
/// new extensions are collected and written by [`finish`](Self::finish).
#[derive(Debug)]
pub struct MediaInjector {
    next_index: u64,
    extensions: BTreeMap<&'static str, &'static str>,
}

impl MediaInjector {
    pub fn new(pkg: &PhysPkg) -> Self {
        let max = pkg
            .member_names()
            .into_iter()
            .filter(|name| name.contains("/media/"))
            .filter_map(|name| PackURI::from_membername(name).idx())
            .max()
            .unwrap_or(0);
        Self {
            next_index: u64::from(max) + 1,
            extensions: BTreeMap::new(),
        }
    }

    /// Add `image` as a new media part referenced from `rels.source()`.
    ///
    /// The relationship is appended to `rels` but not stored; the caller
    /// writes the list back once it is done with the part.
    pub fn inject(
        &mut self,
        pkg: &mut PhysPkg,
        rels: &mut Relationships,
        image: &LoadedImage,
    ) -> Result<InjectedMedia> {
        let source = rels.source().clone();
        let media_dir = PackURI::from_rel_ref(source.base_uri(), "../media")?;

        // Wrapping restarts at 1; a package has finitely many members, so the
        // search always reaches a free name.
        let partname = loop {
            let index = self.next_index;
            self.next_index = index.checked_add(1).unwrap_or(1);
            let candidate = PackURI::new(format!(
                "{}/image{}.{}",
                media_dir.as_str().trim_end_matches('/'),
                index,
                image.format.extension()
            ))?;
            if !pkg.contains(candidate.as_str()) {
                break candidate;
            }
        };

        pkg.write(partname.as_str(), image.data.as_slice());
        let r_id = rels.add(RT::IMAGE, &partname.relative_ref(source.base_uri()));
        self.extensions
            .insert(image.format.extension(), image.format.mime_type());

        debug!("Added {} as {} of {}", partname, r_id, source);
        Ok(InjectedMedia { partname, r_id })
    }

    /// Register content type defaults for every extension injected so far.
    pub fn finish(self, pkg: &mut PhysPkg) -> Result<()> {
        if self.extensions.is_empty() {
            return Ok(());
        }
        let Some(mut types) = ContentTypes::load(pkg)? else {
            warn!("Package has no content types part; new media left unregistered");
            return Ok(());
        };
        for (ext, content_type) in &self.extensions {
            types.ensure_default(ext, content_type);
        }
        types.store(pkg);
        Ok(())
    }
}

/// Whether a `*:pic` element carries `marker` as its description or name.
fn is_marked_picture(el: &XmlElement, marker: &str) -> bool {
    el.local_name() == "pic"
        && el.find("cNvPr").is_some_and(|props| {
            props.attr("descr") == Some(marker) || props.attr("name") == Some(marker)
        })
}

/// Number of pictures in the tree marked with `marker`.
pub fn count_marked_pictures(root: &XmlElement, marker: &str) -> usize {
    let own = usize::from(is_marked_picture(root, marker));
    own + root
        .child_elements()
        .map(|el| count_marked_pictures(el, marker))
        .sum::<usize>()
}

/// Point every marked picture's image reference at `r_id`.
///
/// Returns the number of pictures updated.
pub fn bind_pictures(root: &mut XmlElement, marker: &str, r_id: &str) -> usize {
    let mut bound = 0;
    let mut added_prefix = false;
    root.walk_mut(&mut |el| {
        if !is_marked_picture(el, marker) {
            return;
        }
        el.walk_mut(&mut |inner| {
            if inner.local_name() == "blip" {
                added_prefix |= inner.attr_local("embed").is_none();
                inner.set_attr_local("embed", "r:embed", r_id);
            }
        });
        bound += 1;
    });

    // `r:embed` written from scratch needs the prefix bound somewhere.
    if added_prefix && root.attr("xmlns:r").is_none() {
        root.set_attr("xmlns:r", namespace::OFC_RELATIONSHIPS);
    }
    bound
}
