//! In-memory physical package (the ZIP container).
//!
//! [`PhysPkg`] loads every member of the archive once, lets callers read,
//! replace and add members by name, and writes a fresh archive on demand.
//! Nothing touches the filesystem between [`PhysPkg::from_bytes`] and
//! [`PhysPkg::to_bytes`].

use crate::ooxml::opc::error::{OpcError, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// A single archive member.
#[derive(Debug, Clone)]
struct PhysEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

/// Random-access, mutable view over the members of an OPC package.
///
/// Member order and per-member compression are kept as loaded; new members are
/// appended. Names may be given either as zip member names
/// (`ppt/slides/slide1.xml`) or as pack URIs (`/ppt/slides/slide1.xml`).
#[derive(Debug, Clone, Default)]
pub struct PhysPkg {
    entries: Vec<PhysEntry>,
    /// Member name → index into `entries`
    index: HashMap<String, usize>,
}

impl PhysPkg {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package from the bytes of a ZIP archive.
    ///
    /// Directory members are skipped; they carry no content in OPC packages.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut pkg = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let compression = match file.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            // The header size is untrusted; it only seeds the buffer.
            let hint = file.size().min(MAX_PREALLOC) as usize;
            let mut data = Vec::with_capacity(hint);
            file.read_to_end(&mut data)?;
            pkg.insert(name, data, compression);
        }

        Ok(pkg)
    }

    /// Load a package from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Number of members in the package.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Member names in archive order.
    pub fn member_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Check whether a member exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(member_key(name))
    }

    /// Borrow the bytes of a member.
    ///
    /// Fails with [`OpcError::PartNotFound`] if there is no such member.
    pub fn read(&self, name: &str) -> Result<&[u8]> {
        self.index
            .get(member_key(name))
            .map(|&i| self.entries[i].data.as_slice())
            .ok_or_else(|| OpcError::PartNotFound(member_key(name).to_string()))
    }

    /// Read a member as UTF-8 text.
    pub fn read_string(&self, name: &str) -> Result<&str> {
        let data = self.read(name)?;
        std::str::from_utf8(data).map_err(|_| OpcError::NotUtf8(member_key(name).to_string()))
    }

    /// Replace the bytes of a member, or append a new member if absent.
    ///
    /// Replaced members keep their position and compression method.
    pub fn write(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let key = member_key(name);
        match self.index.get(key) {
            Some(&i) => self.entries[i].data = data.into(),
            None => {
                let compression = compression_for(key);
                self.insert(key.to_string(), data.into(), compression);
            },
        }
    }

    /// Serialize the package into a new ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(entry.compression);
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn insert(&mut self, name: String, data: Vec<u8>, compression: CompressionMethod) {
        // A duplicated member name in the source archive: the last one wins,
        // matching how most zip readers resolve it.
        if let Some(&i) = self.index.get(&name) {
            self.entries[i].data = data;
            self.entries[i].compression = compression;
            return;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(PhysEntry {
            name,
            data,
            compression,
        });
    }
}

/// Upper bound on the buffer reserved up front for one member.
const MAX_PREALLOC: u64 = 1 << 20;

#[inline]
fn member_key(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Already-compressed media gains nothing from deflate.
fn compression_for(name: &str) -> CompressionMethod {
    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "mp3" | "mp4" | "m4a" => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut pkg = PhysPkg::new();
        pkg.write("/[Content_Types].xml", b"<Types/>".to_vec());
        pkg.write("ppt/slides/slide1.xml", b"<p:sld/>".to_vec());
        pkg.write("ppt/media/image1.png", vec![0x89, 0x50, 0x4E, 0x47]);

        let bytes = pkg.to_bytes().unwrap();
        let reloaded = PhysPkg::from_bytes(&bytes).unwrap();

        assert_eq!(
            reloaded.member_names(),
            vec!["[Content_Types].xml", "ppt/slides/slide1.xml", "ppt/media/image1.png"]
        );
        assert_eq!(reloaded.read("ppt/slides/slide1.xml").unwrap(), b"<p:sld/>");
        assert_eq!(
            reloaded.read("/ppt/media/image1.png").unwrap(),
            &[0x89, 0x50, 0x4E, 0x47]
        );
    }

    #[test]
    fn test_write_replaces_in_place() {
        let mut pkg = PhysPkg::new();
        pkg.write("a.xml", b"<a/>".to_vec());
        pkg.write("b.xml", b"<b/>".to_vec());
        pkg.write("/a.xml", b"<a x=\"1\"/>".to_vec());

        assert_eq!(pkg.len(), 2);
        assert_eq!(pkg.member_names(), vec!["a.xml", "b.xml"]);
        assert_eq!(pkg.read_string("a.xml").unwrap(), "<a x=\"1\"/>");
    }

    #[test]
    fn test_missing_member() {
        let pkg = PhysPkg::new();
        assert!(!pkg.contains("ppt/slides/slide9.xml"));
        match pkg.read("/ppt/slides/slide9.xml") {
            Err(OpcError::PartNotFound(name)) => assert_eq!(name, "ppt/slides/slide9.xml"),
            other => panic!("expected PartNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            PhysPkg::from_bytes(b"definitely not a zip archive"),
            Err(OpcError::ZipError(_))
        ));
    }

    /// Overwrite the uncompressed size in every local and central header.
    fn forge_uncompressed_size(bytes: &mut [u8], size: u32) {
        const LOCAL: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
        const CENTRAL: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let offset = match &bytes[i..i + 4] {
                sig if sig == LOCAL => Some(22),
                sig if sig == CENTRAL => Some(24),
                _ => None,
            };
            if let Some(offset) = offset {
                bytes[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        let mut pkg = PhysPkg::new();
        pkg.write("ppt/media/image1.png", vec![0x89, 0x50, 0x4E, 0x47]);
        let mut bytes = pkg.to_bytes().unwrap();
        forge_uncompressed_size(&mut bytes, 0xFFFF_FFF0);

        // Either outcome is fine as long as the process survives.
        match PhysPkg::from_bytes(&bytes) {
            Ok(reloaded) => {
                assert_eq!(reloaded.read("ppt/media/image1.png").unwrap(), &[0x89, 0x50, 0x4E, 0x47])
            },
            Err(err) => assert!(matches!(err, OpcError::ZipError(_) | OpcError::IoError(_))),
        }
    }

    #[test]
    fn test_compression_choice() {
        assert_eq!(compression_for("ppt/media/image1.PNG"), CompressionMethod::Stored);
        assert_eq!(compression_for("ppt/slides/slide1.xml"), CompressionMethod::Deflated);
        assert_eq!(compression_for("README"), CompressionMethod::Deflated);
    }
}
