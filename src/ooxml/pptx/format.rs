//! Image formats accepted for picture substitution.

use crate::ooxml::opc::constants::content_type as CT;

/// Image format types supported by PPTX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Svg,
    Emf,
    Wmf,
}

impl ImageFormat {
    /// Get the MIME type for this image format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => CT::PNG,
            Self::Jpeg => CT::JPEG,
            Self::Gif => CT::GIF,
            Self::Bmp => CT::BMP,
            Self::Tiff => CT::TIFF,
            Self::Svg => CT::SVG,
            Self::Emf => CT::X_EMF,
            Self::Wmf => CT::X_WMF,
        }
    }

    /// Get the file extension used for new media parts.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Svg => "svg",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
        }
    }

    /// Map a file extension (case-insensitive, without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" | "dib" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "svg" => Some(Self::Svg),
            "emf" => Some(Self::Emf),
            "wmf" => Some(Self::Wmf),
            _ => None,
        }
    }

    /// Detect image format from bytes (magic number detection).
    pub fn detect_from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        if bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }

        // TIFF: little-endian or big-endian byte order mark
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(Self::Tiff);
        }

        // EMF: " EMF" signature at offset 40
        if bytes.len() >= 44 && bytes[40..44] == [0x20, 0x45, 0x4D, 0x46] {
            return Some(Self::Emf);
        }

        // WMF: placeable header or plain memory metafile header
        if bytes.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) || bytes.starts_with(&[0x01, 0x00, 0x09, 0x00]) {
            return Some(Self::Wmf);
        }

        let head = &bytes[..bytes.len().min(256)];
        if memchr::memmem::find(head, b"<svg").is_some() {
            return Some(Self::Svg);
        }

        None
    }

    /// Resolve the format of an image named `name` with content `bytes`.
    ///
    /// The name's extension wins; content sniffing is the fallback for names
    /// without a recognised extension.
    pub fn resolve(name: &str, bytes: &[u8]) -> Option<Self> {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
            .or_else(|| Self::detect_from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("docx"), None);
    }

    #[test]
    fn test_detect_from_bytes() {
        assert_eq!(ImageFormat::detect_from_bytes(&PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::detect_from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::detect_from_bytes(b"GIF89a.."), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::detect_from_bytes(b"<?xml version=\"1.0\"?><svg xmlns=\"x\"/>"),
            Some(ImageFormat::Svg)
        );
        assert_eq!(ImageFormat::detect_from_bytes(b"plain text"), None);
        assert_eq!(ImageFormat::detect_from_bytes(b"ab"), None);
    }

    #[test]
    fn test_resolve_prefers_extension() {
        assert_eq!(ImageFormat::resolve("logo.jpg", &PNG_HEADER), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::resolve("logo", &PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::resolve("logo.dat", &PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::resolve("notes.txt", b"hello world"), None);
    }

    #[test]
    fn test_mime_and_extension() {
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpeg");
        assert_eq!(ImageFormat::Emf.mime_type(), "image/x-emf");
    }
}
