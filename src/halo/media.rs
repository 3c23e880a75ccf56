//! Image content-type inference
//!
//! The declared `Content-Type` wins when it names a supported image type;
//! otherwise the leading bytes are matched against known signatures.

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Avif,
    Ico,
    /// Accepted only when declared; SVG has no magic number
    Svg,
}

impl ImageType {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "image/jpeg",
            ImageType::Png => "image/png",
            ImageType::Gif => "image/gif",
            ImageType::Webp => "image/webp",
            ImageType::Bmp => "image/bmp",
            ImageType::Avif => "image/avif",
            ImageType::Ico => "image/x-icon",
            ImageType::Svg => "image/svg+xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpg",
            ImageType::Png => "png",
            ImageType::Gif => "gif",
            ImageType::Webp => "webp",
            ImageType::Bmp => "bmp",
            ImageType::Avif => "avif",
            ImageType::Ico => "ico",
            ImageType::Svg => "svg",
        }
    }

    /// Parse a declared content type, ignoring parameters such as charset
    pub fn from_mime(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageType::Jpeg),
            "image/png" | "image/apng" => Some(ImageType::Png),
            "image/gif" => Some(ImageType::Gif),
            "image/webp" => Some(ImageType::Webp),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageType::Bmp),
            "image/avif" => Some(ImageType::Avif),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(ImageType::Ico),
            "image/svg+xml" => Some(ImageType::Svg),
            _ => None,
        }
    }

    /// Match the byte signature of a raster image
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageType::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageType::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageType::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageType::Webp)
        } else if bytes.len() >= 12
            && &bytes[4..8] == b"ftyp"
            && matches!(&bytes[8..12], b"avif" | b"avis")
        {
            Some(ImageType::Avif)
        } else if bytes.len() >= 14 && bytes.starts_with(b"BM") {
            Some(ImageType::Bmp)
        } else if bytes.len() >= 6 && bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
            Some(ImageType::Ico)
        } else {
            None
        }
    }

    /// Whether a file name's extension agrees with this type
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        mime_guess::from_path(file_name)
            .iter()
            .any(|m| ImageType::from_mime(m.essence_str()) == Some(*self))
    }
}

/// Infer the type of a downloaded image
pub fn infer(declared: Option<&str>, bytes: &[u8]) -> Result<ImageType, AppError> {
    if let Some(image_type) = declared.and_then(ImageType::from_mime) {
        return Ok(image_type);
    }
    ImageType::sniff(bytes).ok_or_else(|| {
        AppError::UnsupportedMedia(format!(
            "declared type {} and byte signature do not identify a supported image",
            declared.unwrap_or("<none>")
        ))
    })
}
