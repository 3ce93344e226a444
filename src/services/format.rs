//! MIME type and file extension handling service
//!
//! This module keeps the mapping between MIME types, file extensions and
//! sniffed image formats out of the pipeline logic.

use image::ImageFormat;
use std::path::Path;

/// Fallback MIME type when none can be determined
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Default MIME type for removal results that do not report one
pub const DEFAULT_RESULT_MIME: &str = "image/png";

/// Extensions the pipeline will ever write to storage
const KNOWN_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Service for MIME type and extension conversions
pub struct MediaFormatHandler;

impl MediaFormatHandler {
    /// Normalize a MIME type: lowercase, trimmed, parameters stripped
    ///
    /// # Examples
    /// ```rust
    /// use bg_eraser::services::MediaFormatHandler;
    ///
    /// assert_eq!(MediaFormatHandler::normalize_mime(" Image/PNG; charset=binary"), "image/png");
    /// ```
    #[must_use]
    pub fn normalize_mime(mime_type: &str) -> String {
        mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Whether a string has the `type/subtype` shape
    #[must_use]
    pub fn is_well_formed_mime(mime_type: &str) -> bool {
        match mime_type.split_once('/') {
            Some((kind, subtype)) => {
                !kind.is_empty()
                    && !subtype.is_empty()
                    && !subtype.contains('/')
                    && !mime_type.chars().any(char::is_whitespace)
            },
            None => false,
        }
    }

    /// Subtype part of a MIME type (`image/png` -> `png`)
    #[must_use]
    pub fn subtype(mime_type: &str) -> Option<&str> {
        mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .filter(|subtype| !subtype.is_empty())
    }

    /// Extension for a stored result, given the decoded MIME type
    ///
    /// The subtype is used when it names one of the accepted image types,
    /// otherwise results are stored as `png`.
    ///
    /// # Examples
    /// ```rust
    /// use bg_eraser::services::MediaFormatHandler;
    ///
    /// assert_eq!(MediaFormatHandler::result_extension("image/jpeg"), "jpeg");
    /// assert_eq!(MediaFormatHandler::result_extension("image/webp"), "png");
    /// ```
    #[must_use]
    pub fn result_extension(mime_type: &str) -> String {
        let normalized = Self::normalize_mime(mime_type);
        match Self::subtype(&normalized) {
            Some(subtype) if KNOWN_IMAGE_EXTENSIONS.contains(&subtype) => subtype.to_string(),
            _ => "png".to_string(),
        }
    }

    /// Extension for a stored original upload
    ///
    /// Prefers the file name's extension when it is a known image extension,
    /// falls back to the declared MIME subtype, then to `png`.
    #[must_use]
    pub fn upload_extension(file_name: &str, declared_mime: &str) -> String {
        let from_name = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| KNOWN_IMAGE_EXTENSIONS.contains(&ext.as_str()));

        from_name.unwrap_or_else(|| Self::result_extension(declared_mime))
    }

    /// MIME type for a stored extension
    #[must_use]
    pub fn mime_for_extension(extension: &str) -> &'static str {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => OCTET_STREAM,
        }
    }

    /// MIME type guessed from a path's extension
    #[must_use]
    pub fn mime_for_path<P: AsRef<Path>>(path: P) -> &'static str {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(OCTET_STREAM, Self::mime_for_extension)
    }

    /// MIME type sniffed from the content's magic bytes
    #[must_use]
    pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Png => Some("image/png"),
            ImageFormat::Jpeg => Some("image/jpeg"),
            ImageFormat::WebP => Some("image/webp"),
            ImageFormat::Gif => Some("image/gif"),
            ImageFormat::Bmp => Some("image/bmp"),
            ImageFormat::Tiff => Some("image/tiff"),
            _ => None,
        }
    }
}
