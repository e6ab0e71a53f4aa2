//! Image format sniffing: raw bytes → container format → MIME type.
//!
//! Only the header is decoded. That is enough to reject blobs that merely
//! start with a plausible magic number, without paying for a full decode of
//! an image the model will decode again anyway.

use crate::error::OcrError;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Identify the image container in `bytes` and return its MIME type.
pub fn sniff_mime(bytes: &[u8]) -> Result<String, OcrError> {
    let format = detect_format(bytes)?;
    let mime = mime_for_format(format);
    debug!("Detected {:?} image → {}", format, mime);
    Ok(mime)
}

/// Guess the container format and verify its header decodes.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, OcrError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::UnsupportedFormat {
            detail: e.to_string(),
        })?;

    let format = reader.format().ok_or_else(|| OcrError::UnsupportedFormat {
        detail: "unable to determine image format".to_string(),
    })?;

    reader
        .into_dimensions()
        .map_err(|e| OcrError::UnsupportedFormat {
            detail: e.to_string(),
        })?;

    Ok(format)
}

/// Map a format to its MIME type.
///
/// Lookup order: the canonical table, then the fallback table, then
/// `image/<lowercased format name>`. Every format yields some MIME string.
pub fn mime_for_format(format: ImageFormat) -> String {
    canonical_mime(format)
        .or_else(|| fallback_mime(format))
        .map(str::to_string)
        .unwrap_or_else(|| format!("image/{}", format_name(format).to_lowercase()))
}

fn canonical_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Pnm => Some("image/x-portable-anymap"),
        _ => None,
    }
}

fn fallback_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::Ico => Some("image/x-icon"),
        _ => None,
    }
}

/// Short upper-case name of a format, e.g. `"QOI"` or `"OPENEXR"`.
fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}
