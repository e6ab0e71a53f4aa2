//! Image encoding: rendered page `DynamicImage` → PNG bytes.
//!
//! PNG is lossless, so rendered glyph edges reach the model intact. JPEG
//! artefacts around small text measurably hurt OCR accuracy.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type of every rasterised PDF page.
pub const PAGE_MIME: &str = "image/png";

/// Encode a rasterised page as PNG.
pub fn encode_page(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
