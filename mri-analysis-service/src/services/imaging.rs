//! Decoding, colour normalization and base64 PNG encoding of uploads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ColorType, DynamicImage, ImageError, ImageFormat, RgbImage};
use std::borrow::Cow;
use std::io::Cursor;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes)
}

/// Three-channel 8-bit view of `image`, converting only when needed.
pub fn normalize_rgb(image: &DynamicImage) -> Cow<'_, RgbImage> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        other => {
            tracing::debug!(color = ?other.color(), "Converting image to RGB8");
            Cow::Owned(other.to_rgb8())
        }
    }
}

/// Lossless base64 PNG of the image as decoded.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, ImageError> {
    // PNG has no floating point layout; those images are shipped as RGBA8.
    let image = match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Borrowed(image),
    };

    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(STANDARD.encode(&buffer))
}

pub fn encode_rgb_png_base64(image: &RgbImage) -> Result<String, ImageError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(STANDARD.encode(&buffer))
}
