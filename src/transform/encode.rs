//! Output format selection and encoding.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::TransformError;

// =============================================================================
// Output Format
// =============================================================================

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
    Bmp,
}

impl OutputFormat {
    /// Parse a caller-supplied format name. Case-insensitive; "jpg" and
    /// "jpeg" are synonyms.
    pub fn parse(name: &str) -> Result<Self, TransformError> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "gif" => Ok(OutputFormat::Gif),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(TransformError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Map a decoded input format to an output format, when encodable.
    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::WebP => Some(OutputFormat::Webp),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            _ => None,
        }
    }

    fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Webp => ImageFormat::WebP,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }

    /// MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Bmp => "image/bmp",
        }
    }
}

/// Pick the output format: the requested one if present, else the format
/// the source decoded from (when encodable), else PNG.
pub fn select_format(
    requested: Option<&str>,
    original: Option<ImageFormat>,
) -> Result<OutputFormat, TransformError> {
    if let Some(name) = requested {
        return OutputFormat::parse(name);
    }
    Ok(original
        .and_then(OutputFormat::from_image_format)
        .unwrap_or(OutputFormat::Png))
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode `image` in the given format.
///
/// The pixel buffer is converted to a color type the target encoder
/// accepts before writing; JPEG and BMP drop any alpha channel.
pub fn encode_image(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, TransformError> {
    let image = normalize_color(image, format);

    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format.to_image_format())
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(buf.into_inner())
}

/// Convert to a color type the encoder for `format` supports.
fn normalize_color(image: &DynamicImage, format: OutputFormat) -> DynamicImage {
    match format {
        OutputFormat::Jpeg | OutputFormat::Bmp => match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        OutputFormat::Webp => match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image.clone(),
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        OutputFormat::Gif => match image {
            DynamicImage::ImageRgba8(_) => image.clone(),
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        // The PNG encoder takes every color type the pipeline produces
        OutputFormat::Png => image.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
