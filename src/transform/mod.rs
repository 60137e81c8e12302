//! Declarative image transforms.
//!
//! A [`TransformRequest`] is an optional composition of independent
//! directives; absent directives skip their stage. The pipeline applies the
//! present stages in a fixed order (resize, crop, rotate, filters) and the
//! encoder picks the output format afterwards. Both are pure: identical
//! input bytes and request produce byte-identical output.

pub mod encode;
pub mod pipeline;
pub mod request;

pub use encode::{encode_image, select_format, OutputFormat};
pub use pipeline::apply;
pub use request::{CropSpec, FilterSpec, ResizeSpec, TransformRequest};

use bytes::Bytes;

use crate::error::TransformError;

/// Decode stored bytes, run the pipeline, and re-encode.
///
/// Output format priority: requested format, then the original decoded
/// format, then PNG.
pub fn apply_and_encode(
    source: &Bytes,
    request: &TransformRequest,
) -> Result<(Vec<u8>, OutputFormat), TransformError> {
    request.validate()?;

    let original_format = image::guess_format(source).ok();
    let decoded =
        image::load_from_memory(source).map_err(|e| TransformError::Decode(e.to_string()))?;

    let transformed = apply(decoded, request)?;

    let format = select_format(request.format.as_deref(), original_format)?;
    let encoded = encode_image(&transformed, format)?;

    Ok((encoded, format))
}
