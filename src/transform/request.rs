//! Transform request types and validation.
//!
//! Every directive is optional; absence means "skip that stage", not
//! "reset to default". Validation runs before the pipeline so malformed
//! specs are rejected as such instead of crashing a stage.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

// =============================================================================
// Directives
// =============================================================================

/// Stretch to exact dimensions; aspect ratio is not preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: i64,
    pub height: i64,
}

/// Extract the rectangle with top-left (x, y) and the given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Color filters. Both may be requested together; grayscale is applied
/// first (see the pipeline for the documented interaction).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub grayscale: bool,

    #[serde(default)]
    pub sepia: bool,
}

/// A declarative transform: the optional composition of all directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub resize: Option<ResizeSpec>,

    #[serde(default)]
    pub crop: Option<CropSpec>,

    /// Degrees, counter-clockwise positive. Any integer; normalized
    /// modulo 360 by the pipeline.
    #[serde(default)]
    pub rotate: Option<i64>,

    #[serde(default)]
    pub filters: Option<FilterSpec>,

    /// Output format name (png, jpeg, jpg, webp, gif, bmp).
    #[serde(default)]
    pub format: Option<String>,
}

impl TransformRequest {
    /// Check bounds on all present directives.
    pub fn validate(&self) -> Result<(), TransformError> {
        if let Some(resize) = &self.resize {
            if resize.width <= 0 || resize.height <= 0 {
                return Err(TransformError::InvalidRequest(format!(
                    "resize dimensions must be positive, got {}x{}",
                    resize.width, resize.height
                )));
            }
        }

        if let Some(crop) = &self.crop {
            if crop.width <= 0 || crop.height <= 0 {
                return Err(TransformError::InvalidRequest(format!(
                    "crop dimensions must be positive, got {}x{}",
                    crop.width, crop.height
                )));
            }
            if crop.x < 0 || crop.y < 0 {
                return Err(TransformError::InvalidRequest(format!(
                    "crop origin must be non-negative, got ({}, {})",
                    crop.x, crop.y
                )));
            }
        }

        // rotate accepts any integer; the pipeline normalizes modulo 360

        if let Some(format) = &self.format {
            // Fail fast on unknown formats instead of after pixel work
            super::encode::OutputFormat::parse(format)?;
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
