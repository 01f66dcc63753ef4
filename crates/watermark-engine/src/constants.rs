//! Shared constants for watermark rendering and batch output
//!
//! This module centralizes defaults and limits used across the engine.

// =============================================================================
// Value Ranges
// =============================================================================

/// Allowed font size range in pixels
pub const MIN_FONT_SIZE_PX: f32 = 8.0;
pub const MAX_FONT_SIZE_PX: f32 = 500.0;

/// Allowed logo scale range, as a percentage of the canvas's shorter side
pub const MIN_SCALE_PERCENT: f32 = 1.0;
pub const MAX_SCALE_PERCENT: f32 = 100.0;

/// Allowed text outline width range in pixels
pub const MIN_OUTLINE_WIDTH_PX: u32 = 1;
pub const MAX_OUTLINE_WIDTH_PX: u32 = 10;

/// Allowed output quality range
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

// =============================================================================
// Text Scaling
// =============================================================================

/// Canvas size at which `font_size_px` is used unscaled (1920x1080)
pub const REFERENCE_WIDTH: f32 = 1920.0;
pub const REFERENCE_HEIGHT: f32 = 1080.0;

/// Diagonal of the reference canvas
#[inline]
pub fn reference_diagonal() -> f32 {
    REFERENCE_WIDTH.hypot(REFERENCE_HEIGHT)
}

/// Rendered in place of a known metadata token that has no value
pub const MISSING_TOKEN_PLACEHOLDER: &str = "unknown";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_FONT_SIZE_PX: f32 = 36.0;
pub const DEFAULT_OPACITY_PERCENT: f32 = 50.0;
pub const DEFAULT_LOGO_SCALE_PERCENT: f32 = 15.0;
pub const DEFAULT_TILE_SPACING_PX: u32 = 100;
pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_SUFFIX: &str = "_watermarked";

/// Shadow alpha relative to the text alpha
pub const SHADOW_ALPHA_FACTOR: f32 = 0.5;

// =============================================================================
// Input Files
// =============================================================================

/// Extensions (lowercase, no dot) accepted as batch inputs
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// Whether a path has one of the supported input extensions
pub fn is_supported_input(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_INPUT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Suffix appended to an output path while it is being written
pub const PARTIAL_FILE_SUFFIX: &str = "part";
