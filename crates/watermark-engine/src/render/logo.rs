//! Logo layer rendering

use crate::layout::CanvasSize;
use crate::options::ImageSpec;
use crate::render::transform::{scale_alpha, to_grayscale};
use crate::types::{Result, WatermarkError};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use std::sync::Arc;

/// Read and decode a logo file.
///
/// Called once per job; the result is shared read-only by every worker.
pub fn load_logo(path: &Path) -> Result<Arc<RgbaImage>> {
    let logo_error = |reason: String| WatermarkError::LogoLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| logo_error(e.to_string()))?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| logo_error(e.to_string()))?;
    let logo = decoded.to_rgba8();
    if logo.width() == 0 || logo.height() == 0 {
        return Err(logo_error("logo has no pixels".to_string()));
    }

    log::debug!(
        "Loaded logo {} ({}x{})",
        path.display(),
        logo.width(),
        logo.height()
    );
    Ok(Arc::new(logo))
}

/// Logo size for a canvas: width is `scale%` of the shorter canvas side,
/// height follows the logo's aspect ratio.
pub fn logo_size(logo: &RgbaImage, spec: &ImageSpec, canvas: CanvasSize) -> (u32, u32) {
    let width = (canvas.shorter_side() as f32 * spec.scale() / 100.0).round().max(1.0);
    let height = (width * logo.height() as f32 / logo.width().max(1) as f32)
        .round()
        .max(1.0);
    (width as u32, height as u32)
}

/// Resize, recolor and fade the logo for one target image
pub fn render_logo_layer(logo: &RgbaImage, spec: &ImageSpec, canvas: CanvasSize) -> RgbaImage {
    let (width, height) = logo_size(logo, spec, canvas);
    let mut layer = if (width, height) == logo.dimensions() {
        logo.clone()
    } else {
        imageops::resize(logo, width, height, FilterType::Lanczos3)
    };

    if spec.grayscale {
        to_grayscale(&mut layer);
    }
    scale_alpha(&mut layer, spec.placement.opacity_factor());
    layer
}
