use crate::batch::{CancelToken, render_source};
use crate::engine::PreparedProfile;
use crate::render::resize_to_fit;
use crate::types::{Result, WatermarkError};
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

/// Watermark one image in memory and shrink it for display.
///
/// Nothing is written to disk. `max_side` bounds both dimensions of the
/// returned image.
pub async fn render_preview(
    path: impl AsRef<Path>,
    prepared: Arc<PreparedProfile>,
    max_side: u32,
) -> Result<RgbaImage> {
    let path = path.as_ref().to_path_buf();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| WatermarkError::filesystem(&path, e))?;

    tokio::task::spawn_blocking(move || {
        let (image, _) = render_source(&bytes, &path, &prepared, &CancelToken::new())?;
        let max_side = max_side.max(1);
        Ok::<_, WatermarkError>(
            resize_to_fit(&image, Some(max_side), Some(max_side)).unwrap_or(image),
        )
    })
    .await?
}
