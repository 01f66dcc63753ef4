//! Per-item processing.
//!
//! Stages: read, decode, metadata, render + composite, resize, encode,
//! write. Cancellation is checked between stages up to encode. Once an
//! output is encoded the write always runs to completion.

use super::cancel::CancelToken;
use super::job::{ItemResult, ItemSizes};
use super::naming::PlannedOutput;
use crate::engine::PreparedProfile;
use crate::io::{decode_image, encode_image, write_output_atomic};
use crate::metadata::{ImageMetadata, attach_exif, extract_metadata};
use crate::render::resize_to_fit;
use crate::types::{FailureKind, Result, WatermarkError};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Decode a source and apply every watermark in memory
pub fn render_source(
    bytes: &[u8],
    path: &Path,
    prepared: &PreparedProfile,
    cancel: &CancelToken,
) -> Result<(RgbaImage, ImageMetadata)> {
    let decoded = decode_image(bytes, path)?;
    cancel.check()?;

    let metadata = extract_metadata(bytes, path, (decoded.width(), decoded.height()));
    let mut canvas = decoded.to_rgba8();
    drop(decoded);
    cancel.check()?;

    prepared.apply(&mut canvas, &metadata);
    log::debug!(
        "Composited {} layer(s) onto {}",
        prepared.profile().watermarks.len(),
        path.display()
    );
    Ok((canvas, metadata))
}

fn run_stages(
    source: &Path,
    output_path: &Path,
    prepared: &PreparedProfile,
    cancel: &CancelToken,
    sizes: &mut ItemSizes,
) -> Result<()> {
    let output = &prepared.profile().output;

    cancel.check()?;
    let bytes = std::fs::read(source)
        .map_err(|e| WatermarkError::filesystem(source, e))?;
    cancel.check()?;

    let (mut canvas, metadata) = render_source(&bytes, source, prepared, cancel)?;
    sizes.original = Some(canvas.dimensions());
    drop(bytes);
    cancel.check()?;

    if let Some(resize) = output.resize {
        if let Some(resized) = resize_to_fit(&canvas, resize.max_width, resize.max_height) {
            canvas = resized;
        }
    }
    cancel.check()?;

    let mut encoded = encode_image(&canvas, output.format, output.quality())?;
    sizes.output = Some(canvas.dimensions());
    if output.preserve_exif && output.format.supports_exif() {
        if let Some(raw) = &metadata.raw_exif {
            attach_exif(&mut encoded, raw);
        }
    }

    write_output_atomic(output_path, &encoded)?;
    log::debug!("Wrote {} ({} bytes)", output_path.display(), encoded.len());
    Ok(())
}

/// Process one source to completion and report the outcome.
///
/// # Arguments
///
/// * `index` - Position in the submission list
/// * `source` - Input file
/// * `planned` - Output path assigned before the batch started
/// * `prepared` - Profile with its assets loaded
/// * `cancel` - Batch cancellation flag
pub fn process_item(
    index: usize,
    source: PathBuf,
    planned: &PlannedOutput,
    prepared: &PreparedProfile,
    cancel: &CancelToken,
) -> ItemResult {
    let planned_path = planned.path().to_path_buf();

    if cancel.is_cancelled() {
        return ItemResult::aborted(index, source, Some(planned_path));
    }

    let started = Instant::now();
    let mut sizes = ItemSizes::default();
    let outcome = planned
        .to_result()
        .and_then(|path| run_stages(&source, &path, prepared, cancel, &mut sizes));

    let result = match outcome {
        Ok(()) => ItemResult::success(index, source, planned_path),
        Err(err) => {
            if err.kind() != FailureKind::Cancelled {
                log::warn!("Item #{} ({}) failed: {}", index, source.display(), err);
            }
            ItemResult::from_error(index, source, Some(planned_path), &err)
        }
    };
    result.with_measurements(started.elapsed(), sizes)
}
