//! Decoding, encoding and atomic output writes

use crate::constants::PARTIAL_FILE_SUFFIX;
use crate::types::{OutputFormat, Result, WatermarkError};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Decode an encoded source image, guessing the format from its content
pub fn decode_image(bytes: &[u8], path: &Path) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| WatermarkError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Flatten onto a white background for formats without alpha
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = a as u32;
        let over_white = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

/// zlib-style level 0..=9 for a quality percentage; higher quality
/// spends less time compressing
pub fn png_compression_level(quality: u8) -> u8 {
    9 - quality.min(100) / 12
}

fn png_compression(quality: u8) -> CompressionType {
    match png_compression_level(quality) {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode the composited image.
///
/// `quality` is used for JPEG and mapped to a compression preset for PNG.
/// WebP output is lossless.
pub fn encode_image(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut output = Cursor::new(Vec::new());
    let (width, height) = image.dimensions();

    let result = match format {
        OutputFormat::Jpeg => {
            let rgb = flatten_on_white(image);
            JpegEncoder::new_with_quality(&mut output, quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => PngEncoder::new_with_quality(
            &mut output,
            png_compression(quality),
            FilterType::Adaptive,
        )
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8),
        OutputFormat::Webp => WebPEncoder::new_lossless(&mut output).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| WatermarkError::Encode(format!("{format:?}: {e}")))?;
    Ok(output.into_inner())
}

/// Path used while an output is being written
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_FILE_SUFFIX);
    path.with_file_name(name)
}

/// Write `bytes` to a sibling `.part` file, then rename it into place.
///
/// Readers never observe a half-written output.
pub fn write_output_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);

    if let Err(e) = std::fs::write(&partial, bytes) {
        let _ = std::fs::remove_file(&partial);
        return Err(WatermarkError::filesystem(&partial, e));
    }
    if let Err(e) = std::fs::rename(&partial, path) {
        let _ = std::fs::remove_file(&partial);
        return Err(WatermarkError::filesystem(path, e));
    }
    Ok(())
}
