//! Pixel-level transforms shared by the layer renderers and the compositor

use crate::layout::normalize_rotation;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Multiply every alpha value by `factor` (0.0..=1.0)
pub fn scale_alpha(image: &mut RgbaImage, factor: f32) {
    let factor = factor.clamp(0.0, 1.0);
    if factor >= 1.0 {
        return;
    }
    for pixel in image.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor).round() as u8;
    }
}

/// Rec.601 luma, alpha untouched
pub fn to_grayscale(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        *pixel = Rgba([luma, luma, luma, a]);
    }
}

/// Shrink to fit within the given bounds, keeping aspect ratio.
///
/// Never enlarges. Returns `None` when the image already fits.
pub fn resize_to_fit(
    image: &RgbaImage,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Option<RgbaImage> {
    let (w, h) = image.dimensions();
    let bound_w = max_width.unwrap_or(w).max(1);
    let bound_h = max_height.unwrap_or(h).max(1);
    if w <= bound_w && h <= bound_h {
        return None;
    }

    let ratio = (bound_w as f64 / w as f64).min(bound_h as f64 / h as f64);
    let new_w = ((w as f64 * ratio).round() as u32).clamp(1, bound_w);
    let new_h = ((h as f64 * ratio).round() as u32).clamp(1, bound_h);
    Some(imageops::resize(image, new_w, new_h, FilterType::Lanczos3))
}

/// Rotate counter-clockwise about the center, growing the buffer so no
/// pixel is cut off.
///
/// Multiples of 90 degrees are exact; other angles use bilinear sampling
/// with a transparent border.
pub fn rotate_expand(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let degrees = normalize_rotation(degrees);
    if degrees == 0.0 {
        return image.clone();
    } else if degrees == 90.0 {
        return imageops::rotate270(image);
    } else if degrees == 180.0 {
        return imageops::rotate180(image);
    } else if degrees == 270.0 {
        return imageops::rotate90(image);
    }

    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;

    let dst_w = ((src_w * cos.abs() + src_h * sin.abs()).ceil() as u32).max(1);
    let dst_h = ((src_w * sin.abs() + src_h * cos.abs()).ceil() as u32).max(1);

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse mapping from destination pixel center to source space
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;
            let sx = rx * cos - ry * sin + src_cx - 0.5;
            let sy = rx * sin + ry * cos + src_cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

/// Bilinear sample with transparent pixels outside the image.
///
/// Interpolates premultiplied color so edges do not darken.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Option<Rgba<u8>> {
    let (w, h) = (image.width() as i64, image.height() as i64);
    if x <= -1.0 || y <= -1.0 || x >= w as f32 || y >= h as f32 {
        return None;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut acc = [0.0f32; 4];
    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    for (px, py, weight) in taps {
        if px < 0 || py < 0 || px >= w || py >= h || weight == 0.0 {
            continue;
        }
        let p = image.get_pixel(px as u32, py as u32);
        let alpha = p[3] as f32 * weight;
        acc[0] += p[0] as f32 * alpha;
        acc[1] += p[1] as f32 * alpha;
        acc[2] += p[2] as f32 * alpha;
        acc[3] += alpha;
    }

    if acc[3] < 0.5 {
        return None;
    }

    let channel = |v: f32| (v / acc[3]).round().clamp(0.0, 255.0) as u8;
    Some(Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        acc[3].round().clamp(0.0, 255.0) as u8,
    ]))
}
