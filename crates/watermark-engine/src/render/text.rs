//! Text layer rendering.
//!
//! Text content goes through token substitution first, then each line is
//! rasterized with `ab_glyph`. Passes run bottom to top: shadow, outline
//! ring, then the main glyphs.

use crate::composite::blend_pixel;
use crate::constants::*;
use crate::layout::CanvasSize;
use crate::metadata::{ImageMetadata, MetadataToken};
use crate::options::TextSpec;
use crate::render::transform::scale_alpha;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

/// Padding added around the measured text box
const TEXT_PADDING: u32 = 2;

/// Replace `{token}` references with metadata values.
///
/// Known tokens without a value become the placeholder; unknown names and
/// unterminated braces are kept literally.
pub fn substitute_tokens(template: &str, metadata: &ImageMetadata) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match MetadataToken::from_name(name) {
            Some(token) => {
                out.push_str(metadata.get(token).unwrap_or(MISSING_TOKEN_PLACEHOLDER));
                rest = &after[close + 1..];
            }
            None => {
                // Keep the brace and resume scanning right after it so a
                // nested `{known}` can still match.
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Font size for a canvas, honoring `scale_with_image`
pub fn effective_font_size(spec: &TextSpec, canvas: CanvasSize) -> f32 {
    let base = spec.font_size();
    if !spec.scale_with_image {
        return base;
    }
    let factor = canvas.diagonal() / reference_diagonal();
    (base * factor).clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX)
}

struct LineMetrics {
    width: f32,
    ascent: f32,
    line_height: f32,
    block_height: f32,
}

fn line_width<F: Font, SF: ScaleFont<F>>(scaled: &SF, line: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev = None;
    for c in line.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn measure(font: &FontArc, scale: PxScale, lines: &[&str]) -> LineMetrics {
    let scaled = font.as_scaled(scale);
    let width = lines
        .iter()
        .map(|line| line_width(&scaled, line))
        .fold(0.0f32, f32::max);
    let line_height = scaled.height() + scaled.line_gap();
    let block_height = scaled.height() + line_height * (lines.len().saturating_sub(1)) as f32;

    LineMetrics {
        width,
        ascent: scaled.ascent(),
        line_height,
        block_height,
    }
}

/// Rasterize lines with their top-left at `(x, y)`
fn draw_lines(
    target: &mut RgbaImage,
    font: &FontArc,
    scale: PxScale,
    lines: &[&str],
    metrics: &LineMetrics,
    (x, y): (f32, f32),
    color: Rgba<u8>,
) {
    let scaled = font.as_scaled(scale);
    let (w, h) = (target.width() as i32, target.height() as i32);

    for (row, line) in lines.iter().enumerate() {
        let baseline = y + metrics.ascent + metrics.line_height * row as f32;
        let mut cursor = x;
        let mut prev = None;

        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = gx as i32 + bounds.min.x as i32;
                    let py = gy as i32 + bounds.min.y as i32;
                    if px < 0 || py < 0 || px >= w || py >= h {
                        return;
                    }
                    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
                    let src = Rgba([color[0], color[1], color[2], alpha]);
                    blend_pixel(target.get_pixel_mut(px as u32, py as u32), src);
                });
            }

            cursor += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

/// Render already-substituted text into a transparent layer.
///
/// # Arguments
///
/// * `font` - Font resolved for this watermark
/// * `spec` - Size, color, shadow, outline and opacity settings
/// * `text` - Content after token substitution
/// * `canvas` - Target image size, used when the font scales with the image
pub fn render_text_layer(
    font: &FontArc,
    spec: &TextSpec,
    text: &str,
    canvas: CanvasSize,
) -> RgbaImage {
    let scale = PxScale::from(effective_font_size(spec, canvas));
    let lines: Vec<&str> = text.lines().collect();
    let lines = if lines.is_empty() { vec![""] } else { lines };
    let metrics = measure(font, scale, &lines);

    let (shadow_dx, shadow_dy) = if spec.shadow.enabled {
        (spec.shadow.offset_x, spec.shadow.offset_y)
    } else {
        (0, 0)
    };

    let ring = spec.outline.width();
    let text_w = metrics.width.ceil().max(0.0) as u32 + TEXT_PADDING + 2 * ring;
    let text_h = metrics.block_height.ceil().max(0.0) as u32 + TEXT_PADDING + 2 * ring;
    let width = (text_w + shadow_dx.unsigned_abs()).max(1);
    let height = (text_h + shadow_dy.unsigned_abs()).max(1);

    let mut layer = RgbaImage::new(width, height);

    // Main text sits away from whichever side the shadow extends to
    let inset = (TEXT_PADDING / 2 + ring) as f32;
    let main_x = (-shadow_dx).max(0) as f32 + inset;
    let main_y = (-shadow_dy).max(0) as f32 + inset;
    let draw = |layer: &mut RgbaImage, (x, y): (f32, f32), color: Rgba<u8>| {
        draw_lines(layer, font, scale, &lines, &metrics, (x, y), color);
    };

    if spec.shadow.enabled {
        let alpha = (255.0 * SHADOW_ALPHA_FACTOR).round() as u8;
        draw(
            &mut layer,
            (main_x + shadow_dx as f32, main_y + shadow_dy as f32),
            spec.shadow.color.with_alpha(alpha),
        );
    }

    if ring > 0 {
        let ring = ring as i32;
        let color = spec.outline.color.with_alpha(255);
        for dy in -ring..=ring {
            for dx in -ring..=ring {
                if dx != 0 || dy != 0 {
                    draw(&mut layer, (main_x + dx as f32, main_y + dy as f32), color);
                }
            }
        }
    }

    draw(&mut layer, (main_x, main_y), spec.color.with_alpha(255));

    scale_alpha(&mut layer, spec.placement.opacity_factor());
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn metadata() -> ImageMetadata {
        let mut meta = ImageMetadata::default();
        meta.insert(MetadataToken::Camera, "EOS R5");
        meta.insert(MetadataToken::Iso, "ISO 400");
        meta
    }

    #[test]
    fn test_substitute_known_tokens() {
        let text = substitute_tokens("Shot on {camera} at {iso}", &metadata());
        assert_eq!(text, "Shot on EOS R5 at ISO 400");
    }

    #[test]
    fn test_missing_token_uses_placeholder() {
        let text = substitute_tokens("Lens: {lens}", &metadata());
        assert_eq!(text, format!("Lens: {MISSING_TOKEN_PLACEHOLDER}"));
    }

    #[test]
    fn test_unknown_and_unterminated_tokens_stay_literal() {
        let meta = metadata();
        assert_eq!(substitute_tokens("{nope} {camera}", &meta), "{nope} EOS R5");
        assert_eq!(substitute_tokens("open {camera", &meta), "open {camera");
        assert_eq!(substitute_tokens("{{camera}}", &meta), "{EOS R5}");
        assert_eq!(substitute_tokens("", &meta), "");
    }

    #[test]
    fn test_effective_font_size_scaling() {
        let mut spec = TextSpec::new("x");
        spec.font_size_px = 40.0;
        let small = CanvasSize::new(960, 540);
        assert_eq!(effective_font_size(&spec, small), 40.0);

        spec.scale_with_image = true;
        assert!((effective_font_size(&spec, small) - 20.0).abs() < 0.01);
        assert_eq!(
            effective_font_size(&spec, CanvasSize::new(100_000, 100_000)),
            MAX_FONT_SIZE_PX
        );
    }

    fn system_font() -> FontArc {
        let path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        let data = std::fs::read(path).expect("DejaVuSans.ttf is installed");
        FontArc::try_from_vec(data).expect("DejaVuSans.ttf parses")
    }

    #[test]
    #[ignore = "requires the DejaVuSans system font"]
    fn test_render_text_layer_draws_pixels() {
        let font = system_font();
        let mut spec = TextSpec::new("Hi");
        spec.placement.opacity_percent = 100.0;
        let layer = render_text_layer(&font, &spec, "Hi", CanvasSize::new(800, 600));
        assert!(layer.width() > 10 && layer.height() > 10);
        assert!(layer.pixels().any(|p| p[3] == 255));
    }

    #[test]
    #[ignore = "requires the DejaVuSans system font"]
    fn test_shadow_grows_layer() {
        let font = system_font();
        let mut spec = TextSpec::new("Hi");
        let plain = render_text_layer(&font, &spec, "Hi", CanvasSize::new(800, 600));
        spec.shadow.enabled = true;
        spec.shadow.offset_x = -4;
        spec.shadow.offset_y = 3;
        let shadowed = render_text_layer(&font, &spec, "Hi", CanvasSize::new(800, 600));
        assert_eq!(shadowed.width(), plain.width() + 4);
        assert_eq!(shadowed.height(), plain.height() + 3);
    }

    #[test]
    #[ignore = "requires the DejaVuSans system font"]
    fn test_multiline_is_taller() {
        let font = system_font();
        let spec = TextSpec::new("x");
        let one = render_text_layer(&font, &spec, "line", CanvasSize::new(800, 600));
        let two = render_text_layer(&font, &spec, "line\nline", CanvasSize::new(800, 600));
        assert!(two.height() > one.height());
        assert_eq!(two.width(), one.width());
    }

    #[test]
    #[ignore = "requires the DejaVuSans system font"]
    fn test_outline_ring_under_main_text() {
        let font = system_font();
        let mut spec = TextSpec::new("H");
        spec.font_size_px = 60.0;
        spec.color = crate::types::Rgb([255, 255, 255]);
        spec.placement.opacity_percent = 100.0;
        let plain = render_text_layer(&font, &spec, "H", CanvasSize::new(800, 600));

        spec.outline.enabled = true;
        spec.outline.width_px = 3;
        spec.outline.color = crate::types::Rgb([255, 0, 0]);
        let outlined = render_text_layer(&font, &spec, "H", CanvasSize::new(800, 600));

        assert_eq!(outlined.width(), plain.width() + 6);
        assert_eq!(outlined.height(), plain.height() + 6);
        assert!(outlined.pixels().any(|p| *p == Rgba([255, 0, 0, 255])));
        assert!(outlined.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
    }
}
