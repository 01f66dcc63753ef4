//! Layer compositing.
//!
//! Layers are blended onto the target in the order they were added using
//! the Porter-Duff "over" operator. Everything is clipped to the target,
//! so the output always keeps the source dimensions.

use crate::layout::{CanvasSize, LayerOrigin, LayerSize, Position, resolve_placement};
use crate::options::Placement;
use crate::render::transform::rotate_expand;
use image::{Rgba, RgbaImage};

/// A rendered layer and where it goes
#[derive(Clone)]
pub struct PlacedLayer {
    /// Layer at its natural, unrotated size
    pub image: RgbaImage,
    pub placement: Placement,
}

impl std::fmt::Debug for PlacedLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacedLayer")
            .field("dimensions", &self.image.dimensions())
            .field("placement", &self.placement)
            .finish()
    }
}

/// Ordered stack of layers applied to one target image
#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<PlacedLayer>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: PlacedLayer) {
        self.layers.push(layer);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Blend every layer into `target`, first added at the bottom
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            composite_layer(target, &layer.image, &layer.placement);
        }
    }
}

/// Rotate, place and blend a single layer
pub fn composite_layer(target: &mut RgbaImage, layer: &RgbaImage, placement: &Placement) {
    if layer.width() == 0 || layer.height() == 0 {
        return;
    }

    let canvas = CanvasSize::new(target.width(), target.height());
    let natural = LayerSize::new(layer.width(), layer.height());
    let rotated = rotate_expand(layer, placement.rotation_degrees);
    let stamp = LayerSize::new(rotated.width(), rotated.height());

    let resolved = resolve_placement(canvas, natural, stamp, placement);

    match resolved.origin {
        LayerOrigin::Single(origin) => {
            // Keep the rotated buffer centered on the natural box
            let x = origin.x + (natural.width as i64 - stamp.width as i64).div_euclid(2);
            let y = origin.y + (natural.height as i64 - stamp.height as i64).div_euclid(2);
            overlay_at(target, &rotated, Position::new(x, y));
        }
        LayerOrigin::Tiled(grid) => {
            for position in grid.positions() {
                overlay_at(target, &rotated, position);
            }
        }
    }
}

/// Blend `layer` with its top-left at `origin`, clipped to the target
pub fn overlay_at(target: &mut RgbaImage, layer: &RgbaImage, origin: Position) {
    let (tw, th) = (target.width() as i64, target.height() as i64);
    let (lw, lh) = (layer.width() as i64, layer.height() as i64);

    let x_start = origin.x.max(0);
    let y_start = origin.y.max(0);
    let x_end = (origin.x + lw).min(tw);
    let y_end = (origin.y + lh).min(th);
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    for y in y_start..y_end {
        for x in x_start..x_end {
            let src = *layer.get_pixel((x - origin.x) as u32, (y - origin.y) as u32);
            blend_pixel(target.get_pixel_mut(x as u32, y as u32), src);
        }
    }
}

/// Porter-Duff "over" of `src` onto `dst`.
///
/// Fully transparent sources leave `dst` untouched and fully opaque sources
/// replace it exactly.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    match src[3] {
        0 => {}
        255 => *dst = src,
        src_a => {
            let sa = src_a as f32 / 255.0;
            let da = dst[3] as f32 / 255.0;
            let out_a = sa + da * (1.0 - sa);

            let channel = |s: u8, d: u8| -> u8 {
                let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
                v.round().clamp(0.0, 255.0) as u8
            };

            *dst = Rgba([
                channel(src[0], dst[0]),
                channel(src[1], dst[1]),
                channel(src[2], dst[2]),
                (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            ]);
        }
    }
}
