//! Anchor resolution
//!
//! Maps an anchor and margins onto the canvas. Horizontal:
//! left `x = mx`, center `x = floor((W - w) / 2)`, right `x = W - w - mx`.
//! Vertical follows the same pattern for top, middle and bottom. The
//! custom anchor ignores margins and uses its coordinates as given.

use super::tiling::tile_grid;
use super::types::*;
use crate::options::Placement;
use crate::types::{Align, Anchor};

/// Fold a rotation angle into [0, 360)
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Origin of one axis for the given alignment
fn align_axis(align: Align, canvas: u32, layer: u32, margin: i64) -> i64 {
    let canvas = canvas as i64;
    let layer = layer as i64;
    match align {
        Align::Start => margin,
        Align::Middle => (canvas - layer).div_euclid(2),
        Align::End => canvas - layer - margin,
    }
}

/// Top-left corner for a single-copy placement
///
/// Margins are resolved against the canvas. Returns `None` for
/// [`Anchor::Tiled`].
pub fn anchor_position(
    canvas: CanvasSize,
    layer: LayerSize,
    placement: &Placement,
) -> Option<Position> {
    if placement.anchor == Anchor::Custom {
        return Some(Position::new(placement.custom_x, placement.custom_y));
    }

    let (horizontal, vertical) = placement.anchor.alignment()?;
    Some(Position::new(
        align_axis(
            horizontal,
            canvas.width,
            layer.width,
            placement.margin_x.resolve(canvas.width),
        ),
        align_axis(
            vertical,
            canvas.height,
            layer.height,
            placement.margin_y.resolve(canvas.height),
        ),
    ))
}

/// Resolve a placement against a canvas.
///
/// # Arguments
///
/// * `canvas` - Target image size
/// * `layer` - Natural size of the rendered layer
/// * `stamp` - Size of the buffer that is stamped in tiled mode (the rotated layer)
/// * `placement` - Anchor, margins, rotation and spacing
pub fn resolve_placement(
    canvas: CanvasSize,
    layer: LayerSize,
    stamp: LayerSize,
    placement: &Placement,
) -> ResolvedPlacement {
    let rotation_degrees = normalize_rotation(placement.rotation_degrees);

    let origin = match anchor_position(canvas, layer, placement) {
        Some(position) => LayerOrigin::Single(position),
        None => LayerOrigin::Tiled(tile_grid(
            canvas,
            stamp,
            placement.tile_spacing_x,
            placement.tile_spacing_y,
        )),
    };

    ResolvedPlacement {
        origin,
        rotation_degrees,
    }
}
