//! Tiled grid calculation

use super::types::*;

/// Grid of stamps covering the canvas, centered on it.
///
/// Pitch is the stamp size plus spacing. `cols = ceil(W / pitch_x)` and
/// `rows = ceil(H / pitch_y)`, so the pattern always reaches every edge.
pub fn tile_grid(canvas: CanvasSize, stamp: LayerSize, spacing_x: u32, spacing_y: u32) -> TileGrid {
    let pitch_x = stamp.width.saturating_add(spacing_x).max(1);
    let pitch_y = stamp.height.saturating_add(spacing_y).max(1);

    let cols = canvas.width.div_ceil(pitch_x).max(1);
    let rows = canvas.height.div_ceil(pitch_y).max(1);

    let covered_w = cols as i64 * pitch_x as i64;
    let covered_h = rows as i64 * pitch_y as i64;

    TileGrid {
        cols,
        rows,
        pitch_x,
        pitch_y,
        offset: Position::new(
            (canvas.width as i64 - covered_w).div_euclid(2),
            (canvas.height as i64 - covered_h).div_euclid(2),
        ),
    }
}
