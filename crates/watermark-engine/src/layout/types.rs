//! Layout data types
//!
//! These sit between a placement description and the compositor.

/// Size of the target image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn diagonal(&self) -> f32 {
        (self.width as f32).hypot(self.height as f32)
    }

    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// Natural (unrotated) size of a rendered layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSize {
    pub width: u32,
    pub height: u32,
}

impl LayerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of a layer on the canvas
///
/// Coordinates may be negative when the layer is larger than the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Repeating grid of stamps covering the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub cols: u32,
    pub rows: u32,
    /// Horizontal distance between stamp origins
    pub pitch_x: u32,
    /// Vertical distance between stamp origins
    pub pitch_y: u32,
    /// Origin of the first stamp
    pub offset: Position,
}

impl TileGrid {
    /// Number of stamps in the grid
    pub fn count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Origins of every stamp, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| {
                Position::new(
                    self.offset.x + col as i64 * self.pitch_x as i64,
                    self.offset.y + row as i64 * self.pitch_y as i64,
                )
            })
        })
    }
}

/// Where a layer lands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerOrigin {
    /// One copy with its natural box at this origin
    Single(Position),
    /// One copy per grid cell
    Tiled(TileGrid),
}

/// Fully resolved placement of one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPlacement {
    pub origin: LayerOrigin,
    /// Rotation in degrees, within [0, 360)
    pub rotation_degrees: f32,
}
