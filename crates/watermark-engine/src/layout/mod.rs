//! Geometry for watermark layers
//!
//! This module turns a [`crate::options::Placement`] into concrete canvas
//! coordinates:
//! - Fixed anchors (the nine-point grid plus margins)
//! - Tiled grids that cover the whole canvas
//! - Rotation normalization

mod placement;
mod tiling;
mod types;

pub use placement::*;
pub use tiling::*;
pub use types::*;
