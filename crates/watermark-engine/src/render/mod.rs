//! Layer rendering
//!
//! Each watermark is rendered into its own transparent RGBA buffer at its
//! natural size. Rotation and placement happen later in the compositor.

pub mod font;
pub mod logo;
pub mod text;
pub mod transform;

pub use font::{load_font, locate_font};
pub use logo::{load_logo, render_logo_layer};
pub use text::{effective_font_size, render_text_layer, substitute_tokens};
pub use transform::{resize_to_fit, rotate_expand, scale_alpha, to_grayscale};
