//! Job-level rendering state.
//!
//! A [`PreparedProfile`] is a validated profile with its fonts and logos
//! already loaded. It is immutable and shared by every worker of a batch.

use crate::composite::{Compositor, PlacedLayer};
use crate::layout::CanvasSize;
use crate::metadata::ImageMetadata;
use crate::options::{ImageSpec, Profile, TextSpec, WatermarkSpec};
use crate::render::{load_font, load_logo, render_logo_layer, render_text_layer, substitute_tokens};
use crate::types::{Result, WatermarkError};
use ab_glyph::FontArc;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

enum PreparedLayer {
    Text { spec: TextSpec, font: FontArc },
    Image { spec: ImageSpec, logo: Arc<RgbaImage> },
}

/// Validated profile plus the assets it needs
pub struct PreparedProfile {
    profile: Profile,
    layers: Vec<PreparedLayer>,
}

impl std::fmt::Debug for PreparedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedProfile")
            .field("name", &self.profile.name)
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl PreparedProfile {
    /// Validate the profile and load every font and logo it references.
    ///
    /// Blocking; see [`PreparedProfile::prepare_async`].
    pub fn prepare(profile: Profile) -> Result<Self> {
        profile.validate()?;

        let mut fonts: HashMap<String, FontArc> = HashMap::new();
        let mut logos: HashMap<std::path::PathBuf, Arc<RgbaImage>> = HashMap::new();
        let mut layers = Vec::with_capacity(profile.watermarks.len());

        for (index, spec) in profile.watermarks.iter().enumerate() {
            match spec {
                WatermarkSpec::Text(text) => {
                    let font = match fonts.get(&text.font) {
                        Some(font) => font.clone(),
                        None => {
                            let font = load_font(&text.font).map_err(|e| {
                                WatermarkError::validation(
                                    format!("watermarks[{index}].font"),
                                    e.to_string(),
                                )
                            })?;
                            fonts.insert(text.font.clone(), font.clone());
                            font
                        }
                    };
                    layers.push(PreparedLayer::Text {
                        spec: text.clone(),
                        font,
                    });
                }
                WatermarkSpec::Image(image) => {
                    let logo = match logos.get(&image.logo_path) {
                        Some(logo) => logo.clone(),
                        None => {
                            let logo = load_logo(&image.logo_path)?;
                            logos.insert(image.logo_path.clone(), logo.clone());
                            logo
                        }
                    };
                    layers.push(PreparedLayer::Image {
                        spec: image.clone(),
                        logo,
                    });
                }
            }
        }

        log::debug!(
            "Prepared profile '{}': {} layer(s), {} font(s), {} logo(s)",
            profile.name,
            layers.len(),
            fonts.len(),
            logos.len()
        );

        Ok(Self { profile, layers })
    }

    /// [`PreparedProfile::prepare`] on the blocking pool
    pub async fn prepare_async(profile: Profile) -> Result<Arc<Self>> {
        tokio::task::spawn_blocking(move || Self::prepare(profile).map(Arc::new)).await?
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Render every layer for one target canvas
    pub fn build_compositor(&self, canvas: CanvasSize, metadata: &ImageMetadata) -> Compositor {
        let mut compositor = Compositor::new();

        for layer in &self.layers {
            let placed = match layer {
                PreparedLayer::Text { spec, font } => {
                    let text = substitute_tokens(&spec.content, metadata);
                    PlacedLayer {
                        image: render_text_layer(font, spec, &text, canvas),
                        placement: spec.placement.clamped(),
                    }
                }
                PreparedLayer::Image { spec, logo } => PlacedLayer {
                    image: render_logo_layer(logo, spec, canvas),
                    placement: spec.placement.clamped(),
                },
            };
            compositor.add_layer(placed);
        }

        compositor
    }

    /// Composite every watermark onto `image` in declaration order
    pub fn apply(&self, image: &mut RgbaImage, metadata: &ImageMetadata) {
        let canvas = CanvasSize::new(image.width(), image.height());
        self.build_compositor(canvas, metadata).apply(image);
    }
}
