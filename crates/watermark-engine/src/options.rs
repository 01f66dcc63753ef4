use crate::constants::*;
use crate::render::font;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_opacity() -> f32 {
    DEFAULT_OPACITY_PERCENT
}

fn default_tile_spacing() -> u32 {
    DEFAULT_TILE_SPACING_PX
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE_PX
}

fn default_font() -> String {
    "DejaVuSans".to_string()
}

fn default_logo_scale() -> f32 {
    DEFAULT_LOGO_SCALE_PERCENT
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_shadow_offset() -> i32 {
    2
}

/// Where and how strongly a layer lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub margin_x: Margin,
    #[serde(default)]
    pub margin_y: Margin,
    /// Top-left corner for [`Anchor::Custom`], in canvas pixels
    #[serde(default)]
    pub custom_x: i64,
    #[serde(default)]
    pub custom_y: i64,
    /// Counter-clockwise rotation about the layer center
    #[serde(default)]
    pub rotation_degrees: f32,
    #[serde(default = "default_opacity")]
    pub opacity_percent: f32,
    /// Gap between neighbouring stamps in tiled mode
    #[serde(default = "default_tile_spacing")]
    pub tile_spacing_x: u32,
    #[serde(default = "default_tile_spacing")]
    pub tile_spacing_y: u32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            anchor: Anchor::default(),
            margin_x: Margin::default(),
            margin_y: Margin::default(),
            custom_x: 0,
            custom_y: 0,
            rotation_degrees: 0.0,
            opacity_percent: DEFAULT_OPACITY_PERCENT,
            tile_spacing_x: DEFAULT_TILE_SPACING_PX,
            tile_spacing_y: DEFAULT_TILE_SPACING_PX,
        }
    }
}

impl Placement {
    /// Copy with opacity clamped to 0..=100 and rotation folded into [0, 360)
    pub fn clamped(&self) -> Placement {
        Placement {
            opacity_percent: self.opacity_percent.clamp(0.0, 100.0),
            rotation_degrees: crate::layout::normalize_rotation(self.rotation_degrees),
            ..*self
        }
    }

    /// Opacity as a 0.0..=1.0 factor
    pub fn opacity_factor(&self) -> f32 {
        self.opacity_percent.clamp(0.0, 100.0) / 100.0
    }

    fn validate(&self, prefix: &str) -> Result<()> {
        if !self.rotation_degrees.is_finite() {
            return Err(WatermarkError::validation(
                format!("{prefix}.placement.rotation_degrees"),
                "must be a finite number",
            ));
        }
        if !self.opacity_percent.is_finite() {
            return Err(WatermarkError::validation(
                format!("{prefix}.placement.opacity_percent"),
                "must be a finite number",
            ));
        }
        for (axis, margin) in [("margin_x", self.margin_x), ("margin_y", self.margin_y)] {
            if let Margin::Percent(pct) = margin {
                if !pct.is_finite() {
                    return Err(WatermarkError::validation(
                        format!("{prefix}.placement.{axis}"),
                        "percent must be a finite number",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Drop shadow drawn beneath text glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shadow {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_shadow_offset")]
    pub offset_x: i32,
    #[serde(default = "default_shadow_offset")]
    pub offset_y: i32,
    #[serde(default)]
    pub color: Rgb,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: false,
            offset_x: 2,
            offset_y: 2,
            color: Rgb::BLACK,
        }
    }
}

fn default_outline_width() -> u32 {
    MIN_OUTLINE_WIDTH_PX
}

/// Ring of outline color drawn around each glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_outline_width")]
    pub width_px: u32,
    #[serde(default)]
    pub color: Rgb,
}

impl Default for Outline {
    fn default() -> Self {
        Self {
            enabled: false,
            width_px: MIN_OUTLINE_WIDTH_PX,
            color: Rgb::BLACK,
        }
    }
}

impl Outline {
    /// Width clamped to the supported range, 0 when disabled
    pub fn width(&self) -> u32 {
        if self.enabled {
            self.width_px.clamp(MIN_OUTLINE_WIDTH_PX, MAX_OUTLINE_WIDTH_PX)
        } else {
            0
        }
    }
}

/// Text watermark.
///
/// `content` may contain metadata tokens such as `{camera}` or `{date}`;
/// see [`crate::metadata::MetadataToken`] for the full set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    pub content: String,
    /// Font file path or family name
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size_px: f32,
    #[serde(default = "rgb_white")]
    pub color: Rgb,
    #[serde(default)]
    pub shadow: Shadow,
    #[serde(default)]
    pub outline: Outline,
    /// Scale the font with the canvas diagonal
    #[serde(default)]
    pub scale_with_image: bool,
    #[serde(default)]
    pub placement: Placement,
}

fn rgb_white() -> Rgb {
    Rgb::WHITE
}

impl TextSpec {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font: default_font(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            color: Rgb::WHITE,
            shadow: Shadow::default(),
            outline: Outline::default(),
            scale_with_image: false,
            placement: Placement::default(),
        }
    }

    /// Font size clamped to the supported range
    pub fn font_size(&self) -> f32 {
        if self.font_size_px.is_finite() {
            self.font_size_px.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX)
        } else {
            DEFAULT_FONT_SIZE_PX
        }
    }
}

/// Logo watermark loaded from a raster file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub logo_path: PathBuf,
    /// Logo width as a percentage of the canvas's shorter side
    #[serde(default = "default_logo_scale")]
    pub scale_percent: f32,
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub placement: Placement,
}

impl ImageSpec {
    pub fn new(logo_path: impl Into<PathBuf>) -> Self {
        Self {
            logo_path: logo_path.into(),
            scale_percent: DEFAULT_LOGO_SCALE_PERCENT,
            grayscale: false,
            placement: Placement::default(),
        }
    }

    /// Scale clamped to the supported range
    pub fn scale(&self) -> f32 {
        if self.scale_percent.is_finite() {
            self.scale_percent.clamp(MIN_SCALE_PERCENT, MAX_SCALE_PERCENT)
        } else {
            DEFAULT_LOGO_SCALE_PERCENT
        }
    }
}

/// One watermark layer of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkSpec {
    Text(TextSpec),
    Image(ImageSpec),
}

impl WatermarkSpec {
    pub fn placement(&self) -> &Placement {
        match self {
            WatermarkSpec::Text(spec) => &spec.placement,
            WatermarkSpec::Image(spec) => &spec.placement,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let prefix = format!("watermarks[{index}]");
        self.placement().validate(&prefix)?;

        match self {
            WatermarkSpec::Text(spec) => {
                if spec.content.trim().is_empty() {
                    return Err(WatermarkError::validation(
                        format!("{prefix}.content"),
                        "text content is empty",
                    ));
                }
                if font::locate_font(&spec.font).is_none() {
                    return Err(WatermarkError::validation(
                        format!("{prefix}.font"),
                        format!("font '{}' could not be resolved", spec.font),
                    ));
                }
            }
            WatermarkSpec::Image(spec) => {
                if !spec.logo_path.is_file() {
                    return Err(WatermarkError::LogoLoad {
                        path: spec.logo_path.clone(),
                        reason: "file does not exist".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Shrink outputs to fit within these bounds, keeping aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputResize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

/// Encoding and naming of output files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_quality")]
    pub quality_percent: u8,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_true")]
    pub preserve_exif: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<OutputResize>,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality_percent: DEFAULT_QUALITY,
            prefix: String::new(),
            suffix: DEFAULT_SUFFIX.to_string(),
            preserve_exif: true,
            resize: None,
        }
    }
}

impl OutputSpec {
    pub fn quality(&self) -> u8 {
        self.quality_percent.clamp(MIN_QUALITY, MAX_QUALITY)
    }

    /// Output file name for a source path: `prefix + stem + suffix + ext`
    pub fn file_name_for(&self, source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        format!(
            "{}{}{}{}",
            self.prefix,
            stem,
            self.suffix,
            self.format.extension()
        )
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [("output.prefix", &self.prefix), ("output.suffix", &self.suffix)] {
            if value.contains(['/', '\\']) {
                return Err(WatermarkError::validation(
                    field,
                    "must not contain path separators",
                ));
            }
        }
        if let Some(resize) = self.resize {
            if resize.max_width == Some(0) || resize.max_height == Some(0) {
                return Err(WatermarkError::validation(
                    "output.resize",
                    "bounds must be at least 1 pixel",
                ));
            }
        }
        Ok(())
    }
}

/// Named, ordered set of watermarks plus output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub watermarks: Vec<WatermarkSpec>,
    #[serde(default)]
    pub output: OutputSpec,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: None,
            watermarks: Vec::new(),
            output: OutputSpec::default(),
        }
    }
}

impl Profile {
    /// Parse a profile document. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            let message = e.to_string();
            let field = missing_field_name(&message).unwrap_or("profile").to_string();
            WatermarkError::Validation { field, message }
        })
    }

    /// Serialize to the canonical pretty-printed document
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| WatermarkError::validation("profile", e.to_string()))?;
        json.push('\n');
        Ok(json)
    }

    /// Load a profile from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| WatermarkError::filesystem(path, e))?;
        Self::from_json(&json)
    }

    /// Save the profile to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| WatermarkError::filesystem(path, e))
    }

    /// Validate the profile before any image is touched
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WatermarkError::validation("name", "profile name is empty"));
        }
        for (index, spec) in self.watermarks.iter().enumerate() {
            spec.validate(index)?;
        }
        self.output.validate()
    }
}

/// Pull `foo` out of serde's "missing field `foo`" message
fn missing_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_name() {
        assert_eq!(
            missing_field_name("missing field `content` at line 3 column 5"),
            Some("content")
        );
        assert_eq!(missing_field_name("invalid type: string"), None);
    }

    #[test]
    fn test_file_name_for() {
        let output = OutputSpec {
            prefix: "wm_".to_string(),
            suffix: "_final".to_string(),
            format: OutputFormat::Png,
            ..Default::default()
        };
        assert_eq!(
            output.file_name_for(Path::new("/photos/IMG_0001.JPG")),
            "wm_IMG_0001_final.png"
        );
    }

    #[test]
    fn test_clamped_placement() {
        let placement = Placement {
            opacity_percent: 140.0,
            rotation_degrees: -90.0,
            ..Default::default()
        };
        let clamped = placement.clamped();
        assert_eq!(clamped.opacity_percent, 100.0);
        assert_eq!(clamped.rotation_degrees, 270.0);
    }

    #[test]
    fn test_outline_width_clamped() {
        let mut outline = Outline {
            width_px: 40,
            ..Default::default()
        };
        assert_eq!(outline.width(), 0);
        outline.enabled = true;
        assert_eq!(outline.width(), MAX_OUTLINE_WIDTH_PX);
        outline.width_px = 0;
        assert_eq!(outline.width(), MIN_OUTLINE_WIDTH_PX);
    }

    #[test]
    fn test_text_font_size_clamped() {
        let mut spec = TextSpec::new("hello");
        spec.font_size_px = 2.0;
        assert_eq!(spec.font_size(), MIN_FONT_SIZE_PX);
        spec.font_size_px = 9000.0;
        assert_eq!(spec.font_size(), MAX_FONT_SIZE_PX);
    }
}
