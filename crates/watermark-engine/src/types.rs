use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Invalid profile field `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("Failed to load logo {path}: {reason}")]
    LogoLoad { path: PathBuf, reason: String },
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode output: {0}")]
    Encode(String),
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Output {path} is already claimed by source #{owner}")]
    NameCollision { path: PathBuf, owner: usize },
    #[error("Cancelled before completion")]
    Cancelled,
    #[error("Font error: {0}")]
    Font(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;

impl WatermarkError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } | Self::Font(_) => FailureKind::Validation,
            Self::LogoLoad { .. } => FailureKind::LogoLoad,
            Self::Decode { .. } => FailureKind::Decode,
            Self::Encode(_) | Self::TaskJoin(_) => FailureKind::Encode,
            Self::Filesystem { .. } => FailureKind::Filesystem,
            Self::NameCollision { .. } => FailureKind::NameCollision,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Category of a per-item failure, kept after the error itself is flattened
/// into an [`ItemFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    LogoLoad,
    Decode,
    Encode,
    Filesystem,
    NameCollision,
    Cancelled,
}

/// Cloneable description of why an item did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl From<&WatermarkError> for ItemFailure {
    fn from(err: &WatermarkError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Named canvas positions for a watermark layer.
///
/// The nine fixed anchors place a single copy relative to the canvas edges,
/// `Custom` places it at exact coordinates and `Tiled` repeats the layer
/// over the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
    /// Top-left corner at `custom_x`, `custom_y`
    Custom,
    Tiled,
}

/// Alignment of an anchor along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Middle,
    End,
}

impl Anchor {
    pub const FIXED: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::MiddleLeft,
        Anchor::Center,
        Anchor::MiddleRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    /// (horizontal, vertical) alignment, or `None` for custom and tiled
    /// placement.
    pub fn alignment(self) -> Option<(Align, Align)> {
        use Align::*;
        match self {
            Anchor::TopLeft => Some((Start, Start)),
            Anchor::TopCenter => Some((Middle, Start)),
            Anchor::TopRight => Some((End, Start)),
            Anchor::MiddleLeft => Some((Start, Middle)),
            Anchor::Center => Some((Middle, Middle)),
            Anchor::MiddleRight => Some((End, Middle)),
            Anchor::BottomLeft => Some((Start, End)),
            Anchor::BottomCenter => Some((Middle, End)),
            Anchor::BottomRight => Some((End, End)),
            Anchor::Custom | Anchor::Tiled => None,
        }
    }
}

/// Distance from the canvas edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margin {
    Px(u32),
    /// Percentage of the canvas extent along the same axis
    Percent(f32),
}

impl Default for Margin {
    fn default() -> Self {
        Margin::Px(20)
    }
}

impl Margin {
    /// Resolve to pixels against a canvas extent.
    pub fn resolve(self, extent: u32) -> i64 {
        match self {
            Margin::Px(px) => px as i64,
            Margin::Percent(pct) => {
                let pct = if pct.is_finite() { pct.max(0.0) } else { 0.0 };
                (extent as f64 * pct as f64 / 100.0).round() as i64
            }
        }
    }
}

/// 8-bit RGB color, serialized as `[r, g, b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    pub fn with_alpha(self, alpha: u8) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, alpha])
    }
}

/// Encoded output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// File extension including the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::Webp => ".webp",
        }
    }

    /// Whether the container can carry a re-attached EXIF block
    pub fn supports_exif(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}
