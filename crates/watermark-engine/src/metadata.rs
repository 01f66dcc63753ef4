//! Metadata extraction and EXIF pass-through.
//!
//! Extraction never fails: missing or corrupt EXIF simply yields fewer
//! values. The raw TIFF payload is kept byte-for-byte so it can be
//! re-attached to JPEG outputs.

use exif::{In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// Values that can be referenced from text watermarks as `{name}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataToken {
    Date,
    Time,
    DateTime,
    Camera,
    Make,
    Lens,
    Aperture,
    Shutter,
    Iso,
    FocalLength,
    Copyright,
    Artist,
    Filename,
    Width,
    Height,
}

impl MetadataToken {
    pub const ALL: [MetadataToken; 15] = [
        MetadataToken::Date,
        MetadataToken::Time,
        MetadataToken::DateTime,
        MetadataToken::Camera,
        MetadataToken::Make,
        MetadataToken::Lens,
        MetadataToken::Aperture,
        MetadataToken::Shutter,
        MetadataToken::Iso,
        MetadataToken::FocalLength,
        MetadataToken::Copyright,
        MetadataToken::Artist,
        MetadataToken::Filename,
        MetadataToken::Width,
        MetadataToken::Height,
    ];

    /// Name used inside braces
    pub fn name(self) -> &'static str {
        match self {
            MetadataToken::Date => "date",
            MetadataToken::Time => "time",
            MetadataToken::DateTime => "datetime",
            MetadataToken::Camera => "camera",
            MetadataToken::Make => "make",
            MetadataToken::Lens => "lens",
            MetadataToken::Aperture => "aperture",
            MetadataToken::Shutter => "shutter",
            MetadataToken::Iso => "iso",
            MetadataToken::FocalLength => "focal_length",
            MetadataToken::Copyright => "copyright",
            MetadataToken::Artist => "artist",
            MetadataToken::Filename => "filename",
            MetadataToken::Width => "width",
            MetadataToken::Height => "height",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.name() == name)
    }

    /// Short human description with an example value
    pub fn description(self) -> &'static str {
        match self {
            MetadataToken::Date => "capture date (2024-06-01)",
            MetadataToken::Time => "capture time (14:30:05)",
            MetadataToken::DateTime => "capture date and time (2024-06-01 14:30:05)",
            MetadataToken::Camera => "camera model (EOS R5)",
            MetadataToken::Make => "camera maker (Canon)",
            MetadataToken::Lens => "lens model (RF24-70mm F2.8 L IS USM)",
            MetadataToken::Aperture => "f-number (f/2.8)",
            MetadataToken::Shutter => "exposure time (1/250s)",
            MetadataToken::Iso => "sensitivity (ISO 400)",
            MetadataToken::FocalLength => "focal length (50mm)",
            MetadataToken::Copyright => "copyright notice",
            MetadataToken::Artist => "artist or photographer",
            MetadataToken::Filename => "source file name (IMG_0001.jpg)",
            MetadataToken::Width => "source width in pixels",
            MetadataToken::Height => "source height in pixels",
        }
    }
}

impl std::fmt::Display for MetadataToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Values extracted from one source image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    values: BTreeMap<MetadataToken, String>,
    /// TIFF-structured EXIF payload exactly as found in the source
    pub raw_exif: Option<Arc<[u8]>>,
}

impl ImageMetadata {
    pub fn get(&self, token: MetadataToken) -> Option<&str> {
        self.values.get(&token).map(String::as_str)
    }

    /// Set a value; empty strings are treated as absent
    pub fn insert(&mut self, token: MetadataToken, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&token);
        } else {
            self.values.insert(token, value);
        }
    }
}

/// Gather metadata for one source.
///
/// # Arguments
///
/// * `bytes` - Encoded source file
/// * `path` - Source path, used for `{filename}`
/// * `dimensions` - Decoded image size, used for `{width}` and `{height}`
pub fn extract_metadata(bytes: &[u8], path: &Path, dimensions: (u32, u32)) -> ImageMetadata {
    let mut meta = ImageMetadata::default();

    if let Some(name) = path.file_name() {
        meta.insert(MetadataToken::Filename, name.to_string_lossy());
    }
    meta.insert(MetadataToken::Width, dimensions.0.to_string());
    meta.insert(MetadataToken::Height, dimensions.1.to_string());

    match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => {
            read_exif_fields(&exif, &mut meta);
            if !exif.buf().is_empty() {
                meta.raw_exif = Some(Arc::from(exif.buf()));
            }
        }
        Err(e) => {
            log::debug!("No EXIF in {}: {}", path.display(), e);
        }
    }

    meta
}

fn read_exif_fields(exif: &exif::Exif, meta: &mut ImageMetadata) {
    let field = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(|f| &f.value);

    if let Some(v) = field(Tag::Make).and_then(ascii) {
        meta.insert(MetadataToken::Make, v);
    }
    if let Some(v) = field(Tag::Model).and_then(ascii) {
        meta.insert(MetadataToken::Camera, v);
    }
    if let Some(v) = field(Tag::LensModel).and_then(ascii) {
        meta.insert(MetadataToken::Lens, v);
    }
    if let Some(v) = field(Tag::Copyright).and_then(ascii) {
        meta.insert(MetadataToken::Copyright, v);
    }
    if let Some(v) = field(Tag::Artist).and_then(ascii) {
        meta.insert(MetadataToken::Artist, v);
    }

    if let Some(f) = field(Tag::FNumber).and_then(rational) {
        meta.insert(MetadataToken::Aperture, format!("f/{:.1}", f.to_f64()));
    }
    if let Some(r) = field(Tag::ExposureTime).and_then(rational) {
        meta.insert(MetadataToken::Shutter, format_shutter(r.num, r.denom));
    }
    if let Some(r) = field(Tag::FocalLength).and_then(rational) {
        meta.insert(MetadataToken::FocalLength, format!("{:.0}mm", r.to_f64()));
    }
    if let Some(iso) = field(Tag::PhotographicSensitivity).and_then(|v| v.get_uint(0)) {
        meta.insert(MetadataToken::Iso, format!("ISO {iso}"));
    }

    let stamp = field(Tag::DateTimeOriginal)
        .and_then(ascii)
        .or_else(|| field(Tag::DateTime).and_then(ascii));
    if let Some(stamp) = stamp {
        let (date, time) = split_exif_datetime(&stamp);
        if let Some(time) = time {
            meta.insert(MetadataToken::DateTime, format!("{date} {time}"));
            meta.insert(MetadataToken::Time, time);
        } else {
            meta.insert(MetadataToken::DateTime, date.clone());
        }
        meta.insert(MetadataToken::Date, date);
    }
}

fn ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => {
            let first = parts.first()?;
            let text = String::from_utf8_lossy(first);
            let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

fn rational(value: &Value) -> Option<exif::Rational> {
    match value {
        Value::Rational(values) => values.first().cloned().filter(|r| r.denom != 0),
        _ => None,
    }
}

/// `1/250s` for unit numerators, `num/denom s` otherwise
fn format_shutter(num: u32, denom: u32) -> String {
    if num == 1 {
        format!("1/{denom}s")
    } else if denom == 1 {
        format!("{num}s")
    } else {
        format!("{num}/{denom}s")
    }
}

/// Split `YYYY:MM:DD HH:MM:SS` into `YYYY-MM-DD` and `HH:MM:SS`
fn split_exif_datetime(stamp: &str) -> (String, Option<String>) {
    match stamp.split_once(' ') {
        Some((date, time)) => (date.replace(':', "-"), Some(time.trim().to_string())),
        None => (stamp.replace(':', "-"), None),
    }
}

/// Insert an EXIF APP1 segment into an encoded JPEG.
///
/// Any existing EXIF segment is replaced. The new one goes after the
/// leading APPn segments. Returns false when the JPEG is malformed or the
/// payload does not fit in a single segment.
pub fn attach_exif(jpeg: &mut Vec<u8>, tiff: &[u8]) -> bool {
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return false;
    }
    let payload_len = EXIF_HEADER.len() + tiff.len();
    if payload_len + 2 > u16::MAX as usize {
        log::warn!("Skipping EXIF: {} bytes exceed one APP1 segment", tiff.len());
        return false;
    }

    remove_exif_segment(jpeg);

    let mut insert_pos = 2;
    while insert_pos + 4 <= jpeg.len() && jpeg[insert_pos] == 0xFF {
        let marker = jpeg[insert_pos + 1];
        if !(0xE0..=0xEF).contains(&marker) {
            break;
        }
        let len = segment_len(jpeg, insert_pos);
        if len < 2 {
            break;
        }
        insert_pos += 2 + len;
    }
    let insert_pos = insert_pos.min(jpeg.len());

    let mut segment = Vec::with_capacity(payload_len + 4);
    segment.extend_from_slice(&[0xFF, 0xE1]);
    segment.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(tiff);
    jpeg.splice(insert_pos..insert_pos, segment);
    true
}

fn segment_len(jpeg: &[u8], pos: usize) -> usize {
    ((jpeg[pos + 2] as usize) << 8) | jpeg[pos + 3] as usize
}

fn remove_exif_segment(jpeg: &mut Vec<u8>) {
    let mut scan = 2;
    while scan + 4 <= jpeg.len() && jpeg[scan] == 0xFF {
        let marker = jpeg[scan + 1];
        if marker == 0xDA {
            break;
        }
        let len = segment_len(jpeg, scan);
        if len < 2 {
            break;
        }
        let end = (scan + 2 + len).min(jpeg.len());
        if marker == 0xE1 && jpeg[scan + 4..end].starts_with(EXIF_HEADER) {
            jpeg.drain(scan..end);
            return;
        }
        scan = end;
    }
}
