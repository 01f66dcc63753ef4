//! Font resolution
//!
//! A font is named either by a path to a `.ttf`/`.otf`/`.ttc` file or by a
//! family name such as `DejaVuSans`, which is looked up in the platform
//! font directories.

use crate::types::{Result, WatermarkError};
use ab_glyph::FontArc;
use std::path::{Path, PathBuf};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Directories searched for family names, in order
fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    if let Some(windir) = std::env::var_os("WINDIR") {
        dirs.push(PathBuf::from(windir).join("Fonts"));
    }
    dirs
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lowercase with spaces, dashes and underscores removed
fn normalize_family(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn search_dir(dir: &Path, wanted: &str, depth: usize) -> Option<PathBuf> {
    if depth > 6 {
        return None;
    }
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if has_font_extension(&path) {
            let stem = path
                .file_stem()
                .map(|s| normalize_family(&s.to_string_lossy()))
                .unwrap_or_default();
            if stem == wanted {
                return Some(path);
            }
        }
    }

    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| search_dir(sub, wanted, depth + 1))
}

/// Find the file for a font path or family name
pub fn locate_font(name: &str) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let as_path = Path::new(name);
    if as_path.is_file() {
        return Some(as_path.to_path_buf());
    }

    let wanted = normalize_family(
        as_path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .as_deref()
            .unwrap_or(name),
    );
    font_dirs()
        .iter()
        .filter(|dir| dir.is_dir())
        .find_map(|dir| search_dir(dir, &wanted, 0))
}

/// Resolve and parse a font
pub fn load_font(name: &str) -> Result<FontArc> {
    let path = locate_font(name).ok_or_else(|| {
        WatermarkError::Font(format!("font '{name}' not found in any font directory"))
    })?;
    let data = std::fs::read(&path).map_err(|e| WatermarkError::filesystem(&path, e))?;
    log::debug!("Loaded font '{}' from {}", name, path.display());
    FontArc::try_from_vec(data)
        .map_err(|e| WatermarkError::Font(format!("{}: {}", path.display(), e)))
}
