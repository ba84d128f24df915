//! Reads a `size/tag/rune.png` directory tree into a [`Font`].
//!
//! Size directories must be named with a non-negative real number and glyph
//! files with an integer code point. The first image decoded in a size
//! variant fixes that variant's glyph dimensions; mismatches are reported by
//! the validator, not here. Two directories naming the same size, or sizes
//! that share a size tag, are rejected here.

use crate::config::CompilerConfig;
use crate::model::{size_tag, Font, Glyph, PixelMask, Rune, SizeVariant};
use crate::FontError;
use log::{debug, info};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads every size variant under `config.data_dir`.
pub fn load_font(config: &CompilerConfig) -> Result<Font, FontError> {
    let mut font = Font::default();
    // size tag -> (size, directory name) of the variant that claimed it
    let mut claimed: HashMap<String, (f64, String)> = HashMap::new();

    for (name, path) in list_dir(&config.data_dir)? {
        let size = parse_size(&name, &path)?;
        claim_size(&mut claimed, size, &name)?;
        let variant = load_variant(config, &path, size)
            .map_err(|e| e.context(format!("size {:.2}", size)))?;
        info!(
            "Loaded size {} with {} glyphs ({}x{})",
            size,
            variant.glyphs.len(),
            variant.glyph_width,
            variant.glyph_height
        );
        font.variants.push(variant);
    }

    Ok(font)
}

/// Rejects a size directory whose size, or whose size tag, was already seen.
fn claim_size(
    claimed: &mut HashMap<String, (f64, String)>,
    size: f64,
    name: &str,
) -> Result<(), FontError> {
    match claimed.entry(size_tag(size)) {
        Entry::Occupied(entry) => {
            let (prev_size, prev_name) = entry.get();
            let message = if *prev_size == size {
                format!(
                    "size directories {:?} and {:?} both define size {}",
                    prev_name, name, size
                )
            } else {
                format!(
                    "size directories {:?} and {:?} share the size tag {:?}",
                    prev_name,
                    name,
                    entry.key()
                )
            };
            Err(FontError::validation_error(
                message,
                "Merge the two directories or pick sizes that differ in the first two decimals",
            ))
        }
        Entry::Vacant(entry) => {
            entry.insert((size, name.to_string()));
            Ok(())
        }
    }
}

fn load_variant(config: &CompilerConfig, dir: &Path, size: f64) -> Result<SizeVariant, FontError> {
    let mut variant = SizeVariant::new(size);

    for (tag, path) in list_dir(dir)? {
        if !config.includes_tag(&tag) {
            config.trace(&format!("{:.2}: skip {:?} tag", size, tag));
            continue;
        }
        let glyphs = load_tag(&path, &tag, size).map_err(|e| e.context(format!("{:?}", tag)))?;
        if variant.glyph_width == 0 {
            if let Some(mask) = glyphs.first().and_then(|g| g.mask.as_ref()) {
                variant.glyph_width = mask.width();
                variant.glyph_height = mask.height();
            }
        }
        variant.glyphs.extend(glyphs);
    }

    Ok(variant)
}

fn load_tag(dir: &Path, tag: &str, size: f64) -> Result<Vec<Glyph>, FontError> {
    let entries = list_dir(dir)?;
    let mut glyphs = Vec::with_capacity(entries.len());
    for (file_name, path) in entries {
        let rune = parse_rune(&file_name, &path)?;
        let mask = decode_mask(&path)?;
        debug!("{:.2}/{}: loaded rune {} from {}", size, tag, rune, path.display());
        glyphs.push(Glyph::new(rune, tag, size, mask));
    }
    Ok(glyphs)
}

/// Decodes an image file into an opacity mask. Any non-zero alpha is opaque.
pub fn decode_mask(path: &Path) -> Result<PixelMask, FontError> {
    let bytes = fs::read(path).map_err(|e| FontError::io_error(e.to_string(), path))?;
    let img = image::load_from_memory(&bytes).map_err(|e| FontError::IoError {
        message: format!("decode image: {}", e),
        path: path.display().to_string(),
        suggestion: "Make sure the file is a valid PNG image".to_string(),
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(PixelMask::from_fn(width as usize, height as usize, |x, y| {
        rgba.get_pixel(x as u32, y as u32).0[3] != 0
    }))
}

/// Directory entries as `(file name, path)`, sorted by name.
/// Hidden entries (leading `.`) are ignored.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>, FontError> {
    let read = fs::read_dir(dir).map_err(|e| FontError::io_error(e.to_string(), dir))?;
    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| FontError::io_error(e.to_string(), dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.path()));
    }
    entries.sort();
    Ok(entries)
}

fn parse_size(label: &str, path: &Path) -> Result<f64, FontError> {
    match label.parse::<f64>() {
        Ok(size) if size.is_finite() && size >= 0.0 => Ok(size),
        _ => Err(FontError::parse_error(
            format!("parsing {:?} as a font size", label),
            path,
        )),
    }
}

fn parse_rune(file_name: &str, path: &Path) -> Result<Rune, FontError> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.parse::<Rune>().map_err(|e| {
        FontError::parse_error(
            format!("parse filename {:?} as rune value: {}", file_name, e),
            path,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_accepts_reals() {
        assert_eq!(parse_size("1", Path::new("1")).unwrap(), 1.0);
        assert_eq!(parse_size("1.5", Path::new("1.5")).unwrap(), 1.5);
        assert!(parse_size("-2", Path::new("-2")).is_err());
        assert!(parse_size("big", Path::new("big")).is_err());
        assert!(parse_size("NaN", Path::new("NaN")).is_err());
    }

    #[test]
    fn test_parse_rune_strips_extension() {
        assert_eq!(parse_rune("65.png", Path::new("65.png")).unwrap(), 65);
        assert_eq!(parse_rune("1025", Path::new("1025")).unwrap(), 1025);
        assert!(matches!(
            parse_rune("A.png", Path::new("A.png")),
            Err(FontError::ParseError { .. })
        ));
    }

    #[test]
    fn test_claim_size_rejects_equal_sizes_and_tag_collisions() {
        let mut claimed = HashMap::new();
        claim_size(&mut claimed, 1.0, "1").unwrap();
        claim_size(&mut claimed, 0.123, "0.123").unwrap();

        let err = claim_size(&mut claimed, 1.0, "1.0").unwrap_err().to_string();
        assert!(err.contains("\"1\" and \"1.0\" both define size 1"), "{}", err);

        let err = claim_size(&mut claimed, 0.124, "0.124").unwrap_err().to_string();
        assert!(err.contains("share the size tag \"0_12\""), "{}", err);

        claim_size(&mut claimed, 2.0, "2").unwrap();
    }

    #[test]
    fn test_missing_data_dir_is_io_error() {
        let config = CompilerConfig::new("definitely/not/here", "font");
        assert!(matches!(load_font(&config), Err(FontError::IoError { .. })));
    }
}
