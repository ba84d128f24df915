//! Cross-size consistency checks.
//!
//! The size-1.0 variant is the contract for which runes the font supports.
//! Other variants may only cover a subset of it; anything they lack is
//! backfilled with a placeholder glyph and reported as a warning.

use crate::config::MissingGlyphPolicy;
use crate::model::{Font, Glyph, PixelMask, Rune, PERIOD_RUNE};
use crate::FontError;
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Validates `font` in place and returns the non-fatal warnings.
///
/// Every variant gets a stub mask even when no placeholder ends up using it.
pub fn validate_font(
    font: &mut Font,
    policy: MissingGlyphPolicy,
) -> Result<Vec<String>, FontError> {
    let base_index = font.base_index().ok_or_else(|| {
        FontError::validation_error(
            "can't find size=1 images",
            "Add a `1` size directory; it defines the supported rune set",
        )
    })?;

    if policy == MissingGlyphPolicy::Stub {
        for variant in &mut font.variants {
            variant.needs_stub = true;
        }
    }

    for variant in &font.variants {
        let mut seen: HashMap<Rune, &str> = HashMap::with_capacity(variant.glyphs.len());
        for glyph in &variant.glyphs {
            if let Some(mask) = &glyph.mask {
                if mask.width() != variant.glyph_width || mask.height() != variant.glyph_height {
                    return Err(FontError::validation_error(
                        format!(
                            "{}: found {}x{} image size, expected {}x{}",
                            glyph,
                            mask.width(),
                            mask.height(),
                            variant.glyph_width,
                            variant.glyph_height
                        ),
                        "All glyph images of one size must share the same dimensions",
                    ));
                }
            }
            if let Some(prev_tag) = seen.insert(glyph.rune, &glyph.tag) {
                return Err(FontError::validation_error(
                    format!("{}: duplicated rune, previously defined at {:?}", glyph, prev_tag),
                    "Remove one of the two images",
                ));
            }
        }
        if variant.period_mask().is_none() {
            return Err(FontError::validation_error(
                format!(
                    "{:.2}: missing a period `.` symbol (charcode={})",
                    variant.size, PERIOD_RUNE
                ),
                "Every size needs a `46.png` glyph to anchor the baseline",
            ));
        }
    }

    // Ordered so that warnings come out in rune order.
    let base_runes: BTreeMap<Rune, String> = font.variants[base_index]
        .glyphs
        .iter()
        .map(|g| (g.rune, g.tag.clone()))
        .collect();

    let mut warnings = Vec::new();
    for (i, variant) in font.variants.iter_mut().enumerate() {
        variant.stub_mask = PixelMask::hollow_rect(variant.glyph_width, variant.glyph_height);
        if i == base_index {
            continue;
        }

        let mut present = HashSet::with_capacity(variant.glyphs.len());
        for glyph in &variant.glyphs {
            if !base_runes.contains_key(&glyph.rune) {
                return Err(FontError::validation_error(
                    format!("{}: this rune is missing in size=1 variant", glyph),
                    "Add the rune to the size=1 variant or remove it from this size",
                ));
            }
            present.insert(glyph.rune);
        }

        for (&rune, tag) in &base_runes {
            if present.contains(&rune) {
                continue;
            }
            variant.needs_stub = true;
            let placeholder = Glyph::placeholder(rune, tag.clone(), variant.size);
            let message = format!("{}: using a placeholder image", placeholder);
            warn!("{}", message);
            warnings.push(message);
            variant.glyphs.push(placeholder);
        }
    }

    Ok(warnings)
}
