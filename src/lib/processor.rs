//! Derived per-size metrics and glyph deduplication.

use crate::config::CompilerConfig;
use crate::model::{size_tag, Font, PixelMask, SizeVariant};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Runs every processing pass over a validated font.
pub fn process_font(font: &mut Font, config: &CompilerConfig) {
    for variant in &mut font.variants {
        variant.glyphs.sort_by_key(|g| g.rune);
        assign_size_tags(variant);
        compute_rune_range(variant);
        compute_dot(variant);
        deduplicate(variant, config);
    }
}

/// `1.5` becomes `1_50` (fixed) and `1_5` (short).
pub fn assign_size_tags(variant: &mut SizeVariant) {
    variant.size_tag = size_tag(variant.size);
    variant.short_size_tag = format!("{}", variant.size).replacen('.', "_", 1);
}

pub fn compute_rune_range(variant: &mut SizeVariant) {
    variant.min_rune = variant.glyphs.iter().map(|g| g.rune).min().unwrap_or(0);
    variant.max_rune = variant.glyphs.iter().map(|g| g.rune).max().unwrap_or(0);
}

/// Computes the pen-origin offset.
///
/// `dot_x` is the leftmost inked column over all real glyphs, `dot_y` the
/// lowest inked row of the period glyph.
pub fn compute_dot(variant: &mut SizeVariant) {
    variant.dot_x = variant
        .glyphs
        .iter()
        .filter(|g| !g.is_stub)
        .filter_map(|g| g.mask.as_ref())
        .filter_map(leftmost_column)
        .min()
        .unwrap_or(0) as i32;

    variant.dot_y = variant
        .period_mask()
        .and_then(bottom_row)
        .unwrap_or(0) as i32;
}

fn leftmost_column(mask: &PixelMask) -> Option<usize> {
    (0..mask.width()).find(|&x| (0..mask.height()).any(|y| mask.is_opaque(x, y)))
}

fn bottom_row(mask: &PixelMask) -> Option<usize> {
    (0..mask.height())
        .rev()
        .find(|&y| (0..mask.width()).any(|x| mask.is_opaque(x, y)))
}

/// Points every glyph whose mask repeats an earlier one at that earlier glyph.
///
/// Must run after sorting: the pointers are indices into `variant.glyphs`.
pub fn deduplicate(variant: &mut SizeVariant, config: &CompilerConfig) {
    let mut first_seen: HashMap<Vec<u8>, usize> = HashMap::with_capacity(variant.glyphs.len());
    for i in 0..variant.glyphs.len() {
        let key = match &variant.glyphs[i].mask {
            Some(mask) if !variant.glyphs[i].is_stub => mask.fingerprint(),
            _ => continue,
        };
        match first_seen.entry(key) {
            Entry::Occupied(entry) => {
                let original = *entry.get();
                config.trace(&format!(
                    "{}: re-use image from {}",
                    variant.glyphs[i], variant.glyphs[original]
                ));
                variant.glyphs[i].duplicate_of = Some(original);
            }
            Entry::Vacant(entry) => {
                entry.insert(i);
            }
        }
    }
}
