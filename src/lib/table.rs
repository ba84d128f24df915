//! Builds the shipped rune tables from an encoded font.

use crate::model::{Rune, SizeVariant};
use crate::runtime::{FaceMetrics, RuneEntry};

/// Everything the runtime needs to know about one variant, minus the bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTable {
    pub size: f64,
    pub short_size_tag: String,
    pub bitmap_filename: String,
    pub glyph_width: u32,
    pub glyph_height: u32,
    pub dot_x: i32,
    pub dot_y: i32,
    pub min_rune: Rune,
    pub max_rune: Rune,
    pub stub_index: Option<u32>,
    pub entries: Vec<RuneEntry>,
}

impl CompiledTable {
    /// Scalar metrics for a [`crate::runtime::BitmapFace`].
    pub fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            size: self.size,
            glyph_width: self.glyph_width,
            glyph_height: self.glyph_height,
            dot_x: self.dot_x,
            dot_y: self.dot_y,
        }
    }
}

/// `(rune, data index)` pairs in rune order.
///
/// The variant must be sorted and encoded, so that duplicates and
/// placeholders already carry their representative's index.
pub fn build_rune_entries(variant: &SizeVariant) -> Vec<RuneEntry> {
    variant
        .glyphs
        .iter()
        .map(|g| RuneEntry::new(g.rune, g.data_index))
        .collect()
}

/// Snapshot of an encoded variant for the manifest, the code generator and
/// the runtime.
///
/// Call after [`crate::encoder::encode_variant`]: the bitmap filename, the
/// data indices and the stub index are only known once the blob is encoded.
pub fn build_table(variant: &SizeVariant) -> CompiledTable {
    CompiledTable {
        size: variant.size,
        short_size_tag: variant.short_size_tag.clone(),
        bitmap_filename: variant.bitmap_filename.clone(),
        glyph_width: variant.glyph_width as u32,
        glyph_height: variant.glyph_height as u32,
        dot_x: variant.dot_x,
        dot_y: variant.dot_y,
        min_rune: variant.min_rune,
        max_rune: variant.max_rune,
        stub_index: variant.stub_data_index,
        entries: build_rune_entries(variant),
    }
}

/// Whether every rune and data index fits a 16-bit table entry.
pub fn fits_compact(tables: &[CompiledTable]) -> bool {
    tables
        .iter()
        .flat_map(|t| t.entries.iter())
        .all(|e| e.rune < u16::MAX as Rune && e.index < u16::MAX as u32)
}
