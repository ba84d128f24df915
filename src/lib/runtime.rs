//! Glyph lookup at render time.
//!
//! A [`BitmapFace`] owns one size variant's decompressed bit stream and its
//! sorted rune table. Lookups go through a [`Resolver`], which remembers the
//! last binary-search hit: when text walks through a contiguous block of
//! runes the next entry is found with one comparison.
//!
//! The cache lives in a `Cell`, so a face is `Send` but not `Sync`. Threads
//! that render concurrently should each hold their own clone; clones share
//! the immutable table and bitmap.

use crate::config::MissingGlyphPolicy;
use crate::encoder;
use crate::manifest::{self, MANIFEST_FILE};
use crate::model::{PixelMask, Rune};
use crate::table::CompiledTable;
use crate::FontError;
use log::debug;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use unicode_general_category::{get_general_category, GeneralCategory};

/// One row of a compiled rune table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuneEntry {
    pub rune: Rune,
    pub index: u32,
}

impl RuneEntry {
    pub const fn new(rune: Rune, index: u32) -> Self {
        RuneEntry { rune, index }
    }
}

/// Sorted rune → data index mapping of one variant.
#[derive(Debug, Clone)]
pub struct GlyphTable {
    entries: Vec<RuneEntry>,
    min_rune: Rune,
    max_rune: Rune,
    stub_index: Option<u32>,
    policy: MissingGlyphPolicy,
}

impl GlyphTable {
    /// `entries` must be sorted by rune with no repeats.
    pub fn new(
        entries: Vec<RuneEntry>,
        stub_index: Option<u32>,
        policy: MissingGlyphPolicy,
    ) -> Self {
        let min_rune = entries.first().map(|e| e.rune).unwrap_or(0);
        let max_rune = entries.last().map(|e| e.rune).unwrap_or(0);
        GlyphTable::from_parts(entries, min_rune, max_rune, stub_index, policy)
    }

    /// Builds a table with an explicit rune range.
    ///
    /// The range comes from the compiled artifacts rather than being
    /// recomputed. Entries must be sorted by rune.
    pub fn from_parts(
        entries: Vec<RuneEntry>,
        min_rune: Rune,
        max_rune: Rune,
        stub_index: Option<u32>,
        policy: MissingGlyphPolicy,
    ) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].rune < w[1].rune));
        GlyphTable {
            entries,
            min_rune,
            max_rune,
            stub_index,
            policy,
        }
    }

    pub fn entries(&self) -> &[RuneEntry] {
        &self.entries
    }

    pub fn min_rune(&self) -> Rune {
        self.min_rune
    }

    pub fn max_rune(&self) -> Rune {
        self.max_rune
    }

    pub fn stub_index(&self) -> Option<u32> {
        self.stub_index
    }

    pub fn policy(&self) -> MissingGlyphPolicy {
        self.policy
    }

    /// Whether `rune` lies within `[min_rune, max_rune]`. An empty table
    /// has no range.
    pub fn in_range(&self, rune: Rune) -> bool {
        !self.entries.is_empty() && rune >= self.min_rune && rune <= self.max_rune
    }
}

/// Table lookups with a last-hit cache.
#[derive(Debug, Clone)]
pub struct Resolver {
    table: Arc<GlyphTable>,
    last_rune: Cell<Rune>,
    last_index: Cell<usize>,
}

impl Resolver {
    /// A resolver with a cold cache.
    pub fn new(table: Arc<GlyphTable>) -> Self {
        Resolver {
            table,
            last_rune: Cell::new(0),
            last_index: Cell::new(0),
        }
    }

    pub fn table(&self) -> &GlyphTable {
        &self.table
    }

    /// Data index of `rune` if the table lists it.
    pub fn find(&self, rune: Rune) -> Option<u32> {
        if !self.table.in_range(rune) {
            return None;
        }
        let entries = self.table.entries();

        // Without gaps between the last hit and `rune`, the target sits at a
        // fixed distance from the last hit. The entry is checked before use.
        let delta = rune as i64 - self.last_rune.get() as i64;
        let candidate = self.last_index.get() as i64 + delta;
        if candidate >= 0 && (candidate as usize) < entries.len() {
            let entry = entries[candidate as usize];
            if entry.rune == rune {
                return Some(entry.index);
            }
        }

        match entries.binary_search_by_key(&rune, |e| e.rune) {
            Ok(i) => {
                self.last_rune.set(rune);
                self.last_index.set(i);
                Some(entries[i].index)
            }
            Err(_) => None,
        }
    }

    /// Like [`Resolver::find`], with the missing-glyph policy applied to
    /// in-range runes the table does not list.
    ///
    /// # Panics
    ///
    /// Under [`MissingGlyphPolicy::Panic`] when an in-range rune is absent.
    pub fn resolve(&self, rune: Rune) -> Option<u32> {
        if !self.table.in_range(rune) {
            return None;
        }
        if let Some(index) = self.find(rune) {
            return Some(index);
        }
        match self.table.policy() {
            MissingGlyphPolicy::Empty => None,
            MissingGlyphPolicy::Stub => self.table.stub_index(),
            MissingGlyphPolicy::Panic => panic!(
                "requesting an undefined rune {} ({:?})",
                rune,
                char::from_u32(rune).unwrap_or(char::REPLACEMENT_CHARACTER)
            ),
        }
    }
}

/// Scalar metrics of one variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    pub size: f64,
    pub glyph_width: u32,
    pub glyph_height: u32,
    pub dot_x: i32,
    pub dot_y: i32,
}

impl FaceMetrics {
    pub fn glyph_bit_size(&self) -> usize {
        self.glyph_width as usize * self.glyph_height as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

/// Line metrics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub height: i32,
    pub ascent: i32,
    pub descent: i32,
}

/// Borrowed view of one glyph inside a variant bit stream.
#[derive(Debug, Clone, Copy)]
pub struct GlyphMask<'a> {
    bits: &'a [u8],
    offset: usize,
    width: usize,
    height: usize,
}

impl<'a> GlyphMask<'a> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let bit = self.offset + y * self.width + x;
        self.bits
            .get(bit / 8)
            .is_some_and(|byte| (byte >> (bit % 8)) & 1 == 1)
    }

    pub fn to_pixel_mask(&self) -> PixelMask {
        PixelMask::from_fn(self.width, self.height, |x, y| self.is_opaque(x, y))
    }
}

/// Result of [`FontFace::glyph`].
#[derive(Debug, Clone, Copy)]
pub struct RenderedGlyph<'a> {
    /// Where to draw the mask, in destination coordinates.
    pub draw_rect: Rect,
    pub mask: GlyphMask<'a>,
    pub advance: i32,
}

/// What a host text layout needs from a font.
pub trait FontFace {
    fn glyph(&self, dot: Point, rune: char) -> Option<RenderedGlyph<'_>>;
    fn glyph_advance(&self, rune: char) -> Option<i32>;
    fn glyph_bounds(&self, rune: char) -> Option<(Rect, i32)>;
    fn kern(&self, r0: char, r1: char) -> i32;
    fn metrics(&self) -> Metrics;
}

/// A loaded size variant.
#[derive(Debug, Clone)]
pub struct BitmapFace {
    metrics: FaceMetrics,
    bitmap: Arc<[u8]>,
    resolver: Resolver,
}

impl BitmapFace {
    /// Wraps an already decompressed bit stream.
    ///
    /// `bitmap` must hold at least `glyph_bit_size` bits for every data index
    /// the table hands out; out-of-bounds bits read as transparent.
    pub fn new(metrics: FaceMetrics, table: GlyphTable, bitmap: Vec<u8>) -> Self {
        BitmapFace {
            metrics,
            bitmap: bitmap.into(),
            resolver: Resolver::new(Arc::new(table)),
        }
    }

    /// Builds a face from a gzip-compressed bit stream.
    ///
    /// # Errors
    ///
    /// Returns an `EncodingError` if `compressed` is not valid gzip.
    pub fn from_compressed(
        metrics: FaceMetrics,
        table: GlyphTable,
        compressed: &[u8],
    ) -> Result<Self, FontError> {
        let bitmap = encoder::decompress(compressed)?;
        Ok(BitmapFace::new(metrics, table, bitmap))
    }

    pub fn size(&self) -> f64 {
        self.metrics.size
    }

    pub fn face_metrics(&self) -> &FaceMetrics {
        &self.metrics
    }

    pub fn table(&self) -> &GlyphTable {
        self.resolver.table()
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    /// Data index for `rune` after applying the missing-glyph policy.
    pub fn data_index(&self, rune: char) -> Option<u32> {
        self.resolver.resolve(rune as Rune)
    }

    /// The bitmap stored at `index`.
    pub fn mask(&self, index: u32) -> GlyphMask<'_> {
        GlyphMask {
            bits: &self.bitmap,
            offset: index as usize * self.metrics.glyph_bit_size(),
            width: self.metrics.glyph_width as usize,
            height: self.metrics.glyph_height as usize,
        }
    }

    fn in_range(&self, rune: char) -> bool {
        self.table().in_range(rune as Rune)
    }

    fn width(&self) -> i32 {
        self.metrics.glyph_width as i32
    }

    fn height(&self) -> i32 {
        self.metrics.glyph_height as i32
    }
}

impl FontFace for BitmapFace {
    fn glyph(&self, dot: Point, rune: char) -> Option<RenderedGlyph<'_>> {
        let index = self.data_index(rune)?;
        let min = Point::new(dot.x - self.metrics.dot_x, dot.y - self.metrics.dot_y);
        let max = Point::new(min.x + self.width(), min.y + self.height());
        Some(RenderedGlyph {
            draw_rect: Rect { min, max },
            mask: self.mask(index),
            advance: self.width(),
        })
    }

    fn glyph_advance(&self, rune: char) -> Option<i32> {
        self.in_range(rune).then(|| self.width())
    }

    fn glyph_bounds(&self, rune: char) -> Option<(Rect, i32)> {
        if !self.in_range(rune) {
            return None;
        }
        let min = Point::new(-self.metrics.dot_x, -self.metrics.dot_y);
        let max = Point::new(min.x + self.width(), min.y + self.height());
        Some((Rect { min, max }, self.width()))
    }

    /// Pulls a following nonspacing mark (`Mn`) back over the previous glyph.
    fn kern(&self, _r0: char, r1: char) -> i32 {
        if get_general_category(r1) == GeneralCategory::NonspacingMark {
            -self.width()
        } else {
            0
        }
    }

    fn metrics(&self) -> Metrics {
        Metrics {
            height: self.height(),
            ascent: self.metrics.dot_y,
            descent: self.height() - self.metrics.dot_y,
        }
    }
}

/// A compiled font loaded back from its output directory.
#[derive(Debug, Clone)]
pub struct CompiledFont {
    policy: MissingGlyphPolicy,
    faces: Vec<BitmapFace>,
}

impl CompiledFont {
    /// Reads the lookup manifest and every variant blob from `dir`.
    ///
    /// # Errors
    ///
    /// An `IoError` naming the file for anything unreadable, and an
    /// `EncodingError` for a corrupt manifest or blob.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use glyphpack::runtime::{CompiledFont, FontFace};
    /// use std::path::Path;
    ///
    /// let font = CompiledFont::open(Path::new("monofont")).unwrap();
    /// for face in font.faces() {
    ///     println!("size {}: line height {}", face.size(), face.metrics().height);
    /// }
    /// ```
    pub fn open(dir: &Path) -> Result<Self, FontError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&manifest_path)
            .map_err(|e| FontError::io_error(e.to_string(), &manifest_path))?;
        let manifest = manifest::read_manifest(&bytes)?;

        let mut faces = Vec::with_capacity(manifest.tables.len());
        for table in manifest.tables {
            let blob_path = dir.join(&table.bitmap_filename);
            let compressed =
                fs::read(&blob_path).map_err(|e| FontError::io_error(e.to_string(), &blob_path))?;
            debug!(
                "Loading size {} ({} entries) from {}",
                table.size,
                table.entries.len(),
                blob_path.display()
            );
            faces.push(face_from_table(table, manifest.policy, &compressed)?);
        }

        Ok(CompiledFont {
            policy: manifest.policy,
            faces,
        })
    }

    pub fn policy(&self) -> MissingGlyphPolicy {
        self.policy
    }

    pub fn faces(&self) -> &[BitmapFace] {
        &self.faces
    }

    pub fn sizes(&self) -> Vec<f64> {
        self.faces.iter().map(BitmapFace::size).collect()
    }

    /// The face compiled for exactly `size`.
    pub fn face(&self, size: f64) -> Option<&BitmapFace> {
        self.faces.iter().find(|f| f.size() == size)
    }
}

/// Turns a compiled table plus its compressed blob into a face.
pub fn face_from_table(
    table: CompiledTable,
    policy: MissingGlyphPolicy,
    compressed: &[u8],
) -> Result<BitmapFace, FontError> {
    let metrics = table.metrics();
    let glyphs = GlyphTable::from_parts(
        table.entries,
        table.min_rune,
        table.max_rune,
        table.stub_index,
        policy,
    );
    BitmapFace::from_compressed(metrics, glyphs, compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(policy: MissingGlyphPolicy) -> GlyphTable {
        // 46, 65..=70 contiguous, gap, 100, 101, then 1040.
        let mut entries = vec![RuneEntry::new(46, 0)];
        for (i, r) in (65..=70).enumerate() {
            entries.push(RuneEntry::new(r, i as u32 + 1));
        }
        entries.push(RuneEntry::new(100, 7));
        entries.push(RuneEntry::new(101, 7));
        entries.push(RuneEntry::new(1040, 8));
        GlyphTable::new(entries, Some(9), policy)
    }

    #[test]
    fn test_range_comes_from_entries() {
        let t = table(MissingGlyphPolicy::Empty);
        assert_eq!(t.min_rune(), 46);
        assert_eq!(t.max_rune(), 1040);
        assert!(!GlyphTable::new(Vec::new(), None, MissingGlyphPolicy::Empty).in_range(0));
    }

    #[test]
    fn test_every_order_resolves_to_recorded_index() {
        let t = Arc::new(table(MissingGlyphPolicy::Empty));
        let expected: Vec<RuneEntry> = t.entries().to_vec();
        let n = expected.len();
        // Walk the table with several strides so the cache starts from
        // every kind of previous hit, including gaps and backward jumps.
        for stride in [1, 2, 3, 5, 7] {
            let resolver = Resolver::new(t.clone());
            for k in 0..n * 3 {
                let entry = expected[(k * stride) % n];
                assert_eq!(resolver.find(entry.rune), Some(entry.index));
            }
        }
    }

    #[test]
    fn test_cache_never_confuses_gap_neighbours() {
        let resolver = Resolver::new(Arc::new(table(MissingGlyphPolicy::Empty)));
        assert_eq!(resolver.find(70), Some(6));
        // 71 would be index 7 by arithmetic, which holds rune 100.
        assert_eq!(resolver.find(71), None);
        assert_eq!(resolver.find(100), Some(7));
        assert_eq!(resolver.find(99), None);
        assert_eq!(resolver.find(1040), Some(8));
        assert_eq!(resolver.find(65), Some(1));
    }

    #[test]
    fn test_out_of_range_is_rejected_before_policy() {
        // Panic policy would fire if the table were consulted.
        let resolver = Resolver::new(Arc::new(table(MissingGlyphPolicy::Panic)));
        assert_eq!(resolver.resolve(10), None);
        assert_eq!(resolver.resolve(5000), None);
    }

    #[test]
    fn test_missing_policy_empty() {
        let resolver = Resolver::new(Arc::new(table(MissingGlyphPolicy::Empty)));
        assert_eq!(resolver.resolve(80), None);
    }

    #[test]
    fn test_missing_policy_stub() {
        let resolver = Resolver::new(Arc::new(table(MissingGlyphPolicy::Stub)));
        assert_eq!(resolver.resolve(80), Some(9));
        assert_eq!(resolver.resolve(65), Some(1));
    }

    #[test]
    #[should_panic(expected = "undefined rune 80")]
    fn test_missing_policy_panic() {
        let resolver = Resolver::new(Arc::new(table(MissingGlyphPolicy::Panic)));
        resolver.resolve(80);
    }

    fn face() -> BitmapFace {
        // Two 3x2 glyphs: '.' then 'A'.
        // '.': ... / .#.   'A': ### / #.#
        let mut bits = crate::encoder::BitWriter::with_bit_capacity(12);
        bits.push_mask(&PixelMask::from_rows(&["...", ".#."]));
        bits.push_mask(&PixelMask::from_rows(&["###", "#.#"]));
        let metrics = FaceMetrics {
            size: 1.0,
            glyph_width: 3,
            glyph_height: 2,
            dot_x: 0,
            dot_y: 1,
        };
        let entries = vec![RuneEntry::new(46, 0), RuneEntry::new(65, 1)];
        BitmapFace::new(
            metrics,
            GlyphTable::new(entries, None, MissingGlyphPolicy::Empty),
            bits.into_bytes(),
        )
    }

    #[test]
    fn test_glyph_geometry_and_mask() {
        let f = face();
        let g = f.glyph(Point::new(10, 20), 'A').unwrap();
        assert_eq!(g.draw_rect.min, Point::new(10, 19));
        assert_eq!(g.draw_rect.max, Point::new(13, 21));
        assert_eq!(g.advance, 3);
        assert_eq!(g.mask.to_pixel_mask(), PixelMask::from_rows(&["###", "#.#"]));
        assert!(f.glyph(Point::default(), 'B').is_none());
    }

    #[test]
    fn test_advance_bounds_and_metrics() {
        let f = face();
        assert_eq!(f.glyph_advance('A'), Some(3));
        assert_eq!(f.glyph_advance('~'), None);
        let (bounds, advance) = f.glyph_bounds('.').unwrap();
        assert_eq!(bounds.min, Point::new(0, -1));
        assert_eq!((bounds.width(), bounds.height()), (3, 2));
        assert_eq!(advance, 3);
        assert_eq!(
            f.metrics(),
            Metrics {
                height: 2,
                ascent: 1,
                descent: 1
            }
        );
    }

    #[test]
    fn test_kern_stacks_combining_marks() {
        let f = face();
        assert_eq!(f.kern('A', '\u{0301}'), -3);
        assert_eq!(f.kern('A', '\u{0308}'), -3);
        assert_eq!(f.kern('A', 'B'), 0);
        // zero-width, but not marks
        for c in ['\u{200B}', '\u{200D}', '\u{00AD}', '\u{1160}'] {
            assert_eq!(f.kern('A', c), 0, "{:?}", c);
        }
    }

    #[test]
    fn test_clones_share_bitmap() {
        let f = face();
        let g = f.clone();
        assert_eq!(f.bitmap().as_ptr(), g.bitmap().as_ptr());
        assert_eq!(g.data_index('A'), Some(1));
    }
}
