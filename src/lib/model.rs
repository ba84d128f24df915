//! In-memory model of a glyph source tree.
//!
//! A [`Font`] is built once by the loader, refined in place by the validator
//! and the processor, and then only read by the encoder and the table builder.

use std::fmt;

/// Unicode code point as stored in glyph file names.
pub type Rune = u32;

/// Code point of the `.` glyph every size variant must provide.
pub const PERIOD_RUNE: Rune = 46;

/// Width x height grid of opaque/transparent pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelMask {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl PixelMask {
    /// Creates a fully transparent mask.
    pub fn new(width: usize, height: usize) -> Self {
        PixelMask {
            width,
            height,
            pixels: vec![false; width * height],
        }
    }

    /// Builds a mask by querying `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        PixelMask {
            width,
            height,
            pixels,
        }
    }

    /// Parses a mask from rows of `#` (opaque) and `.` (transparent).
    ///
    /// Handy for fixtures; any character other than `#` is transparent.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        PixelMask::from_fn(width, height, |x, y| rows[y].chars().nth(x) == Some('#'))
    }

    /// The placeholder glyph: a transparent 1px border around an opaque interior.
    pub fn hollow_rect(width: usize, height: usize) -> Self {
        PixelMask::from_fn(width, height, |x, y| {
            x != 0 && y != 0 && x + 1 != width && y + 1 != height
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, opaque: bool) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = opaque;
        }
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = bool> + '_ {
        self.pixels.iter().copied()
    }

    /// Exact content key: one bit per pixel, row-major, packed LSB first.
    ///
    /// Two masks of the same dimensions have equal fingerprints iff their
    /// pixels are identical.
    pub fn fingerprint(&self) -> Vec<u8> {
        let mut key = vec![0u8; self.pixels.len().div_ceil(8)];
        for (i, opaque) in self.pixels().enumerate() {
            if opaque {
                key[i / 8] |= 1 << (i % 8);
            }
        }
        key
    }
}

impl fmt::Debug for PixelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PixelMask {}x{}", self.width, self.height)?;
        for y in 0..self.height {
            let row: String = (0..self.width)
                .map(|x| if self.is_opaque(x, y) { '#' } else { '.' })
                .collect();
            writeln!(f, "  {}", row)?;
        }
        Ok(())
    }
}

/// One glyph of one size variant.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub rune: Rune,
    pub tag: String,
    pub size: f64,
    /// `None` for synthesized placeholders, which render the variant stub.
    pub mask: Option<PixelMask>,
    pub is_stub: bool,
    /// Index (within the variant's glyph list) of an earlier glyph with an
    /// identical mask.
    pub duplicate_of: Option<usize>,
    /// Position of this glyph's bitmap inside the variant blob.
    /// Assigned by the encoder.
    pub data_index: u32,
}

impl Glyph {
    pub fn new(rune: Rune, tag: impl Into<String>, size: f64, mask: PixelMask) -> Self {
        Glyph {
            rune,
            tag: tag.into(),
            size,
            mask: Some(mask),
            is_stub: false,
            duplicate_of: None,
            data_index: 0,
        }
    }

    pub fn placeholder(rune: Rune, tag: impl Into<String>, size: f64) -> Self {
        Glyph {
            rune,
            tag: tag.into(),
            size,
            mask: None,
            is_stub: true,
            duplicate_of: None,
            data_index: 0,
        }
    }
}

/// Renders a rune as `code('c')`.
pub fn describe_rune(rune: Rune) -> String {
    match char::from_u32(rune) {
        Some(c) => format!("{}({:?})", rune, c),
        None => format!("{}(invalid)", rune),
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}/{}/{}", self.size, self.tag, describe_rune(self.rune))
    }
}

/// Fixed two-decimal tag naming a size's artifacts: `1.5` becomes `1_50`.
///
/// Two sizes sharing a tag would share a blob file, so the loader rejects
/// that case.
pub fn size_tag(size: f64) -> String {
    format!("{:.2}", size).replacen('.', "_", 1)
}

/// A complete alphabet rendered at one nominal size.
#[derive(Debug, Clone)]
pub struct SizeVariant {
    pub size: f64,
    pub glyphs: Vec<Glyph>,
    pub glyph_width: usize,
    pub glyph_height: usize,

    // Computed by the validator.
    pub needs_stub: bool,
    pub stub_mask: PixelMask,

    // Computed by the processor.
    pub min_rune: Rune,
    pub max_rune: Rune,
    pub dot_x: i32,
    pub dot_y: i32,
    pub size_tag: String,
    pub short_size_tag: String,

    // Computed by the encoder.
    pub stub_data_index: Option<u32>,
    pub bitmap_filename: String,
}

impl SizeVariant {
    pub fn new(size: f64) -> Self {
        SizeVariant {
            size,
            glyphs: Vec::new(),
            glyph_width: 0,
            glyph_height: 0,
            needs_stub: false,
            stub_mask: PixelMask::new(0, 0),
            min_rune: 0,
            max_rune: 0,
            dot_x: 0,
            dot_y: 0,
            size_tag: String::new(),
            short_size_tag: String::new(),
            stub_data_index: None,
            bitmap_filename: String::new(),
        }
    }

    pub fn glyph_bit_size(&self) -> usize {
        self.glyph_width * self.glyph_height
    }

    pub fn is_base(&self) -> bool {
        self.size == 1.0
    }

    pub fn find(&self, rune: Rune) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.rune == rune)
    }

    /// The mask of the first loaded period glyph, if any.
    pub fn period_mask(&self) -> Option<&PixelMask> {
        self.glyphs
            .iter()
            .filter(|g| g.rune == PERIOD_RUNE)
            .find_map(|g| g.mask.as_ref())
    }
}

/// All size variants of one font, in load order.
#[derive(Debug, Clone, Default)]
pub struct Font {
    pub variants: Vec<SizeVariant>,
}

impl Font {
    /// Index of the size-1.0 variant.
    pub fn base_index(&self) -> Option<usize> {
        self.variants.iter().position(SizeVariant::is_base)
    }

    pub fn base(&self) -> Option<&SizeVariant> {
        self.variants.iter().find(|v| v.is_base())
    }

    pub fn variant(&self, size: f64) -> Option<&SizeVariant> {
        self.variants.iter().find(|v| v.size == size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hollow_rect_border_is_transparent() {
        let stub = PixelMask::hollow_rect(4, 5);
        for x in 0..4 {
            assert!(!stub.is_opaque(x, 0));
            assert!(!stub.is_opaque(x, 4));
        }
        for y in 0..5 {
            assert!(!stub.is_opaque(0, y));
            assert!(!stub.is_opaque(3, y));
        }
        assert!(stub.is_opaque(1, 1));
        assert!(stub.is_opaque(2, 3));
    }

    #[test]
    fn test_fingerprint_distinguishes_single_pixel() {
        let a = PixelMask::from_rows(&["#..", "...", "..."]);
        let b = PixelMask::from_rows(&["...", "...", "..#"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn test_glyph_display_includes_size_tag_and_rune() {
        let g = Glyph::new(65, "latin", 2.0, PixelMask::new(1, 1));
        assert_eq!(g.to_string(), "2.00/latin/65('A')");
    }
}
