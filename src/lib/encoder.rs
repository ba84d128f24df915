//! Bit-packs unique glyph bitmaps and compresses them into per-size blobs.
//!
//! Blob layout: one bit per pixel, row-major, least significant bit first
//! within each byte. Glyphs follow each other without padding, unique real
//! glyphs first in rune order, then the stub if the variant needs one.
//! Glyph `n` therefore starts at bit `n * glyph_width * glyph_height`.

use crate::config::CompilerConfig;
use crate::model::{PixelMask, SizeVariant};
use crate::FontError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Appends pixels into a zeroed byte buffer, LSB first.
pub struct BitWriter {
    data: Vec<u8>,
    bit_index: usize,
}

impl BitWriter {
    /// Room for `num_bits` plus one byte of slack.
    pub fn with_bit_capacity(num_bits: usize) -> Self {
        BitWriter {
            data: vec![0u8; num_bits / 8 + 1],
            bit_index: 0,
        }
    }

    /// Appends one pixel. The buffer grows if the initial estimate was short.
    pub fn push(&mut self, bit: bool) {
        let byte = self.bit_index / 8;
        if byte >= self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte] |= 1 << (self.bit_index % 8);
        }
        self.bit_index += 1;
    }

    /// Appends a whole glyph, row-major.
    pub fn push_mask(&mut self, mask: &PixelMask) {
        for opaque in mask.pixels() {
            self.push(opaque);
        }
    }

    pub fn bits_written(&self) -> usize {
        self.bit_index
    }

    /// The packed buffer, including any unused slack bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Output of [`encode_variant`].
#[derive(Debug, Clone)]
pub struct EncodedBitmap {
    /// Uncompressed bit stream.
    pub raw: Vec<u8>,
    /// Gzip-compressed `raw`.
    pub compressed: Vec<u8>,
    pub unique_images: usize,
}

/// Assigns every glyph its data index and produces the variant blob.
///
/// Duplicates share their original's index; placeholders share the stub's.
pub fn encode_variant(
    variant: &mut SizeVariant,
    config: &CompilerConfig,
) -> Result<EncodedBitmap, FontError> {
    variant.bitmap_filename = format!("{}.data.gz", variant.size_tag);

    let mut unique_images = variant
        .glyphs
        .iter()
        .filter(|g| !g.is_stub && g.duplicate_of.is_none())
        .count();
    if variant.needs_stub {
        unique_images += 1;
    }
    config.trace(&format!("{:.2}: needsStub={}", variant.size, variant.needs_stub));
    config.trace(&format!(
        "{:.2}: {}/{} images are unique",
        variant.size,
        unique_images,
        variant.glyphs.len()
    ));

    let num_bits = unique_images * variant.glyph_bit_size();
    let mut writer = BitWriter::with_bit_capacity(num_bits);
    config.trace(&format!(
        "{:.2}: allocated {} bytes",
        variant.size,
        num_bits / 8 + 1
    ));

    let mut data_index = 0u32;
    for glyph in variant.glyphs.iter_mut() {
        if glyph.is_stub || glyph.duplicate_of.is_some() {
            continue;
        }
        if let Some(mask) = &glyph.mask {
            writer.push_mask(mask);
        }
        glyph.data_index = data_index;
        data_index += 1;
    }

    for i in 0..variant.glyphs.len() {
        if let Some(original) = variant.glyphs[i].duplicate_of {
            variant.glyphs[i].data_index = variant.glyphs[original].data_index;
        }
    }

    variant.stub_data_index = None;
    if variant.needs_stub {
        writer.push_mask(&variant.stub_mask);
        variant.stub_data_index = Some(data_index);
    }
    if let Some(stub_index) = variant.stub_data_index {
        for glyph in variant.glyphs.iter_mut().filter(|g| g.is_stub) {
            glyph.data_index = stub_index;
        }
    }

    config.trace(&format!(
        "{:.2}: filled {}/{} bytes",
        variant.size,
        writer.bits_written() / 8,
        num_bits / 8 + 1
    ));

    let raw = writer.into_bytes();
    let compressed = compress(&raw).map_err(|e| e.context(format!("{:.2}", variant.size)))?;
    Ok(EncodedBitmap {
        raw,
        compressed,
        unique_images,
    })
}

/// Encodes a variant and writes its blob into `out_dir`.
///
/// The file is named `<size_tag>.data.gz`; the name is also stored in
/// `variant.bitmap_filename` for the table builder.
///
/// # Errors
///
/// Compression failures, and write failures carrying the target path.
pub fn write_variant_bitmap(
    variant: &mut SizeVariant,
    out_dir: &Path,
    config: &CompilerConfig,
) -> Result<EncodedBitmap, FontError> {
    let encoded = encode_variant(variant, config)?;
    let path = out_dir.join(&variant.bitmap_filename);
    fs::write(&path, &encoded.compressed).map_err(|e| FontError::EncodingError {
        message: format!("{:.2}: {}", variant.size, e),
        path: Some(path.display().to_string()),
    })?;
    Ok(encoded)
}

/// Gzips a bit stream at the best compression level.
///
/// # Errors
///
/// Returns an `EncodingError` if the encoder fails to write or finish.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, FontError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| FontError::encoding_error(format!("compress: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| FontError::encoding_error(format!("compress: {}", e)))
}

/// Inverse of [`compress`].
///
/// # Errors
///
/// Returns an `EncodingError` for data that is not a valid gzip stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, FontError> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|e| FontError::encoding_error(format!("decompress: {}", e)))?;
    Ok(decoded)
}
