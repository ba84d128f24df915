//! Binary lookup-table artifact (`font.bin`).
//!
//! Little-endian layout:
//!
//! ```text
//! magic "GPAK" | version u16 | policy u8 | variant count u16
//! per variant:
//!   size f64 | short tag (u16 len + utf8) | bitmap file (u16 len + utf8)
//!   glyph width u16 | glyph height u16 | dot x i32 | dot y i32
//!   min rune u32 | max rune u32 | stub index u32 (u32::MAX = none)
//!   compact u8 | entry count u32
//!   entries: (u16 rune, u16 index) when compact, else (u32, u32)
//! ```

use crate::config::MissingGlyphPolicy;
use crate::runtime::RuneEntry;
use crate::table::{fits_compact, CompiledTable};
use crate::FontError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::{Cursor, Read};

pub const MANIFEST_FILE: &str = "font.bin";
const MAGIC: &[u8; 4] = b"GPAK";
const VERSION: u16 = 1;
const NO_STUB: u32 = u32::MAX;

/// Decoded contents of `font.bin`.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub policy: MissingGlyphPolicy,
    pub tables: Vec<CompiledTable>,
}

/// Serializes the lookup tables of every variant.
///
/// Fails with an `EncodingError` when a value does not fit its field, for
/// instance more than `u16::MAX` variants or a glyph wider than `u16::MAX`.
pub fn write_manifest(
    policy: MissingGlyphPolicy,
    tables: &[CompiledTable],
) -> Result<Vec<u8>, FontError> {
    write_inner(policy, tables).map_err(ManifestError::into_font_error)
}

fn write_inner(
    policy: MissingGlyphPolicy,
    tables: &[CompiledTable],
) -> Result<Vec<u8>, ManifestError> {
    let compact = fits_compact(tables);
    debug!("manifest: compact entries = {}", compact);

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.write_u16::<LittleEndian>(VERSION)?;
    out.write_u8(policy.to_byte())?;
    out.write_u16::<LittleEndian>(narrow(tables.len(), "variant count")?)?;

    for t in tables {
        out.write_f64::<LittleEndian>(t.size)?;
        write_str(&mut out, &t.short_size_tag)?;
        write_str(&mut out, &t.bitmap_filename)?;
        out.write_u16::<LittleEndian>(narrow(t.glyph_width, "glyph width")?)?;
        out.write_u16::<LittleEndian>(narrow(t.glyph_height, "glyph height")?)?;
        out.write_i32::<LittleEndian>(t.dot_x)?;
        out.write_i32::<LittleEndian>(t.dot_y)?;
        out.write_u32::<LittleEndian>(t.min_rune)?;
        out.write_u32::<LittleEndian>(t.max_rune)?;
        out.write_u32::<LittleEndian>(t.stub_index.unwrap_or(NO_STUB))?;
        out.write_u8(compact as u8)?;
        out.write_u32::<LittleEndian>(narrow(t.entries.len(), "entry count")?)?;
        for e in &t.entries {
            if compact {
                out.write_u16::<LittleEndian>(narrow(e.rune, "rune")?)?;
                out.write_u16::<LittleEndian>(narrow(e.index, "data index")?)?;
            } else {
                out.write_u32::<LittleEndian>(e.rune)?;
                out.write_u32::<LittleEndian>(e.index)?;
            }
        }
    }

    Ok(out)
}

/// Checked conversion into a narrower field type.
fn narrow<T, U>(value: T, what: &str) -> Result<U, ManifestError>
where
    T: Copy + std::fmt::Display,
    U: TryFrom<T>,
{
    U::try_from(value)
        .map_err(|_| ManifestError::Invalid(format!("{} {} does not fit its field", what, value)))
}

fn write_str(out: &mut Vec<u8>, s: &str) -> Result<(), ManifestError> {
    out.write_u16::<LittleEndian>(narrow(s.len(), "string length")?)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

pub fn read_manifest(bytes: &[u8]) -> Result<Manifest, FontError> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| FontError::encoding_error("manifest: truncated header"))?;
    if &magic != MAGIC {
        return Err(FontError::encoding_error("manifest: bad magic"));
    }
    read_inner(&mut cursor).map_err(ManifestError::into_font_error)
}

enum ManifestError {
    Io(std::io::Error),
    Invalid(String),
}

impl ManifestError {
    fn into_font_error(self) -> FontError {
        match self {
            ManifestError::Io(e) => FontError::encoding_error(format!("manifest: {}", e)),
            ManifestError::Invalid(message) => {
                FontError::encoding_error(format!("manifest: {}", message))
            }
        }
    }
}

impl From<std::io::Error> for ManifestError {
    fn from(e: std::io::Error) -> Self {
        ManifestError::Io(e)
    }
}

fn read_inner(cursor: &mut Cursor<&[u8]>) -> Result<Manifest, ManifestError> {
    let version = cursor.read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(ManifestError::Invalid(format!(
            "unsupported version {}",
            version
        )));
    }
    let policy_byte = cursor.read_u8()?;
    let policy = MissingGlyphPolicy::from_byte(policy_byte).ok_or_else(|| {
        ManifestError::Invalid(format!("unknown missing glyph policy {}", policy_byte))
    })?;
    let count = cursor.read_u16::<LittleEndian>()?;

    let mut tables = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let size = cursor.read_f64::<LittleEndian>()?;
        let short_size_tag = read_str(cursor)?;
        let bitmap_filename = read_str(cursor)?;
        let glyph_width = cursor.read_u16::<LittleEndian>()? as u32;
        let glyph_height = cursor.read_u16::<LittleEndian>()? as u32;
        let dot_x = cursor.read_i32::<LittleEndian>()?;
        let dot_y = cursor.read_i32::<LittleEndian>()?;
        let min_rune = cursor.read_u32::<LittleEndian>()?;
        let max_rune = cursor.read_u32::<LittleEndian>()?;
        let stub = cursor.read_u32::<LittleEndian>()?;
        let compact = cursor.read_u8()? != 0;
        let len = cursor.read_u32::<LittleEndian>()? as usize;

        let mut entries = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            let entry = if compact {
                let rune = cursor.read_u16::<LittleEndian>()? as u32;
                let index = cursor.read_u16::<LittleEndian>()? as u32;
                RuneEntry::new(rune, index)
            } else {
                let rune = cursor.read_u32::<LittleEndian>()?;
                let index = cursor.read_u32::<LittleEndian>()?;
                RuneEntry::new(rune, index)
            };
            entries.push(entry);
        }

        tables.push(CompiledTable {
            size,
            short_size_tag,
            bitmap_filename,
            glyph_width,
            glyph_height,
            dot_x,
            dot_y,
            min_rune,
            max_rune,
            stub_index: (stub != NO_STUB).then_some(stub),
            entries,
        });
    }

    Ok(Manifest { policy, tables })
}

fn read_str(cursor: &mut Cursor<&[u8]>) -> Result<String, ManifestError> {
    let len = cursor.read_u16::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| ManifestError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(max_rune: u32) -> CompiledTable {
        CompiledTable {
            size: 1.5,
            short_size_tag: "1_5".to_string(),
            bitmap_filename: "1_50.data.gz".to_string(),
            glyph_width: 6,
            glyph_height: 9,
            dot_x: 1,
            dot_y: 7,
            min_rune: 46,
            max_rune,
            stub_index: Some(3),
            entries: vec![
                RuneEntry::new(46, 0),
                RuneEntry::new(65, 1),
                RuneEntry::new(max_rune, 2),
            ],
        }
    }

    #[test]
    fn test_compact_and_wide_layouts_decode() {
        for max_rune in [1040u32, 0x1F600] {
            let tables = vec![sample(max_rune)];
            let bytes = write_manifest(MissingGlyphPolicy::Stub, &tables).unwrap();
            let manifest = read_manifest(&bytes).unwrap();
            assert_eq!(manifest.policy, MissingGlyphPolicy::Stub);
            assert_eq!(manifest.tables, tables);
        }
    }

    #[test]
    fn test_compact_layout_is_smaller() {
        let compact = write_manifest(MissingGlyphPolicy::Empty, &[sample(1040)]).unwrap();
        let wide = write_manifest(MissingGlyphPolicy::Empty, &[sample(0x1F600)]).unwrap();
        assert_eq!(wide.len() - compact.len(), 3 * 4);
    }

    #[test]
    fn test_oversized_fields_are_rejected() {
        let mut wide = sample(1040);
        wide.glyph_width = 70_000;
        let err = write_manifest(MissingGlyphPolicy::Empty, &[wide]).unwrap_err();
        assert!(err.to_string().contains("glyph width 70000 does not fit"), "{}", err);

        let mut long = sample(1040);
        long.bitmap_filename = "x".repeat(u16::MAX as usize + 1);
        assert!(matches!(
            write_manifest(MissingGlyphPolicy::Empty, &[long]),
            Err(FontError::EncodingError { .. })
        ));
    }

    #[test]
    fn test_bad_magic_and_truncation() {
        assert!(matches!(
            read_manifest(b"NOPE\x01\x00"),
            Err(FontError::EncodingError { .. })
        ));
        let bytes = write_manifest(MissingGlyphPolicy::Empty, &[sample(1040)]).unwrap();
        assert!(read_manifest(&bytes[..bytes.len() - 1]).is_err());
        assert!(read_manifest(&bytes[..2]).is_err());
    }
}
