mod common;

use common::*;
use glyphpack::config::{CompilerConfig, MissingGlyphPolicy};
use glyphpack::manifest::{read_manifest, MANIFEST_FILE};
use glyphpack::runtime::{CompiledFont, RuneEntry};
use std::fs;

/// Parses the `RuneEntry::new(rune, index),` rows of one static table.
fn static_entries(source: &str, tag: &str) -> Vec<RuneEntry> {
    let header = format!("static RUNES_{}: [RuneEntry; ", tag);
    let start = source.find(&header).expect("rune table declared");
    let body = &source[start..];
    let end = body.find("];").expect("rune table closed");
    body[..end]
        .lines()
        .filter_map(|line| line.trim().strip_prefix("RuneEntry::new("))
        .map(|args| {
            let args = args.trim_end_matches("),");
            let (rune, index) = args.split_once(", ").expect("two arguments");
            RuneEntry::new(rune.parse().unwrap(), index.parse().unwrap())
        })
        .collect()
}

#[test]
fn test_generated_tables_match_manifest() {
    let fx = two_size_font();
    let mut config = CompilerConfig::new(fx.data_dir(), "tinyfont");
    config.out_dir = Some(fx.out_dir());
    config.missing_glyph = MissingGlyphPolicy::Stub;
    glyphpack::generate(&config).unwrap();

    let out = fx.out_dir();
    let source = fs::read_to_string(out.join("fontface.rs")).unwrap();
    let manifest = read_manifest(&fs::read(out.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(manifest.tables.len(), 2);
    assert!(source
        .contains("pub const ON_MISSING: MissingGlyphPolicy = MissingGlyphPolicy::Stub;"));

    for table in &manifest.tables {
        let tag = table.bitmap_filename.trim_end_matches(".data.gz");
        assert_eq!(static_entries(&source, tag), table.entries, "size {}", table.size);

        assert!(source.contains(&format!(
            "static RUNES_{}: [RuneEntry; {}]",
            tag,
            table.entries.len()
        )));
        assert!(source.contains(&format!(
            "static DATA_{}: &[u8] = include_bytes!(\"{}\");",
            tag, table.bitmap_filename
        )));
        assert!(out.join(&table.bitmap_filename).exists());

        let ctor = format!("pub fn face_{}() -> BitmapFace {{", table.short_size_tag);
        let start = source.find(&ctor).expect("face constructor");
        let body = &source[start..];
        let body = &body[..body.find(".expect(").expect("constructor end")];
        for field in [
            format!("size: {:?},", table.size),
            format!("glyph_width: {},", table.glyph_width),
            format!("glyph_height: {},", table.glyph_height),
            format!("dot_x: {},", table.dot_x),
            format!("dot_y: {},", table.dot_y),
        ] {
            assert!(body.contains(&field), "missing {:?} in {}", field, body);
        }
        let parts = format!(
            "RUNES_{}.to_vec(),\n        {},\n        {},\n        {:?},\n        ON_MISSING,",
            tag, table.min_rune, table.max_rune, table.stub_index
        );
        assert!(body.contains(&parts), "missing {:?} in {}", parts, body);

        let dispatch = format!(
            "    if size == {:?} {{\n        return Some(face_{}());\n    }}",
            table.size, table.short_size_tag
        );
        assert!(source.contains(&dispatch));
    }
}

#[test]
fn test_embedded_blobs_decode_to_loaded_bitmaps() {
    let fx = two_size_font();
    let mut config = CompilerConfig::new(fx.data_dir(), "tinyfont");
    config.out_dir = Some(fx.out_dir());
    glyphpack::generate(&config).unwrap();

    let font = CompiledFont::open(&fx.out_dir()).unwrap();
    for face in font.faces() {
        let file = fx
            .out_dir()
            .join(format!("{}.data.gz", glyphpack::model::size_tag(face.size())));
        let raw = glyphpack::encoder::decompress(&fs::read(file).unwrap()).unwrap();
        assert_eq!(raw.as_slice(), face.bitmap());
    }
}
