//! Renders the generated Rust module (`fontface.rs`).
//!
//! The module embeds every variant blob with `include_bytes!`, so it has to
//! live in the same directory as the `.data.gz` files.

use crate::config::MissingGlyphPolicy;
use crate::table::CompiledTable;
use crate::FontError;
use rust_embed::RustEmbed;

pub const FONTFACE_FILE: &str = "fontface.rs";

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Templates;

/// Loads an embedded template as text.
pub(crate) fn load_template(name: &str) -> Result<String, FontError> {
    let file = Templates::get(name)
        .ok_or_else(|| FontError::encoding_error(format!("missing template {:?}", name)))?;
    String::from_utf8(file.data.into_owned())
        .map_err(|e| FontError::encoding_error(format!("template {:?}: {}", name, e)))
}

/// Fills `{{key}}` placeholders.
pub(crate) fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

fn policy_variant(policy: MissingGlyphPolicy) -> &'static str {
    match policy {
        MissingGlyphPolicy::Empty => "Empty",
        MissingGlyphPolicy::Stub => "Stub",
        MissingGlyphPolicy::Panic => "Panic",
    }
}

/// Renders the source of the generated module.
pub fn render_fontface(
    name: &str,
    policy: MissingGlyphPolicy,
    tables: &[CompiledTable],
) -> Result<String, FontError> {
    let module = load_template("fontface.rs.tmpl")?;
    let variant = load_template("variant.rs.tmpl")?;

    let mut variants = String::new();
    let mut dispatch = String::new();
    for t in tables {
        let tag = t.bitmap_filename.trim_end_matches(".data.gz").to_string();
        variants.push_str(&fill(
            &variant,
            &[
                ("tag", tag.clone()),
                ("short_tag", t.short_size_tag.clone()),
                ("file", t.bitmap_filename.clone()),
                ("count", t.entries.len().to_string()),
                ("entries", render_entries(t)),
                ("size", t.size.to_string()),
                ("size_literal", format!("{:?}", t.size)),
                ("width", t.glyph_width.to_string()),
                ("height", t.glyph_height.to_string()),
                ("dot_x", t.dot_x.to_string()),
                ("dot_y", t.dot_y.to_string()),
                ("min_rune", t.min_rune.to_string()),
                ("max_rune", t.max_rune.to_string()),
                ("stub_index", format!("{:?}", t.stub_index)),
            ],
        ));
        dispatch.push_str(&format!(
            "    if size == {:?} {{\n        return Some(face_{}());\n    }}\n",
            t.size, t.short_size_tag
        ));
    }

    let sizes: Vec<String> = tables.iter().map(|t| format!("{:?}", t.size)).collect();
    Ok(fill(
        &module,
        &[
            ("name", name.to_string()),
            ("policy", policy.as_str().to_string()),
            ("policy_variant", policy_variant(policy).to_string()),
            ("sizes", sizes.join(", ")),
            ("variants", variants),
            ("dispatch", dispatch),
        ],
    ))
}

fn render_entries(table: &CompiledTable) -> String {
    table
        .entries
        .iter()
        .map(|e| format!("    RuneEntry::new({}, {}),\n", e.rune, e.index))
        .collect()
}
