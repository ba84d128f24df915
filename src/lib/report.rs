//! Font summary and the optional `fontinfo.md` document.

use crate::codegen::{fill, load_template};
use crate::model::{Font, Rune};
use crate::FontError;
use chrono::{DateTime, Local};

pub const FONTINFO_FILE: &str = "fontinfo.md";

#[derive(Debug, Clone, PartialEq)]
pub struct RuneInfo {
    pub value: Rune,
    pub string_value: String,
    pub tag: String,
}

/// Inventory of a compiled font.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// Runes of the base variant, in rune order.
    pub runes: Vec<RuneInfo>,
    /// Size of every variant, in load order.
    pub sizes: Vec<f64>,
    pub date: DateTime<Local>,
}

impl FontInfo {
    /// Collects the inventory of a processed font. Placeholders are skipped.
    pub fn from_font(font: &Font) -> Self {
        let runes = font
            .base()
            .map(|base| {
                base.glyphs
                    .iter()
                    .filter(|g| !g.is_stub)
                    .map(|g| RuneInfo {
                        value: g.rune,
                        string_value: char::from_u32(g.rune).map(String::from).unwrap_or_default(),
                        tag: g.tag.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        FontInfo {
            runes,
            sizes: font.variants.iter().map(|v| v.size).collect(),
            date: Local::now(),
        }
    }
}

/// Characters that would break a markdown table cell.
fn escape_markdown(s: &str) -> String {
    match s {
        "#" | "\\" | "|" | "!" | "." | "-" | "+" | "*" | "(" | ")" | "{" | "}" | "_" | "`" => {
            format!("\\{}", s)
        }
        _ => s.to_string(),
    }
}

/// Renders `fontinfo.md`.
pub fn render_markdown(name: &str, info: &FontInfo) -> Result<String, FontError> {
    let template = load_template("fontinfo.md.tmpl")?;

    let sizes: Vec<String> = info.sizes.iter().map(|s| format!("`{}`", s)).collect();
    let rows: Vec<String> = info
        .runes
        .iter()
        .map(|r| format!("| {} | {} | {} |", escape_markdown(&r.string_value), r.value, r.tag))
        .collect();

    Ok(fill(
        &template,
        &[
            ("name", name.to_string()),
            ("rune_count", info.runes.len().to_string()),
            ("sizes", sizes.join(", ")),
            ("date", info.date.format("%-d of %B %Y").to_string()),
            ("rows", rows.join("\n")),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info() -> FontInfo {
        FontInfo {
            runes: vec![
                RuneInfo {
                    value: 46,
                    string_value: ".".to_string(),
                    tag: "basic".to_string(),
                },
                RuneInfo {
                    value: 65,
                    string_value: "A".to_string(),
                    tag: "latin".to_string(),
                },
            ],
            sizes: vec![1.0, 2.0],
            date: Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_markdown_document() {
        let doc = render_markdown("tinyfont", &info()).unwrap();
        assert!(doc.starts_with("# tinyfont Bitmap Font"));
        assert!(doc.contains("* Runes: 2"));
        assert!(doc.contains("* Sizes: `1`, `2`"));
        assert!(doc.contains("* Generation date: 7 of March 2024"));
        assert!(doc.contains("| \\. | 46 | basic |"));
        assert!(doc.contains("| A | 65 | latin |"));
    }

    #[test]
    fn test_escape_only_special_symbols() {
        assert_eq!(escape_markdown("|"), "\\|");
        assert_eq!(escape_markdown("a"), "a");
    }
}
