//! glyphpack compiles a directory of glyph images into a compact bitmap font:
//! one gzip-compressed, bit-packed blob per size, a sorted rune table, and a
//! small runtime that maps a character to its bitmap and advance.
//!
//! The input tree is organised as `size/tag/rune.png`:
//!
//! ```text
//! _data/
//!   1/               <- the base size, required
//!     latin/
//!       46.png       <- '.', required in every size
//!       65.png       <- 'A'
//!   2/
//!     latin/
//!       46.png
//! ```
//!
//! Basic usage:
//! ```no_run
//! use glyphpack::config::{CompilerConfig, MissingGlyphPolicy};
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     let mut config = CompilerConfig::new("_data", "monofont");
//!     config.missing_glyph = MissingGlyphPolicy::Stub;
//!     let result = glyphpack::generate(&config)?;
//!     for warning in &result.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The compiled output can be loaded back at runtime:
//! ```no_run
//! use glyphpack::runtime::{CompiledFont, FontFace, Point};
//! use std::path::Path;
//!
//! let font = CompiledFont::open(Path::new("monofont")).unwrap();
//! let face = font.face(1.0).unwrap();
//! if let Some(glyph) = face.glyph(Point::new(0, 10), 'A') {
//!     println!("draw at {:?}, advance {}", glyph.draw_rect, glyph.advance);
//! }
//! ```
//!
//! ## Pipeline
//! ```text
//! +-----------+    +-----------+    +-----------+    +-----------+    +-----------+
//! |  Loader   | -> | Validator | -> | Processor | -> |  Encoder  | -> |  Tables,  |
//! | dir->Font |    | base set, |    | sort, dot |    | bit-pack, |    | manifest, |
//! |           |    | stubs     |    | dedup     |    | gzip      |    | codegen   |
//! +-----------+    +-----------+    +-----------+    +-----------+    +-----------+
//! ```

pub mod codegen;
pub mod config;
pub mod encoder;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod processor;
pub mod report;
pub mod runtime;
pub mod table;
pub mod validator;

use config::CompilerConfig;
use log::{debug, info};
use model::Font;
use report::FontInfo;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use table::CompiledTable;

/// Errors raised while compiling a font.
#[derive(Debug)]
pub enum FontError {
    /// A size directory or glyph file name is not a number
    ParseError { message: String, path: String },
    /// A path can't be read, or an image can't be decoded
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
    /// The glyph tree breaks a structural rule
    ValidationError { message: String, suggestion: String },
    /// Compression, serialization or writing an artifact failed
    EncodingError {
        message: String,
        path: Option<String>,
    },
    /// The compiler configuration is unusable
    ConfigError { message: String, suggestion: String },
}

impl Error for FontError {}
impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FontError::ParseError { message, path } => {
                write!(f, "Parse Error: {}", message)?;
                write!(f, "\n   Path: {}", path)
            }
            FontError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "File Error: {}", message)?;
                write!(f, "\n   Path: {}", path)?;
                write!(f, "\n   Suggestion: {}", suggestion)
            }
            FontError::ValidationError {
                message,
                suggestion,
            } => {
                write!(f, "Validation Error: {}", message)?;
                write!(f, "\n   Suggestion: {}", suggestion)
            }
            FontError::EncodingError { message, path } => {
                write!(f, "Encoding Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n   Path: {}", p)?;
                }
                Ok(())
            }
            FontError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "Configuration Error: {}", message)?;
                write!(f, "\n   Suggestion: {}", suggestion)
            }
        }
    }
}

impl FontError {
    pub fn parse_error(message: impl Into<String>, path: &Path) -> Self {
        FontError::ParseError {
            message: message.into(),
            path: path.display().to_string(),
        }
    }

    pub fn io_error(message: impl Into<String>, path: &Path) -> Self {
        FontError::IoError {
            message: message.into(),
            path: path.display().to_string(),
            suggestion: "Check that the path exists and is readable".to_string(),
        }
    }

    pub fn validation_error(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        FontError::ValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn encoding_error(message: impl Into<String>) -> Self {
        FontError::EncodingError {
            message: message.into(),
            path: None,
        }
    }

    pub fn config_error(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        FontError::ConfigError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Prefixes the message with `prefix: `.
    pub fn context(self, prefix: impl fmt::Display) -> Self {
        let wrap = |m: String| format!("{}: {}", prefix, m);
        match self {
            FontError::ParseError { message, path } => FontError::ParseError {
                message: wrap(message),
                path,
            },
            FontError::IoError {
                message,
                path,
                suggestion,
            } => FontError::IoError {
                message: wrap(message),
                path,
                suggestion,
            },
            FontError::ValidationError {
                message,
                suggestion,
            } => FontError::ValidationError {
                message: wrap(message),
                suggestion,
            },
            FontError::EncodingError { message, path } => FontError::EncodingError {
                message: wrap(message),
                path,
            },
            FontError::ConfigError {
                message,
                suggestion,
            } => FontError::ConfigError {
                message: wrap(message),
                suggestion,
            },
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateConfig,
    PrepareOutDir,
    ParseFont,
    ValidateFont,
    ProcessFont,
    CreateBitmap,
    WriteTable,
    CreatePackage,
    GenerateInfo,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ValidateConfig => "validate config",
            Stage::PrepareOutDir => "prepare outdir",
            Stage::ParseFont => "parse font",
            Stage::ValidateFont => "validate font",
            Stage::ProcessFont => "process font",
            Stage::CreateBitmap => "create bitmap",
            Stage::WriteTable => "write table",
            Stage::CreatePackage => "create package",
            Stage::GenerateInfo => "generate info",
        }
    }
}

/// The first fatal error of a run, tagged with the stage that raised it.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: FontError,
}

impl Error for StageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.stage.name(), self.error)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Non-fatal findings, such as placeholder backfills.
    pub warnings: Vec<String>,
    pub info: FontInfo,
    /// One table per size, in load order.
    pub tables: Vec<CompiledTable>,
}

/// Compiles the glyph tree described by `config` into its output directory.
///
/// The output directory is wiped first. A failing run may leave partial
/// files behind.
pub fn generate(config: &CompilerConfig) -> Result<GenerationResult, StageError> {
    Generator::new(config).run()
}

struct Generator<'a> {
    config: &'a CompilerConfig,
    font: Font,
    warnings: Vec<String>,
    tables: Vec<CompiledTable>,
}

impl<'a> Generator<'a> {
    fn new(config: &'a CompilerConfig) -> Self {
        Generator {
            config,
            font: Font::default(),
            warnings: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn run(mut self) -> Result<GenerationResult, StageError> {
        let out_dir = self.config.resolved_out_dir();

        self.step(Stage::ValidateConfig, |g| g.config.validate())?;
        self.step(Stage::PrepareOutDir, |_| prepare_out_dir(&out_dir))?;
        self.step(Stage::ParseFont, |g| {
            g.font = loader::load_font(g.config)?;
            Ok(())
        })?;
        self.step(Stage::ValidateFont, |g| {
            let warnings = validator::validate_font(&mut g.font, g.config.missing_glyph)?;
            g.warnings.extend(warnings);
            Ok(())
        })?;
        self.step(Stage::ProcessFont, |g| {
            processor::process_font(&mut g.font, g.config);
            Ok(())
        })?;
        self.step(Stage::CreateBitmap, |g| {
            for variant in &mut g.font.variants {
                encoder::write_variant_bitmap(variant, &out_dir, g.config)?;
            }
            Ok(())
        })?;
        self.step(Stage::WriteTable, |g| {
            g.tables = g.font.variants.iter().map(table::build_table).collect();
            let bytes = manifest::write_manifest(g.config.missing_glyph, &g.tables)?;
            write_artifact(&out_dir.join(manifest::MANIFEST_FILE), bytes.as_slice())
        })?;
        self.step(Stage::CreatePackage, |g| {
            let source = codegen::render_fontface(
                &g.config.result_name,
                g.config.missing_glyph,
                &g.tables,
            )?;
            write_artifact(&out_dir.join(codegen::FONTFACE_FILE), source.as_bytes())
        })?;

        let mut info = None;
        self.step(Stage::GenerateInfo, |g| {
            let summary = FontInfo::from_font(&g.font);
            if g.config.generate_info {
                let doc = report::render_markdown(&g.config.result_name, &summary)?;
                write_artifact(&out_dir.join(report::FONTINFO_FILE), doc.as_bytes())?;
            }
            info = Some(summary);
            Ok(())
        })?;

        let info = info.unwrap_or_else(|| FontInfo::from_font(&self.font));
        Ok(GenerationResult {
            warnings: self.warnings,
            info,
            tables: self.tables,
        })
    }

    fn step<F>(&mut self, stage: Stage, f: F) -> Result<(), StageError>
    where
        F: FnOnce(&mut Self) -> Result<(), FontError>,
    {
        debug!("Stage: {}", stage.name());
        f(self).map_err(|error| StageError { stage, error })?;
        info!("✓ {}", stage.name());
        Ok(())
    }
}

fn prepare_out_dir(dir: &Path) -> Result<(), FontError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| FontError::io_error(e.to_string(), dir))?;
    }
    fs::create_dir_all(dir).map_err(|e| FontError::io_error(e.to_string(), dir))
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), FontError> {
    fs::write(path, bytes).map_err(|e| FontError::EncodingError {
        message: e.to_string(),
        path: Some(path.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display_names_stage() {
        let err = StageError {
            stage: Stage::ValidateFont,
            error: FontError::validation_error("can't find size=1 images", "add one"),
        };
        let s = err.to_string();
        assert!(s.starts_with("validate font: Validation Error: can't find size=1 images"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_display_variants() {
        let pe = FontError::parse_error("bad size", Path::new("_data/x"));
        assert!(pe.to_string().contains("Parse Error: bad size"));
        assert!(pe.to_string().contains("Path: _data/x"));

        let ee = FontError::encoding_error("boom");
        assert_eq!(ee.to_string(), "Encoding Error: boom");

        let ce = FontError::config_error("bad", "fix it");
        assert!(ce.to_string().contains("Suggestion: fix it"));
    }

    #[test]
    fn test_context_prefixes_message() {
        let err = FontError::validation_error("dup", "x").context("size 2.00");
        match err {
            FontError::ValidationError { message, .. } => assert_eq!(message, "size 2.00: dup"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_name_fails_in_config_stage() {
        let config = CompilerConfig::new("_data", "");
        let err = generate(&config).unwrap_err();
        assert_eq!(err.stage, Stage::ValidateConfig);
        assert!(matches!(err.error, FontError::ConfigError { .. }));
    }
}
