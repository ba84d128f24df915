//! Compiler configuration.
//!
//! A [`CompilerConfig`] can be built in code, or loaded from a TOML file whose
//! keys mirror the command-line flags:
//!
//! ```toml
//! data_dir = "_data"
//! out_dir = "monofont"
//! name = "monofont"
//! tags = ["latin", "digits"]
//! on_missing = "stub"
//! generate_info = true
//! ```
//!
//! Values given on the command line take precedence over the file.

use crate::FontError;
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml::{Table, Value};

/// What the runtime does when an in-range rune is absent from a variant.
///
/// The policy is chosen when the font is compiled and recorded in the
/// compiled artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingGlyphPolicy {
    /// Report "no glyph"; the caller renders nothing.
    #[default]
    Empty,
    /// Hand out the variant's stub (hollow rectangle) bitmap.
    Stub,
    /// Treat the request as a programming error and panic.
    Panic,
}

impl MissingGlyphPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingGlyphPolicy::Empty => "empty",
            MissingGlyphPolicy::Stub => "stub",
            MissingGlyphPolicy::Panic => "panic",
        }
    }

    /// Parses a policy label. `emptymask` is accepted for older scripts.
    pub fn parse(label: &str) -> Result<Self, FontError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "" | "empty" | "emptymask" => Ok(MissingGlyphPolicy::Empty),
            "stub" => Ok(MissingGlyphPolicy::Stub),
            "panic" => Ok(MissingGlyphPolicy::Panic),
            other => Err(FontError::config_error(
                format!("unsupported missing glyph policy {:?}", other),
                "Use one of: empty, stub, panic",
            )),
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            MissingGlyphPolicy::Empty => 0,
            MissingGlyphPolicy::Stub => 1,
            MissingGlyphPolicy::Panic => 2,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MissingGlyphPolicy::Empty),
            1 => Some(MissingGlyphPolicy::Stub),
            2 => Some(MissingGlyphPolicy::Panic),
            _ => None,
        }
    }
}

impl fmt::Display for MissingGlyphPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives verbose trace messages emitted while compiling.
pub type TraceSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Everything the compiler needs for one run.
#[derive(Clone)]
pub struct CompilerConfig {
    /// Root of the `size/tag/rune.png` tree.
    pub data_dir: PathBuf,
    /// Where artifacts are written. Defaults to `result_name`.
    pub out_dir: Option<PathBuf>,
    /// Name of the generated module.
    pub result_name: String,
    /// Tag directories to include. Empty means all.
    pub tags: Vec<String>,
    pub missing_glyph: MissingGlyphPolicy,
    /// Render `fontinfo.md` next to the other artifacts.
    pub generate_info: bool,
    pub trace: Option<TraceSink>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            data_dir: PathBuf::from("_data"),
            out_dir: None,
            result_name: "monofont".to_string(),
            tags: Vec::new(),
            missing_glyph: MissingGlyphPolicy::Empty,
            generate_info: false,
            trace: None,
        }
    }
}

impl fmt::Debug for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerConfig")
            .field("data_dir", &self.data_dir)
            .field("out_dir", &self.out_dir)
            .field("result_name", &self.result_name)
            .field("tags", &self.tags)
            .field("missing_glyph", &self.missing_glyph)
            .field("generate_info", &self.generate_info)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl CompilerConfig {
    pub fn new(data_dir: impl Into<PathBuf>, result_name: impl Into<String>) -> Self {
        CompilerConfig {
            data_dir: data_dir.into(),
            result_name: result_name.into(),
            ..Default::default()
        }
    }

    /// The output directory after defaulting.
    pub fn resolved_out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.result_name))
    }

    /// Whether `tag` passes the include-list.
    pub fn includes_tag(&self, tag: &str) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|t| t == tag)
    }

    pub fn validate(&self) -> Result<(), FontError> {
        if self.result_name.is_empty() {
            return Err(FontError::config_error(
                "result name can't be empty",
                "Pass --name <IDENT>",
            ));
        }
        if !is_identifier(&self.result_name) {
            return Err(FontError::config_error(
                format!("result name {:?} is not a valid identifier", self.result_name),
                "Use letters, digits and underscores, not starting with a digit",
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(FontError::config_error(
                "data dir can't be empty",
                "Pass --data-dir <DIR>",
            ));
        }
        Ok(())
    }

    /// Forwards a verbose message to the log and the trace sink.
    pub(crate) fn trace(&self, message: &str) {
        debug!("{}", message);
        if let Some(sink) = &self.trace {
            sink(message);
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Where to read configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Built-in defaults.
    Default,
    /// A TOML file on disk. A missing file falls back to defaults.
    File(&'a Path),
    /// A TOML document held in memory.
    Embedded(&'a str),
}

/// Resolves a [`ConfigSource`] into a configuration.
pub fn load_config_from_source(source: ConfigSource<'_>) -> Result<CompilerConfig, FontError> {
    match source {
        ConfigSource::Default => Ok(CompilerConfig::default()),
        ConfigSource::File(path) => {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        "Could not read config {}: {}; using defaults",
                        path.display(),
                        e
                    );
                    return Ok(CompilerConfig::default());
                }
            };
            parse_config(&content)
        }
        ConfigSource::Embedded(content) => parse_config(content),
    }
}

fn parse_config(content: &str) -> Result<CompilerConfig, FontError> {
    let table: Table = toml::from_str(content).map_err(|e| {
        FontError::config_error(
            format!("invalid TOML: {}", e),
            "Check the configuration file syntax",
        )
    })?;

    let mut config = CompilerConfig::default();
    if let Some(dir) = table.get("data_dir").and_then(Value::as_str) {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = table.get("out_dir").and_then(Value::as_str) {
        config.out_dir = Some(PathBuf::from(dir));
    }
    if let Some(name) = table.get("name").and_then(Value::as_str) {
        config.result_name = name.to_string();
    }
    if let Some(tags) = table.get("tags").and_then(Value::as_array) {
        config.tags = tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(policy) = table.get("on_missing").and_then(Value::as_str) {
        config.missing_glyph = MissingGlyphPolicy::parse(policy)?;
    }
    if let Some(flag) = table.get("generate_info").and_then(Value::as_bool) {
        config.generate_info = flag;
    }
    Ok(config)
}
