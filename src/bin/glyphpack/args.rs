/// Command-line argument parsing
///
/// Flags override the values read from `--config`. Verbosity follows the
/// usual -v / -vv / -q scheme, with RUST_LOG taking precedence.
use clap::Parser;
use std::path::PathBuf;

/// Compile a directory of glyph images into a bitmap font
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct GlyphpackArgs {
    /// Root of the size/tag/rune.png tree [default: _data]
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output directory [default: the result name]
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Name of the generated module [default: monofont]
    #[arg(long, value_name = "IDENT")]
    pub name: Option<String>,

    /// Comma-separated list of tag directories to include
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Behavior for runes missing from a size: empty, stub or panic
    #[arg(long, value_name = "POLICY")]
    pub on_missing: Option<String>,

    /// Also write fontinfo.md
    #[arg(long)]
    pub generate_info: bool,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short)]
    pub quiet: bool,

    /// Set explicit verbosity level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub verbose_level: Option<String>,
}

impl GlyphpackArgs {
    /// Resolve the log level the process should run with
    ///
    /// Priority, highest first:
    /// 1. RUST_LOG, returned verbatim so module filters survive
    /// 2. `--verbose-level`
    /// 3. `-q`, which maps to `error`
    /// 4. the `-v` count: `info`, `debug`, then `trace` for two or more
    pub fn effective_log_level(&self) -> String {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            return rust_log;
        }
        if let Some(level) = &self.verbose_level {
            return level.clone();
        }
        if self.quiet {
            return "error".to_string();
        }
        match self.verbose {
            0 => "info".to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}
