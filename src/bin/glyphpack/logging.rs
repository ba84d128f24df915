/// Logging initialization
///
/// Sets up env_logger from the CLI verbosity flags. RUST_LOG, when set,
/// wins over every flag and may carry per-module filters.
use crate::args::GlyphpackArgs;
use env_logger::Builder;
use log::LevelFilter;

/// Initialize logging from the parsed arguments
///
/// # Arguments
///
/// * `args` - Command-line arguments carrying the verbosity flags
///
/// # Level selection
///
/// 1. RUST_LOG, which may also hold per-module directives such as
///    `glyphpack::loader=trace`
/// 2. `--verbose-level`
/// 3. `-q` (errors only)
/// 4. `-v` count: none for info, one for debug, more for trace
///
/// Lines are written to stderr as `[LEVEL] message`, so warnings about
/// placeholder glyphs read like `[WARN] 2.00/latin/66('B'): using a placeholder image`.
///
/// # Errors
///
/// Fails if a global logger is already installed.
pub fn init_logging(args: &GlyphpackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::new();

    let level_str = args.effective_log_level();
    let level_filter = match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => {
            // Module-level directives; unprefixed records default to info.
            builder.parse_filters(&level_str);
            LevelFilter::Info
        }
    };
    builder.filter_level(level_filter);

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });

    builder
        .try_init()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    Ok(())
}
