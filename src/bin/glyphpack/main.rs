/// glyphpack binary entry point
///
/// Compiles `size/tag/rune.png` glyph images into a bitmap font package.
///
/// Basic usage:
/// ```sh
/// cargo run --bin glyphpack -- --data-dir _data --name monofont
/// ```
///
/// With a config file and stubs for missing runes:
/// ```sh
/// cargo run --bin glyphpack -- --config glyphpack.toml --on-missing stub -v
/// ```
use clap::Parser;
use glyphpack::config::{
    load_config_from_source, CompilerConfig, ConfigSource, MissingGlyphPolicy,
};
use log::{debug, error, info};
use std::process;

mod args;
mod logging;

use args::GlyphpackArgs;
use logging::init_logging;

fn main() {
    let args = GlyphpackArgs::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    debug!("Parsed arguments: {:?}", args);

    if let Err(e) = run(&args) {
        error!("Error: {}", e);
        process::exit(1);
    }

    info!("Font generation completed successfully");
}

fn run(args: &GlyphpackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    debug!("Effective configuration: {:?}", config);

    // The library has already logged each warning with `warn!`.
    let result = glyphpack::generate(&config)?;
    if !result.warnings.is_empty() {
        info!("{} runes were backfilled with placeholders", result.warnings.len());
    }

    info!(
        "Wrote {} runes in {} sizes to {}",
        result.info.runes.len(),
        result.tables.len(),
        config.resolved_out_dir().display()
    );
    Ok(())
}

/// Merges the optional config file with command-line overrides.
fn build_config(args: &GlyphpackArgs) -> Result<CompilerConfig, Box<dyn std::error::Error>> {
    let source = match &args.config {
        Some(path) => ConfigSource::File(path),
        None => ConfigSource::Default,
    };
    let mut config = load_config_from_source(source)?;

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.out_dir {
        config.out_dir = Some(dir.clone());
    }
    if let Some(name) = &args.name {
        config.result_name = name.clone();
    }
    if !args.tags.is_empty() {
        config.tags = args.tags.clone();
    }
    if let Some(label) = &args.on_missing {
        config.missing_glyph = MissingGlyphPolicy::parse(label)?;
    }
    if args.generate_info {
        config.generate_info = true;
    }
    Ok(config)
}
