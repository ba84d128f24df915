// Shared fixtures for the integration tests.
#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PERIOD: &[&str] = &["....", "....", ".#..", "...."];
pub const LETTER_A: &[&str] = &[".##.", "#..#", "####", "#..#"];
pub const LETTER_B: &[&str] = &["###.", "###.", "#..#", "###."];
pub const LETTER_C: &[&str] = &[".###", "#...", "#...", ".###"];

/// A scratch directory holding a `data/` glyph tree and an `out/` target.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Writes `data/<size>/<tag>/<rune>.png` from `#`/`.` rows.
    pub fn glyph(&self, size: &str, tag: &str, rune: char, rows: &[&str]) -> &Self {
        let dir = self.data_dir().join(size).join(tag);
        fs::create_dir_all(&dir).expect("create glyph dir");
        write_png(&dir.join(format!("{}.png", rune as u32)), rows);
        self
    }

    /// Writes an arbitrary file into the glyph tree.
    pub fn raw_file(&self, relative: &str, bytes: &[u8]) -> &Self {
        let path = self.data_dir().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(&path, bytes).expect("write file");
        self
    }
}

pub fn write_png(path: &Path, rows: &[&str]) {
    let height = rows.len() as u32;
    let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if rows[y as usize].as_bytes()[x as usize] == b'#' {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 0])
        }
    });
    img.save(path).expect("save png");
}

/// `{1: '.', 'A', 'B'}` and `{2: '.', 'A'}` under the `latin` tag.
pub fn two_size_font() -> Fixture {
    let fx = Fixture::new();
    fx.glyph("1", "latin", '.', PERIOD)
        .glyph("1", "latin", 'A', LETTER_A)
        .glyph("1", "latin", 'B', LETTER_B)
        .glyph("2", "latin", '.', PERIOD)
        .glyph("2", "latin", 'A', LETTER_A);
    fx
}
