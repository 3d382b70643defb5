//! Shared test utilities for the resize-pipe test suite.
//!
//! Provides byte fixtures, small encoded images, stream doubles, and
//! shorthand for shell-backed command specs.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let spec = shell("printf boom >&2; exit 2", Duration::from_secs(5));
//! let jpeg = encoded_image(64, 48, ImageFormat::Jpeg);
//! ```

use crate::pipeline::CommandSpec;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =========================================================================
// Byte fixtures
// =========================================================================

/// Deterministic, non-repeating-looking binary data.
pub fn arbitrary_bytes(len: usize, seed: u8) -> Vec<u8> {
    let mut state = u32::from(seed).wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

// =========================================================================
// Image fixtures
// =========================================================================

/// A gradient image of the given size, encoded in `format`.
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

/// Write a JPEG fixture into `dir` and return its path.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encoded_image(width, height, ImageFormat::Jpeg)).unwrap();
    path
}

/// Decode `bytes` and return `(width, height)`.
pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

// =========================================================================
// Command specs
// =========================================================================

/// `sh -c <script>`; extra `.args(..)` become `$1`, `$2`, ...
pub fn shell(script: &str, deadline: Duration) -> CommandSpec {
    CommandSpec::new("sh", deadline).args(["-c", script, "sh"])
}

// =========================================================================
// Stream doubles
// =========================================================================

/// Reader that counts how often it was read. Always at end-of-stream.
#[derive(Default)]
pub struct UntouchedReader {
    pub reads: usize,
}

impl Read for UntouchedReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        Ok(0)
    }
}

/// Writer whose every write fails.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("sink rejected write"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
