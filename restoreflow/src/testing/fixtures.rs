//! Image fixtures and ready-made capability sets.

use super::{ScriptedText, ScriptedVision};
use crate::capabilities::CapabilitySet;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identification of a weathered stone bust, in the vision output layout.
pub const STONE_BUST_IDENTIFICATION: &str = "TYPE: Sculpture (portrait bust)\n\
NAME: Unknown\n\
PERIOD: Roman Imperial, 2nd century CE\n\
MATERIALS: Stone\n\
CONDITION: 70%\n\
DAMAGE: chipped nose, surface erosion\n\
MISSING_PARTS: tip of the nose\n\
DESCRIPTION: Bearded male portrait bust on a low base";

/// Encodes a small gradient PNG.
///
/// # Panics
///
/// Panics if the PNG encoder rejects the buffer.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sample_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 16 % 256) as u8, (y * 16 % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("fixture image encodes as PNG");
    bytes
}

/// Writes a small PNG named `name` into `dir` and returns its path.
///
/// # Panics
///
/// Panics if the file cannot be written.
#[must_use]
pub fn write_sample_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, sample_png_bytes(16, 12)).expect("fixture image is writable");
    path
}

/// Capabilities that identify a stone bust and answer every text request
/// with `text_reply`. No image generation.
#[must_use]
pub fn stone_bust_capabilities(text_reply: &str) -> CapabilitySet {
    CapabilitySet::new(
        Arc::new(ScriptedVision::replying(STONE_BUST_IDENTIFICATION)),
        Arc::new(ScriptedText::replying(text_reply)),
    )
}
