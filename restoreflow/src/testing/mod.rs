//! Testing utilities for restoreflow workflows.
//!
//! This module provides:
//! - Scripted vision, text and image capabilities
//! - Image fixtures for stages that read from disk

mod fixtures;
mod mocks;

pub use fixtures::{
    sample_png_bytes, stone_bust_capabilities, write_sample_image, STONE_BUST_IDENTIFICATION,
};
pub use mocks::{ScriptedImage, ScriptedText, ScriptedVision};
