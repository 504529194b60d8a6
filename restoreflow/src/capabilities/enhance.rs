//! Local enhancement used when image generation is unavailable.
//!
//! Each adjustment blends the image with a degenerate version of itself
//! (mean gray, blurred copy, grayscale copy, black) by a factor, so a factor
//! of 1.0 is the identity.

use super::CapabilityError;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};

/// Factors applied by [`enhance_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceSettings {
    /// Contrast factor.
    pub contrast: f32,
    /// Sharpness factor.
    pub sharpness: f32,
    /// Color saturation factor.
    pub color: f32,
    /// Brightness factor.
    pub brightness: f32,
    /// JPEG quality of the output (1-100).
    pub jpeg_quality: u8,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            contrast: 1.4,
            sharpness: 1.5,
            color: 1.3,
            brightness: 1.15,
            jpeg_quality: 95,
        }
    }
}

/// Smoothing kernel the sharpness adjustment blends against.
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0,
    1.0 / 13.0, 5.0 / 13.0, 1.0 / 13.0,
    1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0,
];

/// Decodes `bytes`, applies contrast, sharpness, color and brightness
/// adjustments in that order, and re-encodes as JPEG.
///
/// # Errors
///
/// Returns `CapabilityError::Image` if the bytes cannot be decoded or the
/// result cannot be encoded.
pub fn enhance_image(bytes: &[u8], settings: &EnhanceSettings) -> Result<Vec<u8>, CapabilityError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| CapabilityError::Image(e.to_string()))?;
    let mut img = decoded.to_rgb8();

    adjust_contrast(&mut img, settings.contrast);
    let mut img = adjust_sharpness(&img, settings.sharpness);
    adjust_color(&mut img, settings.color);
    adjust_brightness(&mut img, settings.brightness);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, settings.jpeg_quality)
        .encode_image(&img)
        .map_err(|e| CapabilityError::Image(e.to_string()))?;
    Ok(out)
}

fn luma(px: &Rgb<u8>) -> f32 {
    let [r, g, b] = px.0;
    0.299f32.mul_add(f32::from(r), 0.587f32.mul_add(f32::from(g), 0.114 * f32::from(b)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(base: f32, value: u8, factor: f32) -> u8 {
    factor
        .mul_add(f32::from(value) - base, base)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_precision_loss)]
fn adjust_contrast(img: &mut RgbImage, factor: f32) {
    let count = img.pixels().len();
    if count == 0 {
        return;
    }
    let mean = (img.pixels().map(luma).sum::<f32>() / count as f32).round();
    for px in img.pixels_mut() {
        for channel in &mut px.0 {
            *channel = blend(mean, *channel, factor);
        }
    }
}

fn adjust_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    let smooth: RgbImage = imageops::filter3x3(img, &SMOOTH_KERNEL);
    let mut out = img.clone();
    for (px, smooth_px) in out.pixels_mut().zip(smooth.pixels()) {
        for (channel, base) in px.0.iter_mut().zip(smooth_px.0) {
            *channel = blend(f32::from(base), *channel, factor);
        }
    }
    out
}

fn adjust_color(img: &mut RgbImage, factor: f32) {
    for px in img.pixels_mut() {
        let gray = luma(px);
        for channel in &mut px.0 {
            *channel = blend(gray, *channel, factor);
        }
    }
}

fn adjust_brightness(img: &mut RgbImage, factor: f32) {
    for px in img.pixels_mut() {
        for channel in &mut px.0 {
            *channel = blend(0.0, *channel, factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 20) as u8, (y * 20) as u8, 100])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_enhance_outputs_jpeg_of_same_size() {
        let out = enhance_image(&sample_png(8, 6), &EnhanceSettings::default()).unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_enhance_rejects_garbage() {
        let err = enhance_image(b"not an image", &EnhanceSettings::default()).unwrap_err();
        assert!(matches!(err, CapabilityError::Image(_)));
    }

    #[test]
    fn test_blend_identity_and_clamp() {
        assert_eq!(blend(128.0, 200, 1.0), 200);
        assert_eq!(blend(0.0, 200, 1.5), 255);
        assert_eq!(blend(100.0, 50, 2.0), 0);
    }

    #[test]
    fn test_brightness_scales_channels() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([100, 50, 0]));
        adjust_brightness(&mut img, 1.2);
        assert_eq!(img.get_pixel(0, 0).0, [120, 60, 0]);
    }

    #[test]
    fn test_color_factor_zero_is_grayscale() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));
        adjust_color(&mut img, 0.0);
        let [r, g, b] = img.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_contrast_on_flat_image_is_stable() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([90, 90, 90]));
        adjust_contrast(&mut img, 1.4);
        assert_eq!(img.get_pixel(1, 1).0, [90, 90, 90]);
    }
}
