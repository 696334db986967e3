//! Shrink and re-encode downloaded images for inline upload.

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(String),
    #[error("failed to re-encode image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// Longest side after downscaling
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 85,
        }
    }
}

/// Target size for an image of `width` x `height` so the longest side is at
/// most `max_dimension`, keeping the aspect ratio. Smaller images keep their size.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longest);
        (scaled as u32).max(1)
    };
    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Downscale with Lanczos resampling when the image exceeds the cap.
pub fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = fit_within(width, height, max_dimension);
    if (target_w, target_h) == (width, height) {
        return image;
    }
    image.resize_exact(target_w, target_h, FilterType::Lanczos3)
}

/// Decode `bytes`, downscale, re-encode as JPEG and return base64 text.
///
/// CPU bound; callers on the async runtime should use `spawn_blocking`.
pub fn prepare_upload(bytes: &[u8], options: EncodeOptions) -> Result<String, EncodeError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| EncodeError::Decode(e.to_string()))?;
    let resized = downscale(image, options.max_dimension);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|e| EncodeError::Encode(e.to_string()))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([200, 40, 90, 128]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode_upload(encoded: &str) -> DynamicImage {
        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        image::load_from_memory(&jpeg).unwrap()
    }

    #[test]
    fn fit_within_keeps_small_images() {
        assert_eq!(fit_within(800, 600, 1024), (800, 600));
        assert_eq!(fit_within(1024, 1024, 1024), (1024, 1024));
    }

    #[test]
    fn fit_within_scales_longest_side_to_cap() {
        assert_eq!(fit_within(2048, 1024, 1024), (1024, 512));
        assert_eq!(fit_within(1000, 3000, 1024), (341, 1024));
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        for (w, h) in [(4000, 3000), (1025, 77), (1500, 1499), (3, 5000)] {
            let (tw, th) = fit_within(w, h, 1024);
            assert_eq!(tw.max(th), 1024);
            let expected_short = f64::from(w.min(h)) * 1024.0 / f64::from(w.max(h));
            let short = f64::from(tw.min(th));
            assert!(
                (short - expected_short).abs() <= 1.0,
                "{w}x{h} -> {tw}x{th}"
            );
        }
    }

    #[test]
    fn large_image_is_downscaled_and_reencoded() {
        let encoded = prepare_upload(&png_bytes(1600, 900), EncodeOptions::default()).unwrap();
        let decoded = decode_upload(&encoded);
        assert_eq!(decoded.dimensions(), (1024, 576));
    }

    #[test]
    fn small_image_keeps_dimensions() {
        let encoded = prepare_upload(&png_bytes(320, 200), EncodeOptions::default()).unwrap();
        assert_eq!(decode_upload(&encoded).dimensions(), (320, 200));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = prepare_upload(b"definitely not an image", EncodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, EncodeError::Decode(_)));
    }
}
