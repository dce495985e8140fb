//! Photo normalization.
//!
//! Photos arrive as whatever the camera or file picker produced. Before they
//! are stored they are decoded, scaled down so the longer side fits a bound,
//! and re-encoded as JPEG.

use std::fmt;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::config::PhotoConfig;
use crate::error::{Error, Result};

/// Default bound for the longer side, in pixels.
pub const DEFAULT_MAX_DIMENSION_PX: u32 = 800;

/// Default lossy quality, in (0, 1].
pub const DEFAULT_QUALITY: f32 = 0.7;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// An encoded (JPEG) photo.
///
/// Serializes as a `data:` URL so stored records stay plain JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo(Vec<u8>);

impl Photo {
    /// Wrap already encoded bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size of the encoded photo in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a `data:image/jpeg;base64,...` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&self.0))
    }

    /// Parse a data URL, or bare base64.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PhotoPayload`] if the payload is not valid base64.
    pub fn from_data_url(value: &str) -> Result<Self> {
        let encoded = match value.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => value,
        };
        Ok(Self(STANDARD.decode(encoded)?))
    }
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Photo({} bytes)", self.0.len())
    }
}

impl Serialize for Photo {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for Photo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_data_url(&value).map_err(serde::de::Error::custom)
    }
}

/// Scale `(width, height)` so the longer side is at most `max_dimension`.
///
/// Aspect ratio is preserved and images are never upscaled.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_dimension || longer == 0 {
        return (width, height);
    }

    let scale = f64::from(max_dimension) / f64::from(longer);
    let scaled = |side: u32| -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (f64::from(side) * scale).round() as u32;
        value.clamp(1, max_dimension)
    };

    if width >= height {
        (max_dimension, scaled(height))
    } else {
        (scaled(width), max_dimension)
    }
}

/// Decode, bound and re-encode an image.
///
/// # Errors
///
/// Returns [`Error::InvalidCompression`] for a zero bound or a quality
/// outside (0, 1], [`Error::ImageDecode`] if `raw` is not a readable image,
/// and [`Error::ImageEncode`] if JPEG encoding fails.
pub fn compress(raw: &[u8], max_dimension: u32, quality: f32) -> Result<Vec<u8>> {
    let jpeg_quality = jpeg_quality(quality)?;
    if max_dimension == 0 {
        return Err(Error::InvalidCompression {
            message: "max dimension must be greater than 0".to_string(),
        });
    }

    let img = image::load_from_memory(raw).map_err(Error::ImageDecode)?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, max_dimension);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, jpeg_quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(Error::ImageEncode)?;

    let out = out.into_inner();
    debug!(
        "Compressed photo {}x{} ({} bytes) to {}x{} ({} bytes)",
        width,
        height,
        raw.len(),
        target_w,
        target_h,
        out.len()
    );
    Ok(out)
}

/// Map a (0, 1] quality onto the JPEG encoder's 1..=100 scale.
fn jpeg_quality(quality: f32) -> Result<u8> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(Error::InvalidCompression {
            message: format!("quality must be in (0, 1], got {quality}"),
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (quality * 100.0).round() as u8;
    Ok(scaled.max(1))
}

/// Compresses photos with fixed settings, off the async executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageCompressor {
    max_dimension: u32,
    quality: f32,
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION_PX,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl From<&PhotoConfig> for ImageCompressor {
    fn from(config: &PhotoConfig) -> Self {
        Self::new(config.max_dimension_px, config.quality)
    }
}

impl ImageCompressor {
    /// Create a compressor with the given bound and quality.
    #[must_use]
    pub fn new(max_dimension: u32, quality: f32) -> Self {
        Self {
            max_dimension,
            quality,
        }
    }

    /// Compress `raw` into a [`Photo`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// See [`compress`].
    pub async fn compress(&self, raw: &[u8]) -> Result<Photo> {
        let raw = raw.to_vec();
        let Self {
            max_dimension,
            quality,
        } = *self;

        let bytes = tokio::task::spawn_blocking(move || compress(&raw, max_dimension, quality))
            .await
            .map_err(|e| Error::internal(format!("photo compression task failed: {e}")))??;
        Ok(Photo::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]);
        }
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn test_fit_within_landscape() {
        assert_eq!(fit_within(1600, 1200, 800), (800, 600));
    }

    #[test]
    fn test_fit_within_portrait() {
        assert_eq!(fit_within(1200, 1600, 800), (600, 800));
    }

    #[test]
    fn test_fit_within_no_upscale() {
        assert_eq!(fit_within(400, 300, 800), (400, 300));
        assert_eq!(fit_within(800, 800, 800), (800, 800));
    }

    #[test]
    fn test_fit_within_extreme_ratio() {
        assert_eq!(fit_within(10_000, 5, 800), (800, 1));
    }

    #[test]
    fn test_compress_large_image_is_bounded() {
        let output = compress(&png_bytes(1600, 1200), 800, 0.7).unwrap();
        let (w, h) = decoded_dimensions(&output);

        assert_eq!(w.max(h), 800);
        // 4:3 within a pixel of rounding
        assert!((i64::from(w) * 3 - i64::from(h) * 4).abs() <= 4);
    }

    #[test]
    fn test_compress_small_image_not_scaled() {
        let output = compress(&png_bytes(400, 300), 800, 0.7).unwrap();
        assert_eq!(decoded_dimensions(&output), (400, 300));
    }

    #[test]
    fn test_compress_outputs_jpeg() {
        let output = compress(&png_bytes(64, 48), 800, 0.7).unwrap();
        assert_eq!(
            image::guess_format(&output).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_compress_rejects_garbage() {
        let err = compress(b"definitely not an image", 800, 0.7).unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn test_compress_rejects_bad_quality() {
        let png = png_bytes(10, 10);
        assert!(matches!(
            compress(&png, 800, 0.0),
            Err(Error::InvalidCompression { .. })
        ));
        assert!(matches!(
            compress(&png, 800, 1.5),
            Err(Error::InvalidCompression { .. })
        ));
        assert!(matches!(
            compress(&png, 0, 0.7),
            Err(Error::InvalidCompression { .. })
        ));
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(0.7).unwrap(), 70);
        assert_eq!(jpeg_quality(1.0).unwrap(), 100);
        assert_eq!(jpeg_quality(0.001).unwrap(), 1);
        assert!(jpeg_quality(f32::NAN).is_err());
    }

    #[tokio::test]
    async fn test_image_compressor_async() {
        let compressor = ImageCompressor::default();
        let photo = compressor.compress(&png_bytes(1600, 1200)).await.unwrap();
        assert_eq!(decoded_dimensions(photo.as_bytes()), (800, 600));
    }

    #[test]
    fn test_photo_data_url_roundtrip() {
        let photo = Photo::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        let url = photo.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(Photo::from_data_url(&url).unwrap(), photo);
    }

    #[test]
    fn test_photo_accepts_bare_base64() {
        let photo = Photo::from_data_url("/9j/4A==").unwrap();
        assert_eq!(photo.as_bytes(), &[0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn test_photo_rejects_invalid_base64() {
        let err = Photo::from_data_url("data:image/jpeg;base64,!!!").unwrap_err();
        assert!(matches!(err, Error::PhotoPayload(_)));
    }

    #[test]
    fn test_photo_debug_hides_payload() {
        let photo = Photo::from_bytes(vec![1, 2, 3]);
        assert_eq!(format!("{photo:?}"), "Photo(3 bytes)");
    }
}
