//! Upload decoding.
//!
//! Turns raw upload bytes into an RGB bitmap plus the JPEG snapshot that is
//! sent to the classifier and kept in history.

use std::io::Cursor;

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, Limits, RgbImage};

use crate::error::{AppError, AppResult};

const SNAPSHOT_QUALITY: u8 = 85;
const MAX_DIMENSION: u32 = 4096;
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// A successfully decoded upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub rgb: RgbImage,

    /// The bitmap re-encoded as JPEG
    pub jpeg: Vec<u8>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Standard base64 of the JPEG snapshot.
    pub fn snapshot_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }
}

/// Decode `bytes` in any supported format.
///
/// # Errors
///
/// `InvalidImage` for empty input, an unrecognized format, corrupt data, or
/// a bitmap wider or taller than `MAX_DIMENSION` pixels.
pub fn decode(bytes: &[u8]) -> AppResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(AppError::InvalidImage("empty upload".into()));
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;
    reader.limits(decode_limits());
    let decoded = reader
        .decode()
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;
    let rgb = decoded.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, SNAPSHOT_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| AppError::Internal(format!("jpeg encode: {e}")))?;

    Ok(DecodedImage { rgb, jpeg })
}

/// [`decode`] on the blocking thread pool.
pub async fn decode_blocking(bytes: Bytes) -> AppResult<DecodedImage> {
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| AppError::Internal(format!("decode task failed: {e}")))?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    /// A small solid-colour PNG.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_and_snapshots_as_jpeg() {
        let decoded = decode(&png_bytes(16, 8)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        // JPEG SOI marker
        assert_eq!(&decoded.jpeg[..2], &[0xFF, 0xD8]);

        let b64 = decoded.snapshot_base64();
        assert_eq!(STANDARD.decode(b64).unwrap(), decoded.jpeg);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(decode(&[]), Err(AppError::InvalidImage(_))));
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(AppError::InvalidImage(_))
        ));
    }

    #[test]
    fn rejects_oversized_dimensions() {
        assert!(matches!(
            decode(&png_bytes(MAX_DIMENSION + 1, 1)),
            Err(AppError::InvalidImage(_))
        ));
        assert!(matches!(
            decode(&png_bytes(1, MAX_DIMENSION + 1)),
            Err(AppError::InvalidImage(_))
        ));

        let edge = decode(&png_bytes(MAX_DIMENSION, 1)).unwrap();
        assert_eq!(edge.width(), MAX_DIMENSION);
    }

    #[tokio::test]
    async fn blocking_decode_matches() {
        let decoded = decode_blocking(Bytes::from(png_bytes(4, 4))).await.unwrap();
        assert_eq!(decoded.width(), 4);
    }
}
