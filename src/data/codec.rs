// ============================================================
// Layer 4 — Image Codec
// ============================================================
// Turns encoded bytes (JPEG, PNG, GIF, BMP, WebP, TIFF) into
// an in-memory DynamicImage. The format is sniffed from the
// bytes, never from a filename.

use std::{fs, io, path::Path};

use image::DynamicImage;

use crate::domain::error::{ClassifierError, Result};

pub struct ImageCodec;

impl ImageCodec {
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }
        image::load_from_memory(bytes).map_err(ClassifierError::UnsupportedFormat)
    }

    pub fn decode_file(path: &Path) -> Result<DynamicImage> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ClassifierError::MissingResource { path: path.to_path_buf() },
            _ => ClassifierError::Io(e),
        })?;
        Self::decode(&bytes)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Encode a solid-colour image; shared with other test modules.
    pub(crate) fn encoded(color: [u8; 3], w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_empty_bytes() {
        assert!(matches!(ImageCodec::decode(&[]), Err(ClassifierError::EmptyInput)));
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let err = ImageCodec::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_decodes_png_and_jpeg() {
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let img = ImageCodec::decode(&encoded([10, 200, 30], 8, 6, format)).unwrap();
            assert_eq!((img.width(), img.height()), (8, 6));
        }
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageCodec::decode_file(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingResource { .. }));
    }
}
