//! Decode accepted candidates into source bitmaps.
//!
//! Decoding is the first suspend point in the pipeline: it runs on the
//! blocking pool so large files never stall the event loop. The session
//! applies the result only if no newer decode started in the meantime.

use super::{AcquireError, CandidateFile};
use image::DynamicImage;
use std::sync::Arc;

/// A decoded source image plus its natural dimensions.
///
/// The bitmap is behind an `Arc` so rasterization jobs can snapshot the
/// source cheaply while the session keeps ownership.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bitmap: Arc<DynamicImage>,
    natural_width: u32,
    natural_height: u32,
}

impl SourceImage {
    pub fn from_bitmap(bitmap: DynamicImage) -> Result<Self, AcquireError> {
        let (natural_width, natural_height) = (bitmap.width(), bitmap.height());
        if natural_width == 0 || natural_height == 0 {
            return Err(AcquireError::EmptyImage);
        }
        Ok(Self {
            bitmap: Arc::new(bitmap),
            natural_width,
            natural_height,
        })
    }

    pub fn natural_width(&self) -> u32 {
        self.natural_width
    }

    pub fn natural_height(&self) -> u32 {
        self.natural_height
    }

    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }
}

/// Decodes a validated candidate into a [`SourceImage`].
///
/// Any decoder failure surfaces as [`AcquireError::FileReadError`]; the
/// caller's previous source image stays untouched.
pub async fn decode_candidate(candidate: CandidateFile) -> Result<SourceImage, AcquireError> {
    let name = candidate.name.clone();
    let byte_len = candidate.bytes.len();

    let bitmap = tokio::task::spawn_blocking(move || image::load_from_memory(&candidate.bytes))
        .await
        .map_err(|e| AcquireError::FileReadError(format!("decode task failed: {e}")))?
        .map_err(|e| AcquireError::FileReadError(e.to_string()))?;

    let source = SourceImage::from_bitmap(bitmap)?;
    log::info!(
        "[ACQUIRE] Decoded {:?} ({} bytes) — {}x{}",
        name,
        byte_len,
        source.natural_width(),
        source.natural_height()
    );
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_candidate(width: u32, height: u32) -> CandidateFile {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        CandidateFile::new("test.png", "image/png", bytes)
    }

    #[tokio::test]
    async fn decodes_png_with_natural_dimensions() {
        let source = decode_candidate(png_candidate(40, 30)).await.unwrap();
        assert_eq!(source.natural_width(), 40);
        assert_eq!(source.natural_height(), 30);
    }

    #[tokio::test]
    async fn garbage_bytes_are_a_read_error() {
        let garbage = CandidateFile::new("x.png", "image/png", vec![0xAB; 128]);
        let err = decode_candidate(garbage).await.unwrap_err();
        assert!(matches!(err, AcquireError::FileReadError(_)));
    }

    #[tokio::test]
    async fn data_url_candidates_decode_too() {
        let url = png_candidate(8, 8).to_data_url();
        let candidate = CandidateFile::from_data_url("seeded", &url).unwrap();
        let source = decode_candidate(candidate).await.unwrap();
        assert_eq!((source.natural_width(), source.natural_height()), (8, 8));
    }
}
