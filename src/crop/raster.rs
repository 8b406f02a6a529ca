//! Rasterize a crop region against a source bitmap.
//!
//! This is the pure compute heart of the pipeline: region in, encoded bytes
//! out. Output dimensions are `floor(crop_dim * pixel_ratio)` so high-density
//! displays get a physically sharp result, and resampling uses a high-quality
//! filter to match that intent.

use super::region::CropRegion;
use crate::acquire::SourceImage;
use crate::config::{OutputFormat, PipelineConfig};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// An encoded crop at output resolution, ready for the gate and dispatcher.
///
/// Superseded wholesale on every recomputation — never mutated in place.
#[derive(Debug, Clone)]
pub struct RasterizedCrop {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Encoder produced no data — possible cross-origin restriction on the source")]
    EmptyOutput,
}

/// Rasterizes `region` against `source` at the configured pixel ratio.
///
/// Returns `Ok(None)` for degenerate (zero-size) regions: those occur
/// transiently during drag gestures and are not a user-facing failure.
pub fn rasterize(
    source: &SourceImage,
    region: &CropRegion,
    config: &PipelineConfig,
) -> Result<Option<RasterizedCrop>, RasterError> {
    let crop = region.to_pixels(source.natural_width(), source.natural_height());
    if crop.is_empty() {
        return Ok(None);
    }

    let ratio = config.effective_pixel_ratio();
    let out_width = (crop.width * ratio).floor() as u32;
    let out_height = (crop.height * ratio).floor() as u32;
    if out_width == 0 || out_height == 0 {
        return Ok(None);
    }

    // Resolve the fractional source rect to whole pixels, clamped to the
    // bitmap. The region has already been constrained, so this only absorbs
    // rounding slop at the edges.
    let src_x = (crop.x.round().max(0.0) as u32).min(source.natural_width() - 1);
    let src_y = (crop.y.round().max(0.0) as u32).min(source.natural_height() - 1);
    let src_w = (crop.width.round() as u32)
        .min(source.natural_width() - src_x)
        .max(1);
    let src_h = (crop.height.round() as u32)
        .min(source.natural_height() - src_y)
        .max(1);

    let cropped = source.bitmap().crop_imm(src_x, src_y, src_w, src_h);
    let scaled = if (src_w, src_h) == (out_width, out_height) {
        cropped
    } else {
        cropped.resize_exact(out_width, out_height, FilterType::CatmullRom)
    };

    let bytes = encode(&scaled, config)?;
    if bytes.is_empty() {
        return Err(RasterError::EmptyOutput);
    }

    log::debug!(
        "[RASTER] {}x{} at ({}, {}) × ratio {} -> {}x{} ({} bytes, {})",
        src_w,
        src_h,
        src_x,
        src_y,
        ratio,
        out_width,
        out_height,
        bytes.len(),
        config.output.mime()
    );

    Ok(Some(RasterizedCrop {
        bytes,
        width: out_width,
        height: out_height,
        mime: config.output.mime(),
    }))
}

/// Encodes the scaled bitmap in the configured output format.
///
/// The quality knob only reaches the encoder for lossy formats; PNG is
/// lossless and ignores it.
fn encode(bitmap: &DynamicImage, config: &PipelineConfig) -> Result<Vec<u8>, RasterError> {
    let mut bytes: Vec<u8> = Vec::new();
    match config.output {
        OutputFormat::Png => bitmap
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| RasterError::EncodingFailed(e.to_string()))?,
        OutputFormat::Jpeg => {
            let quality = (config.quality.clamp(0.0, 1.0) * 100.0).round() as u8;
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(bitmap.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
                .map_err(|e| RasterError::EncodingFailed(e.to_string()))?;
        }
    }
    Ok(bytes)
}
