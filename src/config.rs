//! Pipeline configuration — everything the embedding shell injects.
//!
//! The device pixel ratio in particular is deliberately a config value, not a
//! runtime global, so the scaling arithmetic stays deterministic under test.

use serde::Deserialize;

/// Hard cap on accepted upload size: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Product default for the smallest selectable crop, in source pixels.
pub const DEFAULT_MIN_CROP: (u32, u32) = (100, 100);

/// Advisory encode quality. Ignored by PNG (lossless), honored by JPEG.
pub const DEFAULT_ENCODE_QUALITY: f32 = 0.95;

/// Output encoding for rasterized crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// File name used for the multipart upload part.
    pub fn upload_file_name(self) -> &'static str {
        match self {
            OutputFormat::Png => "cropped_image.png",
            OutputFormat::Jpeg => "cropped_image.jpg",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Fixed width/height ratio the crop region must keep. `None` = free-form.
    pub aspect: Option<f64>,
    /// Smallest allowed crop, in source pixels.
    pub min_width: u32,
    pub min_height: u32,
    /// Largest accepted candidate file, in bytes.
    pub max_file_bytes: u64,
    /// Display density multiplier applied when rasterizing.
    pub pixel_ratio: f64,
    pub output: OutputFormat,
    /// Advisory quality in `0.0..=1.0`; a no-op for PNG.
    pub quality: f32,
    /// Advertised ideal dimensions, surfaced to callers for display only.
    /// They do not constrain the crop.
    pub target_dimensions: Option<(u32, u32)>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aspect: None,
            min_width: DEFAULT_MIN_CROP.0,
            min_height: DEFAULT_MIN_CROP.1,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            pixel_ratio: 1.0,
            output: OutputFormat::Png,
            quality: DEFAULT_ENCODE_QUALITY,
            target_dimensions: None,
        }
    }
}

impl PipelineConfig {
    /// The pixel ratio actually used for rasterization.
    ///
    /// Anything non-finite or below 1 falls back to 1, matching displays
    /// that never report a density under 1x.
    pub fn effective_pixel_ratio(&self) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio >= 1.0 {
            self.pixel_ratio
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!((cfg.min_width, cfg.min_height), (100, 100));
        assert_eq!(cfg.output, OutputFormat::Png);
        assert!((cfg.quality - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"aspect": 1.0, "pixelRatio": 2.0}"#).unwrap();
        assert_eq!(cfg.aspect, Some(1.0));
        assert_eq!(cfg.effective_pixel_ratio(), 2.0);
        assert_eq!(cfg.min_width, 100);
    }

    #[test]
    fn bogus_pixel_ratio_falls_back_to_one() {
        let mut cfg = PipelineConfig::default();
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            cfg.pixel_ratio = bad;
            assert_eq!(cfg.effective_pixel_ratio(), 1.0, "ratio {bad} should fall back");
        }
    }
}
