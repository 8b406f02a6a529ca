//! Crop region model — pure geometry, no I/O.
//!
//! Regions arrive from the embedding shell in percent or pixel units and are
//! re-constrained after every mutation: fixed aspect is preserved, the region
//! never shrinks below the configured minimum, and it always stays inside the
//! source image. Containment wins over the minimum when the two conflict
//! (a 50px-wide image cannot hold a 100px-wide crop).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropUnit {
    Percent,
    Pixel,
}

/// A rectangular crop selection in the declared unit, relative to the source
/// image's natural dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub unit: CropUnit,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A region resolved to source-image pixel coordinates.
///
/// Kept as `f64` — percent conversion produces fractional values and the
/// rasterizer owns the final integer rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelCrop {
    /// True for degenerate selections that appear transiently mid-drag.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl CropRegion {
    pub fn percent(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            unit: CropUnit::Percent,
            x,
            y,
            width,
            height,
        }
    }

    pub fn pixels(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            unit: CropUnit::Pixel,
            x,
            y,
            width,
            height,
        }
    }

    /// The region selected automatically when an image finishes decoding:
    /// 80% of the natural width, height following the locked aspect ratio,
    /// centered in the frame.
    pub fn initial(natural_width: u32, natural_height: u32, aspect: Option<f64>) -> Self {
        let nw = natural_width as f64;
        let nh = natural_height as f64;
        let aspect = aspect.filter(|a| a.is_finite() && *a > 0.0);

        let mut width_pct = 80.0;
        let mut height_pct = match aspect {
            Some(a) => (width_pct / 100.0 * nw / a) / nh * 100.0,
            None => 80.0,
        };

        // A tall aspect on a wide image overflows the frame; shrink the box
        // along the locked ratio until it fits.
        if height_pct > 100.0 {
            height_pct = 100.0;
            if let Some(a) = aspect {
                width_pct = (nh * a) / nw * 100.0;
            }
        }

        Self {
            unit: CropUnit::Percent,
            x: (100.0 - width_pct) / 2.0,
            y: (100.0 - height_pct) / 2.0,
            width: width_pct,
            height: height_pct,
        }
    }

    /// Resolves the region to source pixel coordinates.
    pub fn to_pixels(&self, natural_width: u32, natural_height: u32) -> PixelCrop {
        match self.unit {
            CropUnit::Pixel => PixelCrop {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            },
            CropUnit::Percent => PixelCrop {
                x: self.x / 100.0 * natural_width as f64,
                y: self.y / 100.0 * natural_height as f64,
                width: self.width / 100.0 * natural_width as f64,
                height: self.height / 100.0 * natural_height as f64,
            },
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Applies every selector invariant to a freshly mutated region and
    /// returns the corrected region in the original unit.
    ///
    /// Order matters: minimum size first, then the aspect lock, then the
    /// image-bounds cap (which re-derives the other edge through the aspect),
    /// and finally position clamping.
    pub fn constrained(
        &self,
        natural_width: u32,
        natural_height: u32,
        aspect: Option<f64>,
        min_width: u32,
        min_height: u32,
    ) -> Self {
        let nw = natural_width as f64;
        let nh = natural_height as f64;
        let aspect = aspect.filter(|a| a.is_finite() && *a > 0.0);
        let mut p = self.to_pixels(natural_width, natural_height);

        // The minimum can never exceed the image itself.
        let min_w = (min_width as f64).min(nw);
        let min_h = (min_height as f64).min(nh);

        p.width = p.width.max(min_w);
        p.height = p.height.max(min_h);

        if let Some(a) = aspect {
            p.height = p.width / a;
            if p.height < min_h {
                p.height = min_h;
                p.width = p.height * a;
            }
        }

        if p.width > nw {
            p.width = nw;
            if let Some(a) = aspect {
                p.height = p.width / a;
            }
        }
        if p.height > nh {
            p.height = nh;
            if let Some(a) = aspect {
                p.width = p.height * a;
            }
        }

        p.x = p.x.clamp(0.0, nw - p.width);
        p.y = p.y.clamp(0.0, nh - p.height);

        match self.unit {
            CropUnit::Pixel => Self {
                unit: CropUnit::Pixel,
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
            },
            CropUnit::Percent => Self {
                unit: CropUnit::Percent,
                x: p.x / nw * 100.0,
                y: p.y / nh * 100.0,
                width: p.width / nw * 100.0,
                height: p.height / nh * 100.0,
            },
        }
    }
}
