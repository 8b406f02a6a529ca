//! Crop domain — the region model and the rasterizer.

mod raster;
mod region;

pub use raster::{rasterize, RasterError, RasterizedCrop};
pub use region::{CropRegion, CropUnit, PixelCrop};
