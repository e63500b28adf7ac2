//! Picking which of several flow direction rasters governs a point.
//!
//! Flow networks are often modelled twice: precise local grids near the
//! channels and one coarse grid covering the whole watershed. A point may fall
//! outside every local grid, or on a local grid's no-data margin, in which
//! case the coarse grid is used.

use geo::Coord;
use tracing::debug;

use crate::raster::{PixelCoord, RasterAccessor};

/// An ordered list of high resolution rasters plus the low resolution fallback.
#[derive(Debug, Clone)]
pub struct ResolutionChain<R> {
    pub high_resolution: Vec<R>,
    pub fallback: R,
}

impl<R: RasterAccessor> ResolutionChain<R> {
    pub fn new(high_resolution: Vec<R>, fallback: R) -> Self {
        Self { high_resolution, fallback }
    }

    /// A chain that only has the fallback raster.
    pub fn single(fallback: R) -> Self {
        Self::new(Vec::new(), fallback)
    }

    pub fn resolve(&self, point: Coord<f64>) -> Resolved<'_, R> {
        resolve(point, &self.high_resolution, &self.fallback)
    }

    pub fn fallback(&self, point: Coord<f64>) -> Resolved<'_, R> {
        Resolved {
            raster: &self.fallback,
            pixel: self.fallback.world_to_pixel(point),
            resolution: Resolution::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Index into the high resolution candidates.
    High(usize),
    Fallback,
}

#[derive(Debug)]
pub struct Resolved<'a, R> {
    pub raster: &'a R,
    pub pixel: PixelCoord,
    pub resolution: Resolution,
}

impl<R> Clone for Resolved<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Resolved<'_, R> {}

/// Returns the first candidate whose pixel under `point` is in bounds and
/// holds data, otherwise `fallback` without any check on the fallback pixel.
pub fn resolve<'a, R: RasterAccessor>(
    point: Coord<f64>,
    candidates: &'a [R],
    fallback: &'a R,
) -> Resolved<'a, R> {
    for (index, raster) in candidates.iter().enumerate() {
        let pixel = raster.world_to_pixel(point);
        if raster.cell_value(pixel).is_value() {
            debug!(index, col = pixel.col, row = pixel.row, "resolved to high resolution raster");
            return Resolved {
                raster,
                pixel,
                resolution: Resolution::High(index),
            };
        }
    }
    let pixel = fallback.world_to_pixel(point);
    debug!(col = pixel.col, row = pixel.row, "resolved to fallback raster");
    Resolved {
        raster: fallback,
        pixel,
        resolution: Resolution::Fallback,
    }
}
