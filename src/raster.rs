//! In-memory raster snapshots and the grid geometry shared by all of them.

use std::fmt;

use geo::Coord;
use ndarray::Array2;
use num::{NumCast, ToPrimitive};

use crate::error::{Error, Result};

/// Cell types a raster can hold.
pub trait RasterValue: Copy + PartialEq + NumCast + ToPrimitive + Send + Sync + fmt::Debug + 'static {}

impl<T> RasterValue for T where T: Copy + PartialEq + NumCast + ToPrimitive + Send + Sync + fmt::Debug + 'static {}

/// Integer grid indices. Signed so that neighbours of edge cells can be
/// represented and rejected by a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelCoord {
    pub col: isize,
    pub row: isize,
}

impl PixelCoord {
    pub fn new(col: isize, row: isize) -> Self {
        Self { col, row }
    }

    pub fn offset(self, dcol: isize, drow: isize) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }
}

impl fmt::Display for PixelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(col {}, row {})", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// Grid geometry of a north-up raster. The origin is the upper left corner;
/// columns grow with x and rows grow as y decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub nodata: f64,
    /// EPSG code, carried through untouched.
    pub spatial_reference: Option<u16>,
}

impl RasterMetadata {
    pub fn new(
        width: usize,
        height: usize,
        cell_width: f64,
        cell_height: f64,
        origin_x: f64,
        origin_y: f64,
        nodata: f64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidMetadata(format!("empty grid {width}x{height}")));
        }
        if !(cell_width > 0.0 && cell_height > 0.0) {
            return Err(Error::InvalidMetadata(format!(
                "cell size must be positive, got {cell_width} x {cell_height}"
            )));
        }
        Ok(Self {
            width,
            height,
            cell_width,
            cell_height,
            origin_x,
            origin_y,
            nodata,
            spatial_reference: None,
        })
    }

    pub fn with_spatial_reference(mut self, epsg: u16) -> Self {
        self.spatial_reference = Some(epsg);
        self
    }

    pub fn extent(&self) -> Extent {
        Extent {
            xmin: self.origin_x,
            xmax: self.origin_x + self.width as f64 * self.cell_width,
            ymin: self.origin_y - self.height as f64 * self.cell_height,
            ymax: self.origin_y,
        }
    }

    pub fn world_to_pixel(&self, point: Coord<f64>) -> PixelCoord {
        let col = ((point.x - self.origin_x) / self.cell_width).floor();
        let row = ((self.origin_y - point.y) / self.cell_height).floor();
        PixelCoord::new(col as isize, row as isize)
    }

    /// Centre of the cell.
    pub fn pixel_to_world(&self, pixel: PixelCoord) -> Coord<f64> {
        Coord {
            x: self.origin_x + (pixel.col as f64 + 0.5) * self.cell_width,
            y: self.origin_y - (pixel.row as f64 + 0.5) * self.cell_height,
        }
    }

    /// Corner of the cell lattice, `col` in `0..=width` and `row` in `0..=height`.
    pub fn corner_to_world(&self, col: isize, row: isize) -> Coord<f64> {
        Coord {
            x: self.origin_x + col as f64 * self.cell_width,
            y: self.origin_y - row as f64 * self.cell_height,
        }
    }

    pub fn in_bounds(&self, pixel: PixelCoord) -> bool {
        pixel.col >= 0
            && pixel.row >= 0
            && (pixel.col as usize) < self.width
            && (pixel.row as usize) < self.height
    }

    pub fn is_nodata(&self, value: f64) -> bool {
        value == self.nodata || (value.is_nan() && self.nodata.is_nan())
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Result of looking up one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    OutOfBounds,
    NoData,
    Value(f64),
}

impl Sample {
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, Sample::Value(_))
    }
}

/// Random access to a raster's cells plus its grid metadata.
pub trait RasterAccessor {
    fn metadata(&self) -> &RasterMetadata;

    fn cell_value(&self, pixel: PixelCoord) -> Sample;

    fn world_to_pixel(&self, point: Coord<f64>) -> PixelCoord {
        self.metadata().world_to_pixel(point)
    }

    fn pixel_to_world(&self, pixel: PixelCoord) -> Coord<f64> {
        self.metadata().pixel_to_world(pixel)
    }
}

impl<R: RasterAccessor + ?Sized> RasterAccessor for &R {
    fn metadata(&self) -> &RasterMetadata {
        (**self).metadata()
    }

    fn cell_value(&self, pixel: PixelCoord) -> Sample {
        (**self).cell_value(pixel)
    }
}

/// An owned snapshot of one raster band. Dropping it releases the data.
#[derive(Debug, Clone)]
pub struct Raster<T> {
    data: Array2<T>,
    metadata: RasterMetadata,
}

impl<T: RasterValue> Raster<T> {
    /// Wraps `data` (indexed `[[row, col]]`) with its metadata. The array
    /// shape must agree with `metadata.height` x `metadata.width`.
    pub fn new(data: Array2<T>, metadata: RasterMetadata) -> Result<Self> {
        if data.dim() != (metadata.height, metadata.width) {
            return Err(Error::InvalidMetadata(format!(
                "array shape {:?} does not match {}x{} metadata",
                data.dim(),
                metadata.height,
                metadata.width
            )));
        }
        Ok(Self { data, metadata })
    }

    /// Builds a raster from an array and a north-up geotransform.
    pub fn from_array(
        data: Array2<T>,
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        nodata: T,
    ) -> Result<Self> {
        let nodata = nodata
            .to_f64()
            .ok_or_else(|| Error::InvalidMetadata("no-data value is not numeric".into()))?;
        let metadata = RasterMetadata::new(
            data.ncols(),
            data.nrows(),
            cell_width,
            cell_height,
            origin_x,
            origin_y,
            nodata,
        )?;
        Self::new(data, metadata)
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn into_data(self) -> Array2<T> {
        self.data
    }

    pub fn get(&self, pixel: PixelCoord) -> Option<T> {
        if self.metadata.in_bounds(pixel) {
            Some(self.data[[pixel.row as usize, pixel.col as usize]])
        } else {
            None
        }
    }

    /// Converts every cell to another numeric type. Fails if the no-data
    /// value or any cell does not fit, including fractional values going to
    /// an integer type.
    pub fn cast<U: RasterValue>(&self) -> Result<Raster<U>> {
        if convert_cell::<f64, U>(self.metadata.nodata).is_none() && !self.metadata.nodata.is_nan() {
            return Err(Error::InvalidMetadata(format!(
                "no-data value {} does not fit the requested cell type",
                self.metadata.nodata
            )));
        }
        let cells = self
            .data
            .iter()
            .map(|&v| {
                convert_cell(v).ok_or_else(|| {
                    Error::InvalidMetadata(format!("cell value {v:?} does not fit the requested cell type"))
                })
            })
            .collect::<Result<Vec<U>>>()?;
        let data = Array2::from_shape_vec(self.data.raw_dim(), cells)
            .map_err(|e| Error::InvalidMetadata(e.to_string()))?;
        Raster::new(data, self.metadata.clone())
    }
}

impl<T: RasterValue> RasterAccessor for Raster<T> {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn cell_value(&self, pixel: PixelCoord) -> Sample {
        match self.get(pixel).and_then(|v| v.to_f64()) {
            None if !self.metadata.in_bounds(pixel) => Sample::OutOfBounds,
            None => Sample::NoData,
            Some(v) if self.metadata.is_nodata(v) => Sample::NoData,
            Some(v) => Sample::Value(v),
        }
    }
}

/// Converts one cell value, refusing values out of range for `T` and
/// fractional values that would be truncated to an integer.
pub(crate) fn convert_cell<S: ToPrimitive + Copy, T: RasterValue>(value: S) -> Option<T> {
    let converted = <T as NumCast>::from(value)?;
    match (value.to_f64(), converted.to_f64()) {
        (Some(from), Some(to)) if from.fract() != 0.0 && to.fract() == 0.0 => None,
        _ => Some(converted),
    }
}

/// The cell value under a world point.
pub fn sample_at<R: RasterAccessor + ?Sized>(raster: &R, point: Coord<f64>) -> Sample {
    raster.cell_value(raster.metadata().world_to_pixel(point))
}
