//! Delineating the area that drains to a pour point.

use std::collections::VecDeque;

use geo::{Area, Coord, Euclidean, Length, LineString, MultiLineString, MultiPolygon};
use ndarray::Array2;
use tracing::{debug, warn};

use crate::direction::FlowDirection;
use crate::error::{Error, Result};
use crate::raster::{PixelCoord, Raster, RasterAccessor, RasterMetadata, Sample, sample_at};
use crate::resolve::{Resolution, ResolutionChain};
use crate::vector::VectorOps;

/// Pixels already queued by a flood fill.
#[derive(Debug, Clone)]
pub struct VisitedSet {
    cells: Array2<bool>,
    len: usize,
}

impl VisitedSet {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: Array2::from_elem((height, width), false),
            len: 0,
        }
    }

    /// Marks `pixel`, returning false if it was already marked or is off the grid.
    pub fn insert(&mut self, pixel: PixelCoord) -> bool {
        if pixel.col < 0 || pixel.row < 0 {
            return false;
        }
        match self.cells.get_mut((pixel.row as usize, pixel.col as usize)) {
            Some(seen) if !*seen => {
                *seen = true;
                self.len += 1;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, pixel: PixelCoord) -> bool {
        pixel.col >= 0
            && pixel.row >= 0
            && self.cells.get((pixel.row as usize, pixel.col as usize)).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A 0/1 grid with the footprint of the flow direction raster it was filled
/// on; 1 marks a pixel that drains to the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamMask {
    data: Array2<u8>,
    metadata: RasterMetadata,
    visited: usize,
}

impl UpstreamMask {
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    pub fn is_set(&self, pixel: PixelCoord) -> bool {
        self.metadata.in_bounds(pixel) && self.data[[pixel.row as usize, pixel.col as usize]] == 1
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v == 1).count()
    }

    /// Size of the fill's visited set when it finished.
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// A u8 raster of the mask with 0 as no-data, ready to be written out.
    pub fn to_raster(&self) -> Result<Raster<u8>> {
        let mut metadata = self.metadata.clone();
        metadata.nodata = 0.0;
        Raster::new(self.data.clone(), metadata)
    }
}

/// Breadth first flood fill from `seeds` over a D8 raster.
///
/// A neighbour joins the fill when its own code points back at the pixel it
/// was reached from, i.e. it holds the inverse of the direction used to step
/// to it. Seeds off the grid are ignored. Every pixel is queued at most once,
/// so the fill does at most eight neighbour tests per raster cell.
pub fn upstream_mask<R: RasterAccessor + ?Sized>(raster: &R, seeds: &[PixelCoord]) -> UpstreamMask {
    let metadata = raster.metadata().clone();
    let mut data = Array2::<u8>::zeros((metadata.height, metadata.width));
    let mut visited = VisitedSet::new(metadata.width, metadata.height);
    let mut queue = VecDeque::new();

    for &seed in seeds {
        if visited.insert(seed) {
            queue.push_back(seed);
        }
    }

    while let Some(pixel) = queue.pop_front() {
        data[[pixel.row as usize, pixel.col as usize]] = 1;
        for direction in FlowDirection::ALL {
            let (dcol, drow) = direction.offset();
            let neighbour = pixel.offset(dcol, drow);
            if visited.contains(neighbour) {
                continue;
            }
            let drains_here = match raster.cell_value(neighbour) {
                Sample::Value(v) => FlowDirection::from_value(v) == Some(direction.inverse()),
                _ => false,
            };
            if drains_here && visited.insert(neighbour) {
                queue.push_back(neighbour);
            }
        }
    }

    debug!(cells = visited.len(), "upstream flood fill done");
    UpstreamMask {
        data,
        metadata,
        visited: visited.len(),
    }
}

/// A flow area raster marks where channels are better represented by a
/// reference flow line (large water bodies). Seeds inside it are also snapped
/// to that line.
#[derive(Clone, Copy)]
pub struct FlowArea<'a> {
    pub raster: &'a dyn RasterAccessor,
    pub flow_line: &'a MultiLineString<f64>,
}

/// Everything [`delineate`] reads.
pub struct DelineationInputs<'a, R> {
    pub flow_direction: &'a ResolutionChain<R>,
    pub flow_accumulation: &'a dyn RasterAccessor,
    /// High resolution flow direction is only tried at or below this accumulation.
    pub accum_threshold: f64,
    pub flow_area: Option<FlowArea<'a>>,
}

/// The upstream area of a pour point.
#[derive(Debug, Clone)]
pub struct Watershed {
    pub mask: UpstreamMask,
    pub polygons: MultiPolygon<f64>,
    /// Pixels the fill started from: the pour point, then the snapped point if any.
    pub seeds: Vec<PixelCoord>,
    pub snapped: Option<Coord<f64>>,
    pub resolution: Resolution,
}

impl Watershed {
    pub fn area(&self) -> f64 {
        self.polygons.unsigned_area()
    }

    /// Summed length of all exterior and interior rings.
    pub fn perimeter(&self) -> f64 {
        self.rings().map(|r| r.length::<Euclidean>()).sum()
    }

    pub fn rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        self.polygons
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
    }

    pub fn cell_count(&self) -> usize {
        self.mask.count()
    }
}

/// Delineates everything upstream of `seed`.
///
/// 1. The accumulation under the seed decides whether high resolution flow
///    direction is tried at all: only headwater locations, at or below
///    `accum_threshold`, use it. Otherwise, or when accumulation is missing
///    there, the fallback raster is used.
/// 2. If the seed falls inside the flow area it is snapped to the nearest
///    point of the flow line and the fill starts from both pixels.
/// 3. The pixels draining to the seed(s) are flood filled into a mask and
///    the mask is turned into polygons by `vector`.
///
/// # Errors
///
/// [`Error::OutOfBounds`] when the seed is off the chosen raster and
/// [`Error::NoFlowData`] when it sits on a no-data cell.
pub fn delineate<R, V>(seed: Coord<f64>, inputs: &DelineationInputs<'_, R>, vector: &V) -> Result<Watershed>
where
    R: RasterAccessor,
    V: VectorOps + ?Sized,
{
    let chain = inputs.flow_direction;
    let resolved = match sample_at(inputs.flow_accumulation, seed) {
        Sample::Value(accum) if accum <= inputs.accum_threshold => chain.resolve(seed),
        Sample::Value(_) => chain.fallback(seed),
        other => {
            warn!(?other, x = seed.x, y = seed.y, "no flow accumulation at seed, using fallback raster");
            chain.fallback(seed)
        }
    };
    let raster = resolved.raster;
    let pixel = resolved.pixel;
    match raster.cell_value(pixel) {
        Sample::OutOfBounds => return Err(Error::OutOfBounds { x: seed.x, y: seed.y }),
        Sample::NoData => return Err(Error::NoFlowData { pixel }),
        Sample::Value(_) => {}
    }

    let mut seeds = vec![pixel];
    let mut snapped = None;
    if let Some(area) = inputs.flow_area {
        if sample_at(area.raster, seed).is_value() {
            if let Some(point) = vector.nearest_point_on_line(area.flow_line, seed) {
                let snapped_pixel = raster.world_to_pixel(point);
                debug!(?pixel, ?snapped_pixel, "seed snapped to flow line");
                if snapped_pixel != pixel && raster.metadata().in_bounds(snapped_pixel) {
                    seeds.push(snapped_pixel);
                }
                snapped = Some(point);
            }
        }
    }

    let mask = upstream_mask(raster, &seeds);
    let polygons = vector.polygonize(&mask)?;
    Ok(Watershed {
        mask,
        polygons,
        seeds,
        snapped,
        resolution: resolved.resolution,
    })
}
