//! Following a single flow path downstream, cell by cell.

use std::collections::HashMap;

use geo::{Coord, Euclidean, Length, LineString};
use rayon::prelude::*;
use tracing::debug;

use crate::config::TraceConfig;
use crate::direction::FlowDirection;
use crate::error::{Error, Result};
use crate::raster::{PixelCoord, RasterAccessor, Sample, sample_at};
use crate::resolve::{Resolution, ResolutionChain};

/// Why a trace stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Walked off the edge of the raster.
    ExitedGrid,
    /// Reached a no-data cell.
    NoData,
    /// Reached a cell holding something other than one of the eight D8 codes.
    InvalidDirectionCode { code: f64, pixel: PixelCoord },
    /// Used up the step budget, the path is truncated.
    StepLimit { max_steps: usize },
    /// Ran into a segment whose path was already computed and took it over.
    JoinedSegment { id: i64 },
}

/// A traced flow path.
///
/// The first point is the seed and the last point is where the trace stopped.
/// In between only the points where the direction of travel changed are
/// kept, so straight runs collapse to their end points.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPath {
    points: Vec<Coord<f64>>,
    termination: Termination,
    steps: usize,
}

impl FlowPath {
    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    pub fn seed(&self) -> Coord<f64> {
        self.points[0]
    }

    pub fn terminus(&self) -> Coord<f64> {
        self.points[self.points.len() - 1]
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Number of cells moved, summed over all segments.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(self.points.clone())
    }

    /// Total length in world units.
    pub fn length(&self) -> f64 {
        self.to_line_string().length::<Euclidean>()
    }

    /// Errors if the trace ended on bad data or ran out of steps.
    pub fn ensure_complete(&self) -> Result<()> {
        match self.termination {
            Termination::InvalidDirectionCode { code, pixel } => {
                Err(Error::InvalidDirectionCode { code, pixel })
            }
            Termination::StepLimit { max_steps } => Err(Error::StepLimitExceeded { max_steps }),
            _ => Ok(()),
        }
    }

    /// Appends a path that starts where this one ends. The shared junction
    /// point is only kept once.
    fn extend(&mut self, other: &FlowPath) {
        let skip = usize::from(other.points.first() == self.points.last());
        self.points.extend_from_slice(&other.points[skip..]);
        self.steps += other.steps;
    }
}

fn push_vertex(points: &mut Vec<Coord<f64>>, point: Coord<f64>) {
    if points.last() != Some(&point) {
        points.push(point);
    }
}

/// The walk shared by every tracing entry point. `junction` is asked at every
/// visited point whether the walk should stop and hand over to another path.
fn walk<R, J>(seed: Coord<f64>, raster: &R, max_steps: usize, mut junction: J) -> FlowPath
where
    R: RasterAccessor + ?Sized,
    J: FnMut(Coord<f64>) -> Option<i64>,
{
    let meta = raster.metadata();
    let mut points = vec![seed];
    let mut point = seed;
    let mut last_displacement: Option<(f64, f64)> = None;
    let mut steps = 0;

    let termination = loop {
        if let Some(id) = junction(point) {
            break Termination::JoinedSegment { id };
        }
        let pixel = meta.world_to_pixel(point);
        let value = match raster.cell_value(pixel) {
            Sample::OutOfBounds => break Termination::ExitedGrid,
            Sample::NoData => break Termination::NoData,
            Sample::Value(v) => v,
        };
        let Some(direction) = FlowDirection::from_value(value) else {
            break Termination::InvalidDirectionCode { code: value, pixel };
        };
        let (dx, dy) = direction.displacement(meta.cell_width, meta.cell_height);
        if last_displacement != Some((dx, dy)) {
            push_vertex(&mut points, point);
            last_displacement = Some((dx, dy));
        }
        if steps >= max_steps {
            break Termination::StepLimit { max_steps };
        }
        point.x += dx;
        point.y += dy;
        steps += 1;
    };
    points.push(point);

    debug!(?termination, steps, points = points.len(), "flow path traced");
    FlowPath { points, termination, steps }
}

/// Traces the flow path from `seed` over a single flow direction raster.
///
/// The walk stops on leaving the raster, on a no-data cell, on a cell that
/// does not hold a valid D8 code, or after `max_steps` moves. The step limit
/// is what stops cyclic flow direction data from looping forever.
///
/// # Parameters
///
/// - `seed`: start point in world coordinates.
/// - `raster`: the D8 flow direction raster.
/// - `max_steps`: the most cells the walk may move.
///
/// # Example
///
/// ```
/// use geo::Coord;
/// use ndarray::array;
/// use hydro_trace::{trace_path, Raster, Termination};
///
/// // every cell drains east
/// let d8 = Raster::from_array(array![[1u8, 1, 1], [1, 1, 1]], 0.0, 2.0, 1.0, 1.0, 255).unwrap();
/// let path = trace_path(Coord { x: 0.5, y: 1.5 }, &d8, 1000);
/// assert_eq!(path.termination(), Termination::ExitedGrid);
/// assert_eq!(path.terminus(), Coord { x: 3.5, y: 1.5 });
/// ```
pub fn trace_path<R: RasterAccessor + ?Sized>(seed: Coord<f64>, raster: &R, max_steps: usize) -> FlowPath {
    walk(seed, raster, max_steps, |_| None)
}

/// Traces across a resolution chain.
///
/// When a high resolution raster has data under the seed a short segment is
/// traced on it first (`high_res_max_steps`), then tracing carries on from
/// that segment's end over the fallback raster (`low_res_max_steps`) and the
/// two segments are joined.
pub fn trace_flow_path<R: RasterAccessor>(
    seed: Coord<f64>,
    chain: &ResolutionChain<R>,
    config: &TraceConfig,
) -> FlowPath {
    let resolved = chain.resolve(seed);
    match resolved.resolution {
        Resolution::High(index) => {
            let mut path = trace_path(seed, resolved.raster, config.high_res_max_steps);
            debug!(index, end = ?path.terminus(), "high resolution segment done");
            let rest = trace_path(path.terminus(), &chain.fallback, config.low_res_max_steps);
            path.extend(&rest);
            path.termination = rest.termination;
            path
        }
        Resolution::Fallback => trace_path(seed, &chain.fallback, config.low_res_max_steps),
    }
}

/// Traces many independent seeds in parallel. Results are in seed order.
pub fn trace_paths<R: RasterAccessor + Sync>(
    seeds: &[Coord<f64>],
    chain: &ResolutionChain<R>,
    config: &TraceConfig,
) -> Vec<FlowPath> {
    seeds
        .par_iter()
        .map(|&seed| trace_flow_path(seed, chain, config))
        .collect()
}

/// Traces a stream network, reusing paths that were already computed.
///
/// `outlets` are `(segment id, point)` pairs, normally ordered by decreasing
/// flow so that downstream segments are traced first. While walking, a cell
/// whose id in `segment_ids` already has a path ends the walk and that path
/// is appended in place of the junction point. Every finished path is stored
/// under its outlet's id.
pub fn trace_network<R, S>(
    outlets: &[(i64, Coord<f64>)],
    flow_dir: &R,
    segment_ids: &S,
    max_steps: usize,
) -> Vec<(i64, FlowPath)>
where
    R: RasterAccessor + ?Sized,
    S: RasterAccessor + ?Sized,
{
    let mut computed: HashMap<i64, FlowPath> = HashMap::with_capacity(outlets.len());
    let mut paths = Vec::with_capacity(outlets.len());

    for &(id, seed) in outlets {
        let mut path = walk(seed, flow_dir, max_steps, |point| {
            let segment = sample_at(segment_ids, point).value()? as i64;
            computed.contains_key(&segment).then_some(segment)
        });
        if let Termination::JoinedSegment { id: segment } = path.termination {
            if let Some(existing) = computed.get(&segment) {
                // the junction cell is covered by the joined path
                path.points.pop();
                path.extend(existing);
            }
        }
        computed.insert(id, path.clone());
        paths.push((id, path));
    }
    paths
}
