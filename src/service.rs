//! The two operations as a caller sees them: name a seed, get a result.
//! Datasets are opened from a [`Workspace`] according to the [`Config`] and
//! released when the call returns.

use geo::{Coord, MultiLineString};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::raster::Raster;
use crate::resolve::ResolutionChain;
use crate::trace::{FlowPath, trace_flow_path};
use crate::upstream::{DelineationInputs, FlowArea, Watershed, delineate};
use crate::vector::VectorOps;
use crate::workspace::Workspace;

/// Flow direction is read as `f64` whatever its stored type, so that wide
/// no-data values survive and fractional or out of range codes reach the
/// tracer as invalid codes.
fn open_chain<W: Workspace + ?Sized>(
    workspace: &W,
    high_resolution: &[String],
    fallback: &str,
) -> Result<ResolutionChain<Raster<f64>>> {
    let high = high_resolution
        .iter()
        .map(|name| workspace.open_raster::<f64>(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResolutionChain::new(high, workspace.open_raster::<f64>(fallback)?))
}

/// Traces the flow path from `seed` with the datasets named in
/// `config.flow_path`.
pub fn flow_path<W: Workspace + ?Sized>(workspace: &W, config: &Config, seed: Coord<f64>) -> Result<FlowPath> {
    let settings = &config.flow_path;
    let chain = open_chain(
        workspace,
        &settings.high_resolution_flow_direction,
        &settings.low_resolution_flow_direction,
    )?;
    let path = trace_flow_path(seed, &chain, &settings.trace);
    info!(
        x = seed.x,
        y = seed.y,
        points = path.len(),
        steps = path.steps(),
        length = path.length(),
        termination = ?path.termination(),
        "flow path"
    );
    Ok(path)
}

/// Delineates the upstream area of `seed` with the datasets named in
/// `config.upstream_area`.
pub fn upstream_area<W, V>(workspace: &W, config: &Config, vector: &V, seed: Coord<f64>) -> Result<Watershed>
where
    W: Workspace + ?Sized,
    V: VectorOps + ?Sized,
{
    let settings = &config.upstream_area;
    let accumulation = workspace.open_raster::<f64>(&settings.flow_accumulation)?;
    let chain = open_chain(
        workspace,
        &settings.high_resolution_flow_direction,
        &settings.low_resolution_flow_direction,
    )?;

    let flow_area: Option<(Raster<f64>, MultiLineString<f64>)> = match (&settings.flow_area, &settings.flow_line) {
        (Some(area), Some(line)) => Some((workspace.open_raster::<f64>(area)?, workspace.open_flow_line(line)?)),
        _ => None,
    };

    let inputs = DelineationInputs {
        flow_direction: &chain,
        flow_accumulation: &accumulation,
        accum_threshold: settings.high_res_accum_threshold,
        flow_area: flow_area.as_ref().map(|(raster, flow_line)| FlowArea { raster, flow_line }),
    };
    let watershed = delineate(seed, &inputs, vector)?;
    info!(
        x = seed.x,
        y = seed.y,
        cells = watershed.cell_count(),
        area = watershed.area(),
        perimeter = watershed.perimeter(),
        resolution = ?watershed.resolution,
        "upstream area"
    );
    Ok(watershed)
}
