use anyhow::Result;
use geo::Coord;
use ndarray::{Array2, array};
use hydro_trace::{Raster, ResolutionChain, TraceConfig, trace_flow_path};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    // a 2m grid near the channel head, everything drains south east
    let fine: Raster<u8> = Raster::from_array(Array2::from_elem((4, 4), 2), 0.0, 16.0, 2.0, 2.0, 255)?;
    // an 8m grid over the whole catchment
    let coarse: Array2<u8> = array![
        [2, 4, 4, 4],
        [1, 2, 4, 8],
        [1, 1, 4, 16],
        [1, 1, 4, 16],
    ];
    let coarse = Raster::from_array(coarse, 0.0, 32.0, 8.0, 8.0, 255)?;
    let chain = ResolutionChain::new(vec![fine], coarse);

    let config = TraceConfig { high_res_max_steps: 3, ..TraceConfig::default() };
    let seed = Coord { x: 1.0, y: 15.0 };
    let path = trace_flow_path(seed, &chain, &config);
    println!("Traced {} steps from {:?}, stopped because {:?}", path.steps(), seed, path.termination());
    for p in path.points() {
        println!("  {:.1} {:.1}", p.x, p.y);
    }
    println!("Length {:.2}", path.length());
    path.ensure_complete()?;

    Ok(())
}
