use anyhow::Result;
use geo::Coord;
use ndarray::{Array2, array};
use hydro_trace::{
    Config, GeoVectorOps, MemoryWorkspace, Raster, upstream_area, write_raster,
};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let d8: Array2<u8> = array![
        [2, 4, 4, 4, 8],
        [1, 2, 4, 8, 16],
        [1, 1, 4, 16, 16],
        [64, 1, 4, 16, 255],
    ];
    let accum: Array2<f64> = array![
        [1.0, 1.0, 1.0, 1.0, 1.0],
        [1.0, 3.0, 4.0, 3.0, 1.0],
        [1.0, 3.0, 12.0, 3.0, 1.0],
        [1.0, 1.0, 18.0, 1.0, -1.0],
    ];
    let mut workspace = MemoryWorkspace::new();
    workspace.insert_raster("flow_direction", &Raster::from_array(d8, 1361171.0, 5006347.0, 8.0, 8.0, 255)?)?;
    workspace.insert_raster("flow_accumulation", &Raster::from_array(accum, 1361171.0, 5006347.0, 8.0, 8.0, -1.0)?)?;

    let config = Config::default();
    let outlet = Coord { x: 1361191.0, y: 5006319.0 };
    let ws = upstream_area(&workspace, &config, &GeoVectorOps, outlet)?;
    println!(
        "{} cells drain to {:?}, area {} m2, perimeter {} m, {} polygon(s)",
        ws.cell_count(),
        outlet,
        ws.area(),
        ws.perimeter(),
        ws.polygons.0.len()
    );
    println!("{}", ws.mask.data());

    let tmp = NamedTempFile::new()?;
    println!("Writing mask to {:?}", tmp.path());
    write_raster(&ws.mask.to_raster()?, tmp.path())?;
    tmp.close()?;

    Ok(())
}
