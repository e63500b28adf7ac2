use anyhow::Result;
use tempfile::NamedTempFile;
use std::path::PathBuf;
use ndarray::{Array2, array};
use hydro_trace::{Raster, RasterAccessor, array_to_rasterfile, rasterfile_to_array, read_raster};

fn main() -> Result<()> {
    let d8: Array2<u8> = array![
        [1, 2, 4, 8],
        [16, 32, 64, 128],
        [1, 1, 4, 255],
    ];
    let nd: u8 = 255;
    let crs: u16 = 2193;
    let geo: [f64;6] = [1361171.0, 8.0, 0.0, 5006315.0, 0.0, -8.0];
    let gdir  = [1u16, 1, 0, 7, 1024, 0, 1, 1, 1025, 0, 1, 1, 1026, 34737, 48, 0, 2049, 34737, 9, 48, 2054, 0, 1, 9102, 3072, 0, 1, 2193, 3076, 0, 1, 9001];
    let proj: &str = "NZGD2000 / New Zealand Transverse Mercator 2000|NZGD2000|";
    let tmp = NamedTempFile::new()?;
    let ofn: PathBuf = tmp.path().to_path_buf();
    println!("Writing array to {:?}", ofn);
    array_to_rasterfile::<u8>(&d8, nd, &geo, &gdir, proj, &ofn)?;

    // read file back in
    println!("Reading {:?} into new array and checking got same values", ofn);
    let (d8_new, nd_new, crs_new, geo_new, gdir_new, proj_new) = rasterfile_to_array::<u8>(&ofn)?;

    assert_eq!(d8_new, d8);
    assert_eq!(nd_new, Some(nd));
    assert_eq!(crs_new, Some(crs));
    assert_eq!(geo_new, geo);
    assert_eq!(gdir_new, gdir);
    assert_eq!(proj_new, proj);

    // or straight into a raster, widening the cells
    let raster: Raster<f64> = read_raster(&ofn)?;
    let m = raster.metadata();
    println!("{}x{} cells of {}m, origin {} {}, epsg {:?}", m.width, m.height, m.cell_width, m.origin_x, m.origin_y, m.spatial_reference);

    tmp.close()?;
    Ok(())
}
