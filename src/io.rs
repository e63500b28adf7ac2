//! Reading and writing single band GeoTIFFs.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use ndarray::Array2;
use num::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, colortype};
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterAccessor, RasterMetadata, RasterValue, convert_cell};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Grid, no-data value, EPSG code, GDAL style geotransform, GeoKey directory
/// and GeoASCII params of a raster file.
pub type RasterFile<T> = (Array2<T>, Option<T>, Option<u16>, [f64; 6], Vec<u16>, String);

fn cast_cells<S: ToPrimitive + Copy, T: RasterValue>(values: Vec<S>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| {
            convert_cell(v).ok_or_else(|| Error::InvalidMetadata("cell value does not fit the requested type".into()))
        })
        .collect()
}

/// Finds the EPSG code in a GeoKey directory, projected before geographic.
fn epsg_from_geo_keys(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let entries: Vec<&[u16]> = keys[4..].chunks_exact(4).collect();
    [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY].into_iter().find_map(|wanted| {
        entries
            .iter()
            .find(|e| e[0] == wanted && e[1] == 0 && e[3] != 0 && e[3] != 32767)
            .map(|e| e[3])
    })
}

fn geo_keys_for_epsg(epsg: u16) -> Vec<u16> {
    let geographic = (4000..5000).contains(&epsg);
    let (model, key) = if geographic {
        (2, GEOGRAPHIC_TYPE_KEY)
    } else {
        (1, PROJECTED_CS_TYPE_KEY)
    };
    vec![1, 1, 0, 2, GT_MODEL_TYPE_KEY, 0, 1, model, key, 0, 1, epsg]
}

/// Reads the first band of a GeoTIFF into an array of `T`.
///
/// Cells are converted to `T` whatever their stored type, failing if a value
/// does not fit. The geotransform is built from the model tie point and pixel
/// scale tags, `[origin_x, cell_width, 0, origin_y, 0, -cell_height]`.
///
/// # Example
///
/// ```no_run
/// use hydro_trace::rasterfile_to_array;
///
/// let (d8, nodata, epsg, geo, _keys, _proj) = rasterfile_to_array::<u8>("flowdir.tif".as_ref()).unwrap();
/// println!("{}x{} cells, nodata {:?}, epsg {:?}, origin {} {}", d8.ncols(), d8.nrows(), nodata, epsg, geo[0], geo[3]);
/// ```
pub fn rasterfile_to_array<T: RasterValue>(path: &Path) -> Result<RasterFile<T>> {
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .find_tag(tag(MODEL_PIXEL_SCALE))?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| Error::InvalidMetadata(format!("{} has no pixel scale tag", path.display())))?;
    let tiepoint = decoder
        .find_tag(tag(MODEL_TIEPOINT))?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| Error::InvalidMetadata(format!("{} has no tie point tag", path.display())))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::InvalidMetadata(format!("{} has short georeferencing tags", path.display())));
    }
    let geo = [
        tiepoint[3] - tiepoint[0] * scale[0],
        scale[0],
        0.0,
        tiepoint[4] + tiepoint[1] * scale[1],
        0.0,
        -scale[1],
    ];

    let geo_keys: Vec<u16> = match decoder.find_tag(tag(GEO_KEY_DIRECTORY))? {
        Some(v) => v.into_u64_vec()?.into_iter().map(|k| k as u16).collect(),
        None => Vec::new(),
    };
    let proj = match decoder.find_tag(tag(GEO_ASCII_PARAMS))? {
        Some(v) => v.into_string()?,
        None => String::new(),
    };
    let nodata = match decoder.find_tag(tag(GDAL_NODATA))? {
        Some(v) => {
            let text = v.into_string()?;
            let value: f64 = text
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .parse()
                .map_err(|_| Error::InvalidMetadata(format!("unparsable no-data value {text:?}")))?;
            convert_cell::<f64, T>(value)
        }
        None => None,
    };

    let cells: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(v) => cast_cells(v)?,
        DecodingResult::U16(v) => cast_cells(v)?,
        DecodingResult::U32(v) => cast_cells(v)?,
        DecodingResult::U64(v) => cast_cells(v)?,
        DecodingResult::I8(v) => cast_cells(v)?,
        DecodingResult::I16(v) => cast_cells(v)?,
        DecodingResult::I32(v) => cast_cells(v)?,
        DecodingResult::I64(v) => cast_cells(v)?,
        DecodingResult::F32(v) => cast_cells(v)?,
        DecodingResult::F64(v) => cast_cells(v)?,
        #[allow(unreachable_patterns)]
        _ => return Err(Error::InvalidMetadata(format!("{} has an unsupported sample type", path.display()))),
    };
    let data = Array2::from_shape_vec((height as usize, width as usize), cells)
        .map_err(|e| Error::InvalidMetadata(e.to_string()))?;

    Ok((data, nodata, epsg_from_geo_keys(&geo_keys), geo, geo_keys, proj))
}

/// Reads a GeoTIFF as a [`Raster`]. A missing no-data tag leaves NaN as the
/// no-data value, which only ever matches NaN cells.
pub fn read_raster<T: RasterValue>(path: &Path) -> Result<Raster<T>> {
    let (data, nodata, epsg, geo, _, _) = rasterfile_to_array::<T>(path)?;
    let nodata = nodata.and_then(|v| v.to_f64()).unwrap_or(f64::NAN);
    let mut metadata = RasterMetadata::new(data.ncols(), data.nrows(), geo[1], -geo[5], geo[0], geo[3], nodata)?;
    if let Some(epsg) = epsg {
        metadata = metadata.with_spatial_reference(epsg);
    }
    Raster::new(data, metadata)
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    nodata: f64,
    geo: &[f64; 6],
    geo_keys: &[u16],
    proj: &str,
) -> Result<()> {
    dir.write_tag(tag(MODEL_PIXEL_SCALE), &[geo[1], -geo[5], 0.0][..])?;
    dir.write_tag(tag(MODEL_TIEPOINT), &[0.0, 0.0, 0.0, geo[0], geo[3], 0.0][..])?;
    if !geo_keys.is_empty() {
        dir.write_tag(tag(GEO_KEY_DIRECTORY), geo_keys)?;
    }
    if !proj.is_empty() {
        dir.write_tag(tag(GEO_ASCII_PARAMS), proj)?;
    }
    dir.write_tag(tag(GDAL_NODATA), format!("{nodata}").as_str())?;
    Ok(())
}

/// Cell types that can be written to a GeoTIFF.
pub trait TiffCell: RasterValue {
    #[doc(hidden)]
    fn write_image<W: Write + Seek>(
        encoder: &mut TiffEncoder<W>,
        data: &Array2<Self>,
        nodata: f64,
        geo: &[f64; 6],
        geo_keys: &[u16],
        proj: &str,
    ) -> Result<()>;
}

macro_rules! tiff_cell {
    ($($t:ty => $color:ty),* $(,)?) => {$(
        impl TiffCell for $t {
            fn write_image<W: Write + Seek>(
                encoder: &mut TiffEncoder<W>,
                data: &Array2<Self>,
                nodata: f64,
                geo: &[f64; 6],
                geo_keys: &[u16],
                proj: &str,
            ) -> Result<()> {
                let (rows, cols) = data.dim();
                let mut image = encoder.new_image::<$color>(cols as u32, rows as u32)?;
                write_geo_tags(image.encoder(), nodata, geo, geo_keys, proj)?;
                let cells: Vec<$t> = data.iter().copied().collect();
                image.write_data(&cells)?;
                Ok(())
            }
        }
    )*};
}

tiff_cell! {
    u8 => colortype::Gray8,
    u16 => colortype::Gray16,
    u32 => colortype::Gray32,
    i16 => colortype::GrayI16,
    i32 => colortype::GrayI32,
    f32 => colortype::Gray32Float,
    f64 => colortype::Gray64Float,
}

/// Writes `data` as a single band GeoTIFF.
pub fn array_to_rasterfile<T: TiffCell>(
    data: &Array2<T>,
    nodata: T,
    geo: &[f64; 6],
    geo_keys: &[u16],
    proj: &str,
    path: &Path,
) -> Result<()> {
    let nodata = nodata
        .to_f64()
        .ok_or_else(|| Error::InvalidMetadata("no-data value is not numeric".into()))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    T::write_image(&mut encoder, data, nodata, geo, geo_keys, proj)
}

/// Writes a [`Raster`], e.g. an upstream mask from
/// [`UpstreamMask::to_raster`](crate::UpstreamMask::to_raster).
pub fn write_raster<T: TiffCell>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let m = raster.metadata();
    let geo = [m.origin_x, m.cell_width, 0.0, m.origin_y, 0.0, -m.cell_height];
    let geo_keys = m.spatial_reference.map(geo_keys_for_epsg).unwrap_or_default();
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    T::write_image(&mut encoder, raster.data(), m.nodata, &geo, &geo_keys, "")
}
