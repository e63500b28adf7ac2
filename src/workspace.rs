//! Where datasets come from.
//!
//! A [`Workspace`] hands out owned snapshots of named rasters and flow lines.
//! Every operation opens what it needs and drops it when it returns, on the
//! error path as well as the success path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use geo::{Geometry, MultiLineString};
use geojson::GeoJson;

use crate::error::{Error, Result};
use crate::io::read_raster;
use crate::raster::{Raster, RasterValue};

pub trait Workspace {
    /// Opens a raster, converting its cells to `T`. Any failure to acquire
    /// the dataset is reported as [`Error::DataUnavailable`].
    fn open_raster<T: RasterValue>(&self, name: &str) -> Result<Raster<T>>;

    fn open_flow_line(&self, name: &str) -> Result<MultiLineString<f64>>;
}

/// Datasets stored as files in one directory: `<name>.tif` for rasters and
/// `<name>.geojson` for flow lines.
#[derive(Debug, Clone)]
pub struct DirectoryWorkspace {
    root: PathBuf,
}

impl DirectoryWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn raster_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.tif"))
    }

    pub fn flow_line_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.geojson"))
    }
}

impl Workspace for DirectoryWorkspace {
    fn open_raster<T: RasterValue>(&self, name: &str) -> Result<Raster<T>> {
        read_raster(&self.raster_path(name)).map_err(|e| Error::unavailable(name, e))
    }

    fn open_flow_line(&self, name: &str) -> Result<MultiLineString<f64>> {
        read_flow_line(&self.flow_line_path(name)).map_err(|e| Error::unavailable(name, e))
    }
}

/// Reads every line string in a GeoJSON file into one multi line string.
pub fn read_flow_line(path: &Path) -> Result<MultiLineString<f64>> {
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;
    let geometries: Vec<geojson::Geometry> = match geojson {
        GeoJson::Geometry(g) => vec![g],
        GeoJson::Feature(f) => f.geometry.into_iter().collect(),
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().filter_map(|f| f.geometry).collect(),
    };

    let mut lines = Vec::new();
    for g in geometries {
        match Geometry::<f64>::try_from(g)? {
            Geometry::LineString(l) => lines.push(l),
            Geometry::MultiLineString(m) => lines.extend(m.0),
            _ => {}
        }
    }
    if lines.is_empty() {
        return Err(Error::InvalidMetadata(format!("{} holds no line strings", path.display())));
    }
    Ok(MultiLineString::new(lines))
}

/// Datasets held in memory, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspace {
    rasters: HashMap<String, Raster<f64>>,
    flow_lines: HashMap<String, MultiLineString<f64>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raster<T: RasterValue>(&mut self, name: &str, raster: &Raster<T>) -> Result<()> {
        self.rasters.insert(name.to_string(), raster.cast()?);
        Ok(())
    }

    pub fn insert_flow_line(&mut self, name: &str, lines: MultiLineString<f64>) {
        self.flow_lines.insert(name.to_string(), lines);
    }
}

impl Workspace for MemoryWorkspace {
    fn open_raster<T: RasterValue>(&self, name: &str) -> Result<Raster<T>> {
        self.rasters
            .get(name)
            .ok_or_else(|| Error::unavailable(name, "no such raster"))?
            .cast()
            .map_err(|e| Error::unavailable(name, e))
    }

    fn open_flow_line(&self, name: &str) -> Result<MultiLineString<f64>> {
        self.flow_lines
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unavailable(name, "no such flow line"))
    }
}
