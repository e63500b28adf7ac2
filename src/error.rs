//! Error types for flow tracing and delineation

use thiserror::Error;

use crate::raster::PixelCoord;

#[derive(Error, Debug)]
pub enum Error {
    /// The seed lies outside every raster it was checked against.
    #[error("point ({x}, {y}) is outside the raster")]
    OutOfBounds { x: f64, y: f64 },

    /// The seed pixel holds the no-data value on the resolved raster.
    #[error("no flow data at pixel {pixel}")]
    NoFlowData { pixel: PixelCoord },

    #[error("invalid flow direction code {code} at pixel {pixel}")]
    InvalidDirectionCode { code: f64, pixel: PixelCoord },

    #[error("flow path did not terminate within {max_steps} steps")]
    StepLimitExceeded { max_steps: usize },

    #[error("dataset `{name}` unavailable: {reason}")]
    DataUnavailable { name: String, reason: String },

    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn unavailable(name: &str, reason: impl ToString) -> Self {
        Error::DataUnavailable {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
