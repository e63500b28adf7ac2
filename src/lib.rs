//! # Hydro-trace
//!
//! `hydro-trace` follows water over D8 flow direction rasters. It does two things:
//!
//! - traces the flow path downstream from a point, optionally starting on a
//!   high resolution grid and carrying on over a coarse one;
//! - delineates the upstream area draining to a pour point and outlines it
//!   as polygons.
//!
//! Flow direction uses the usual D8 codes, 1 = East going clockwise to 128 =
//! North East. Rasters are plain in-memory snapshots ([`Raster`]) that can be
//! read from GeoTIFFs or built from an `ndarray::Array2`.
//!
//! ## Example
//!
//! ```
//! use geo::Coord;
//! use ndarray::array;
//! use hydro_trace::{upstream_mask, trace_path, PixelCoord, Raster, Termination};
//!
//! // everything drains towards the top left cell, which drains off the grid
//! let d8 = Raster::from_array(
//!     array![
//!         [16u8, 16, 16],
//!         [64,   32, 32],
//!         [64,   32, 32],
//!     ],
//!     0.0, 3.0, 1.0, 1.0, 255,
//! ).expect("Failed to create raster");
//!
//! let path = trace_path(Coord { x: 2.5, y: 0.5 }, &d8, 100);
//! assert_eq!(path.termination(), Termination::ExitedGrid);
//!
//! let mask = upstream_mask(&d8, &[PixelCoord::new(0, 0)]);
//! assert_eq!(mask.count(), 9);
//! ```

pub mod config;
pub mod direction;
pub mod error;
pub mod io;
pub mod raster;
pub mod resolve;
pub mod service;
pub mod trace;
pub mod upstream;
pub mod vector;
pub mod workspace;

pub use config::{Config, FlowPathConfig, TraceConfig, UpstreamAreaConfig};
pub use direction::FlowDirection;
pub use error::{Error, Result};
pub use io::{array_to_rasterfile, rasterfile_to_array, read_raster, write_raster};
pub use raster::{Extent, PixelCoord, Raster, RasterAccessor, RasterMetadata, RasterValue, Sample, sample_at};
pub use resolve::{Resolution, ResolutionChain, Resolved, resolve};
pub use service::{flow_path, upstream_area};
pub use trace::{FlowPath, Termination, trace_flow_path, trace_network, trace_path, trace_paths};
pub use upstream::{DelineationInputs, FlowArea, UpstreamMask, VisitedSet, Watershed, delineate, upstream_mask};
pub use vector::{GeoVectorOps, VectorOps, mask_to_polygons};
pub use workspace::{DirectoryWorkspace, MemoryWorkspace, Workspace, read_flow_line};
