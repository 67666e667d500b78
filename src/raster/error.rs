use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Catalog item '{item}' carries no CRS descriptor")]
    MissingCrs { item: String },

    #[error("Catalog item '{item}' is in CRS '{found}', expected '{expected}'")]
    MixedCrs {
        item: String,
        expected: String,
        found: String,
    },

    #[error("No catalog items to load")]
    NoItems,

    #[error("Raster has {slices} time slices but {times} timestamps")]
    ShapeMismatch { slices: usize, times: usize },

    #[error("Invalid geotransform: pixel size {pixel_width} x {pixel_height}")]
    InvalidTransform { pixel_width: f64, pixel_height: f64 },

    #[error("Clip geometry is empty")]
    EmptyGeometry,

    #[error("Clip geometry does not overlap the raster extent")]
    NoOverlap,

    #[error("Raster loading failed: {0}")]
    Load(String),

    #[error("Geometry reprojection failed: {0}")]
    Reproject(String),

    #[error("Raster of {rows} x {cols} cells is too large for a TIFF strip layout")]
    TooLarge { rows: usize, cols: usize },

    #[error("CRS citation of {len} bytes does not fit a GeoTIFF key")]
    CitationTooLong { len: usize },

    #[error("Failed to encode GeoTIFF")]
    GeoTiffEncode(#[source] tiff::TiffError),

    #[error("Failed to write raster file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to replace raster file '{0}'")]
    FilePersist(PathBuf, #[source] Box<tempfile::PersistError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
