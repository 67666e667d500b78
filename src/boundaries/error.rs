use crate::types::municipality::MunicipalityCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("Failed to read boundary file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse GeoJSON in '{0}'")]
    GeoJsonParse(PathBuf, #[source] Box<geojson::Error>),

    #[error("Boundary file '{0}' is not a FeatureCollection")]
    NotAFeatureCollection(PathBuf),

    #[error("Feature {index} in '{path}' has no usable municipality code")]
    MissingCode { path: PathBuf, index: usize },

    #[error("Municipality {code} in '{path}' has no polygon geometry")]
    InvalidGeometry {
        path: PathBuf,
        code: MunicipalityCode,
    },

    #[error("Municipality {code} not found for year {year}")]
    NotFound { code: MunicipalityCode, year: i32 },

    #[error("Boundary lookup failed: {0}")]
    Lookup(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
