use crate::boundaries::error::BoundaryError;
use crate::catalog::error::CatalogError;
use crate::config::ConfigError;
use crate::output::OutputError;
use crate::raster::error::RasterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloodError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
