//! The raster materialisation seam.
//!
//! Turning catalog items into pixels (reading cloud-optimised GeoTIFFs,
//! mosaicking, resampling to the target grid) and reprojecting geometries are
//! delegated to an implementation of [`RasterSource`].

use crate::raster::cube::FloodCube;
use crate::raster::error::RasterError;
use crate::types::crs::Crs;
use crate::types::item::CatalogItem;
use crate::types::municipality::BoundingBox;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Spatial chunking used while loading. The time axis is loaded as one chunk
/// unless `time` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkShape {
    pub x: usize,
    pub y: usize,
    #[serde(default)]
    pub time: Option<usize>,
}

impl Default for ChunkShape {
    fn default() -> Self {
        Self {
            x: 2000,
            y: 2000,
            time: None,
        }
    }
}

/// Everything a [`RasterSource`] needs to materialise one cube.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Extent to load, expressed in `bbox_crs`.
    pub bbox: BoundingBox,
    pub bbox_crs: Crs,
    /// Output grid CRS.
    pub crs: Crs,
    /// Single band to read, stored as `u8`.
    pub band: String,
    /// Cell size in units of `crs`.
    pub resolution: f64,
    pub chunks: ChunkShape,
}

#[allow(async_fn_in_trait)]
pub trait RasterSource {
    /// Loads `items` as one time × y × x cube, one slice per item, covering
    /// `request.bbox` on a `request.resolution` grid in `request.crs`.
    async fn load(
        &self,
        items: &[CatalogItem],
        request: &LoadRequest,
    ) -> Result<FloodCube, RasterError>;

    /// Reprojects `geometry` from `from` to `to`.
    async fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<MultiPolygon<f64>, RasterError>;
}

impl<T: RasterSource> RasterSource for &T {
    async fn load(
        &self,
        items: &[CatalogItem],
        request: &LoadRequest,
    ) -> Result<FloodCube, RasterError> {
        (**self).load(items, request).await
    }

    async fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<MultiPolygon<f64>, RasterError> {
        (**self).reproject(geometry, from, to).await
    }
}
