//! Loads the catalog items of one municipality and clips them to its footprint.

use crate::raster::clip::clip_to_polygon;
use crate::raster::cube::FloodCube;
use crate::raster::error::RasterError;
use crate::raster::reduce::keep_non_missing;
use crate::raster::source::{ChunkShape, LoadRequest, RasterSource};
use crate::types::crs::Crs;
use crate::types::item::CatalogItem;
use crate::types::municipality::Municipality;
use log::{debug, info};

/// Grid and band settings shared by every load of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSettings {
    pub band: String,
    pub resolution: f64,
    pub chunks: ChunkShape,
    /// Drop time slices that are nodata everywhere after clipping.
    pub drop_empty_slices: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            band: "ensemble_flood_extent".to_string(),
            resolution: 20.0,
            chunks: ChunkShape::default(),
            drop_empty_slices: true,
        }
    }
}

/// The CRS shared by all `items`, taken from the first one.
///
/// # Errors
///
/// [`RasterError::NoItems`] for an empty slice, [`RasterError::MissingCrs`]
/// if an item has no descriptor and [`RasterError::MixedCrs`] if any item
/// disagrees with the first.
pub fn target_crs(items: &[CatalogItem]) -> Result<Crs, RasterError> {
    let first = items.first().ok_or(RasterError::NoItems)?;
    let crs = first.crs.clone().ok_or_else(|| RasterError::MissingCrs {
        item: first.id.clone(),
    })?;
    for item in &items[1..] {
        match &item.crs {
            None => {
                return Err(RasterError::MissingCrs {
                    item: item.id.clone(),
                })
            }
            Some(other) if *other != crs => {
                return Err(RasterError::MixedCrs {
                    item: item.id.clone(),
                    expected: crs.to_string(),
                    found: other.to_string(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(crs)
}

/// Materialises `items` over the municipality's bounding box and clips the
/// result to the municipality polygon reprojected into the raster CRS.
pub async fn load_clipped<R: RasterSource>(
    source: &R,
    items: &[CatalogItem],
    municipality: &Municipality,
    settings: &LoadSettings,
) -> Result<FloodCube, RasterError> {
    let crs = target_crs(items)?;
    let request = LoadRequest {
        bbox: municipality.bbox,
        bbox_crs: municipality.crs.clone(),
        crs: crs.clone(),
        band: settings.band.clone(),
        resolution: settings.resolution,
        chunks: settings.chunks,
    };
    let cube = source.load(items, &request).await?;
    debug!(
        "Loaded {} x {} x {} cube for {}",
        cube.n_times(),
        cube.height(),
        cube.width(),
        municipality.code
    );

    let footprint = if *cube.crs() == municipality.crs {
        municipality.geometry.clone()
    } else {
        source
            .reproject(&municipality.geometry, &municipality.crs, cube.crs())
            .await?
    };
    let clipped = clip_to_polygon(&cube, &footprint)?;

    if !settings.drop_empty_slices {
        return Ok(clipped);
    }
    let before = clipped.n_times();
    let kept = keep_non_missing(clipped);
    if kept.n_times() < before {
        info!(
            "Dropped {} of {} time slices without valid pixels for {}",
            before - kept.n_times(),
            before,
            municipality.code
        );
    }
    Ok(kept)
}
