//! In-memory collaborators shared by the pipeline tests.

use crate::boundaries::error::BoundaryError;
use crate::boundaries::source::BoundarySource;
use crate::catalog::error::CatalogError;
use crate::catalog::query::SearchQuery;
use crate::catalog::search::CatalogSearch;
use crate::raster::cube::{FloodCube, GeoTransform};
use crate::raster::error::RasterError;
use crate::raster::source::{LoadRequest, RasterSource};
use crate::types::crs::Crs;
use crate::types::item::CatalogItem;
use crate::types::municipality::{BoundingBox, Municipality, MunicipalityCode};
use geo::{polygon, MultiPolygon};
use ndarray::Array3;
use std::sync::Mutex;

pub(crate) const RASTER_EPSG: u32 = 27705;

/// A `size` × `size` square municipality with its lower-left corner at (`x0`, 0).
pub(crate) fn square(code: i64, x0: f64, size: f64) -> Municipality {
    let geometry = MultiPolygon::new(vec![polygon![
        (x: x0, y: 0.0),
        (x: x0 + size, y: 0.0),
        (x: x0 + size, y: size),
        (x: x0, y: size),
        (x: x0, y: 0.0),
    ]]);
    Municipality {
        code: MunicipalityCode(code),
        name: Some(format!("Municipio {code}")),
        year: 2020,
        bbox: BoundingBox::of(&geometry).unwrap(),
        geometry,
        crs: Crs::epsg(RASTER_EPSG),
    }
}

#[derive(Default)]
pub(crate) struct FakeBoundaries {
    pub municipalities: Vec<Municipality>,
    pub fail_listing: bool,
}

impl BoundarySource for FakeBoundaries {
    async fn municipality(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Municipality, BoundaryError> {
        self.municipalities
            .iter()
            .find(|m| m.code == code)
            .cloned()
            .ok_or(BoundaryError::NotFound { code, year })
    }

    async fn municipality_codes(&self, _year: i32) -> Result<Vec<MunicipalityCode>, BoundaryError> {
        if self.fail_listing {
            return Err(BoundaryError::Lookup("listing unavailable".to_string()));
        }
        Ok(self.municipalities.iter().map(|m| m.code).collect())
    }
}

/// Returns one item per window, except for the AOIs listed in `empty_aoi`.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub empty_aoi: Vec<BoundingBox>,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl CatalogSearch for FakeCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.empty_aoi.contains(&query.aoi) {
            return Ok(Vec::new());
        }
        let day = query.window.first_day().unwrap();
        Ok(vec![CatalogItem::new(format!(
            "GFM_{}_{}",
            query.aoi.min_x, query.window
        ))
        .with_crs(Crs::epsg(RASTER_EPSG))
        .with_datetime(day.and_hms_opt(0, 0, 0).unwrap().and_utc())])
    }
}

/// Builds a grid over the requested box with the first column flooded in the
/// first slice and every other sample dry.
#[derive(Default)]
pub(crate) struct FakeRaster {
    pub fail_bbox: Vec<BoundingBox>,
    pub loads: Mutex<Vec<LoadRequest>>,
    pub reprojections: Mutex<usize>,
}

impl RasterSource for FakeRaster {
    async fn load(
        &self,
        items: &[CatalogItem],
        request: &LoadRequest,
    ) -> Result<FloodCube, RasterError> {
        self.loads.lock().unwrap().push(request.clone());
        if self.fail_bbox.contains(&request.bbox) {
            return Err(RasterError::Load("asset read timed out".to_string()));
        }
        let cols = (request.bbox.width() / request.resolution).ceil() as usize;
        let rows = (request.bbox.height() / request.resolution).ceil() as usize;
        let data = Array3::from_shape_fn((items.len(), rows, cols), |(t, _, c)| {
            u8::from(t == 0 && c == 0)
        });
        let times = items
            .iter()
            .map(|item| item.datetime.unwrap_or_default())
            .collect();
        FloodCube::new(
            data,
            times,
            GeoTransform::new(
                request.bbox.min_x,
                request.bbox.max_y,
                request.resolution,
                request.resolution,
            )?,
            request.crs.clone(),
        )
    }

    async fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        _from: &Crs,
        _to: &Crs,
    ) -> Result<MultiPolygon<f64>, RasterError> {
        *self.reprojections.lock().unwrap() += 1;
        Ok(geometry.clone())
    }
}
