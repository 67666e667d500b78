//! Municipality boundaries read from GeoJSON exports.
//!
//! The directory is expected to hold one `municipalities_<year>.geojson`
//! FeatureCollection per boundary vintage, with a `code_muni` property (number
//! or string) and optionally `name_muni` on every feature, as produced by
//! exporting the IBGE municipality layer.

use crate::boundaries::error::BoundaryError;
use crate::boundaries::source::BoundarySource;
use crate::types::crs::Crs;
use crate::types::municipality::{BoundingBox, Municipality, MunicipalityCode};
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use log::info;
use std::collections::{hash_map::Entry, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// SIRGAS 2000, the datum of IBGE boundary products.
pub const SIRGAS_2000_EPSG: u32 = 4674;

pub struct GeoJsonBoundaries {
    dir: PathBuf,
    crs: Crs,
    loaded: Mutex<HashMap<i32, Arc<Vec<Municipality>>>>,
}

impl GeoJsonBoundaries {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            crs: Crs::epsg(SIRGAS_2000_EPSG),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the CRS the boundary files are stored in.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn file_for_year(&self, year: i32) -> PathBuf {
        self.dir.join(format!("municipalities_{year}.geojson"))
    }

    async fn vintage(&self, year: i32) -> Result<Arc<Vec<Municipality>>, BoundaryError> {
        {
            let loaded = self.loaded.lock().await;
            if let Some(municipalities) = loaded.get(&year) {
                return Ok(Arc::clone(municipalities));
            }
        }

        let path = self.file_for_year(year);
        let crs = self.crs.clone();
        let parsed =
            tokio::task::spawn_blocking(move || read_municipalities(&path, year, crs)).await??;
        info!("Loaded {} municipalities for {}", parsed.len(), year);

        let mut loaded = self.loaded.lock().await;
        match loaded.entry(year) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => Ok(Arc::clone(entry.insert(Arc::new(parsed)))),
        }
    }
}

impl BoundarySource for GeoJsonBoundaries {
    async fn municipality(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Municipality, BoundaryError> {
        self.vintage(year)
            .await?
            .iter()
            .find(|m| m.code == code)
            .cloned()
            .ok_or(BoundaryError::NotFound { code, year })
    }

    async fn municipality_codes(&self, year: i32) -> Result<Vec<MunicipalityCode>, BoundaryError> {
        let mut seen = std::collections::HashSet::new();
        Ok(self
            .vintage(year)
            .await?
            .iter()
            .map(|m| m.code)
            .filter(|code| seen.insert(*code))
            .collect())
    }
}

fn read_municipalities(
    path: &Path,
    year: i32,
    crs: Crs,
) -> Result<Vec<Municipality>, BoundaryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BoundaryError::FileRead(path.to_path_buf(), e))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| BoundaryError::GeoJsonParse(path.to_path_buf(), Box::new(e)))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(BoundaryError::NotAFeatureCollection(path.to_path_buf()));
    };

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let code = feature_code(&feature).ok_or_else(|| BoundaryError::MissingCode {
                path: path.to_path_buf(),
                index,
            })?;
            let name = feature
                .property("name_muni")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let invalid = || BoundaryError::InvalidGeometry {
                path: path.to_path_buf(),
                code,
            };
            let geometry = feature
                .geometry
                .and_then(to_multipolygon)
                .ok_or_else(invalid)?;
            let bbox = BoundingBox::of(&geometry).ok_or_else(invalid)?;
            Ok(Municipality {
                code,
                name,
                year,
                geometry,
                bbox,
                crs: crs.clone(),
            })
        })
        .collect()
}

fn feature_code(feature: &Feature) -> Option<MunicipalityCode> {
    match feature.property("code_muni")? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .map(MunicipalityCode)
}

fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
