//! Builds the spatial/temporal filter sent to the catalog.

use crate::types::calendar::QueryWindow;
use crate::types::municipality::BoundingBox;
use geojson::{Geometry, JsonObject, Value};
use serde_json::json;

/// Closed-ring polygon covering `bbox`.
///
/// The ring has five positions, winding top-left, top-right, bottom-right,
/// bottom-left and back to top-left. A degenerate box still yields a ring; the
/// catalog simply finds nothing for it.
pub fn aoi_polygon(bbox: &BoundingBox) -> Geometry {
    let BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
    } = *bbox;
    Geometry::new(Value::Polygon(vec![vec![
        vec![min_x, max_y],
        vec![max_x, max_y],
        vec![max_x, min_y],
        vec![min_x, min_y],
        vec![min_x, max_y],
    ]]))
}

/// A single catalog search: one collection, one AOI, one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub collection: String,
    pub aoi: BoundingBox,
    pub window: QueryWindow,
}

impl SearchQuery {
    pub fn new(collection: impl Into<String>, aoi: BoundingBox, window: QueryWindow) -> Self {
        Self {
            collection: collection.into(),
            aoi,
            window,
        }
    }

    pub fn intersects(&self) -> Geometry {
        aoi_polygon(&self.aoi)
    }

    pub fn datetime(&self) -> String {
        self.window.date_range()
    }

    /// The JSON body of a STAC `POST /search` request.
    pub fn to_search_body(&self, limit: usize) -> serde_json::Value {
        let intersects = serde_json::Value::Object(JsonObject::from(&self.intersects()));
        json!({
            "collections": [self.collection],
            "intersects": intersects,
            "datetime": self.datetime(),
            "limit": limit,
        })
    }

    /// File-name-safe key identifying this query in the window cache.
    pub(crate) fn cache_key(&self) -> String {
        let collection: String = self
            .collection
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{:.6}_{:.6}_{:.6}_{:.6}",
            collection,
            self.window.month(),
            self.aoi.min_x,
            self.aoi.min_y,
            self.aoi.max_x,
            self.aoi.max_y
        )
    }
}
