//! Opaque catalog item references returned by a catalog search.

use crate::types::crs::Crs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raster asset attached to a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    pub media_type: Option<String>,
}

/// A single catalog hit: one acquisition with its projection metadata and the
/// raster assets that can be materialised for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub datetime: Option<DateTime<Utc>>,
    pub crs: Option<Crs>,
    pub assets: BTreeMap<String, Asset>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datetime: None,
            crs: None,
            assets: BTreeMap::new(),
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }

    pub fn with_asset(mut self, name: impl Into<String>, href: impl Into<String>) -> Self {
        self.assets.insert(
            name.into(),
            Asset {
                href: href.into(),
                media_type: None,
            },
        );
        self
    }
}
