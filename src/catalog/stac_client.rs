//! A thin STAC API search client.
//!
//! Only `POST /search` with `collections`, `intersects`, `datetime` and `limit`
//! is used, plus `rel="next"` pagination. Responses are mapped to
//! [`CatalogItem`]s carrying the `proj:wkt2` (or `proj:epsg`) descriptor.

use crate::catalog::error::CatalogError;
use crate::catalog::query::SearchQuery;
use crate::catalog::retry::{send_with_retry, RetryPolicy};
use crate::catalog::search::CatalogSearch;
use crate::types::crs::Crs;
use crate::types::item::{Asset, CatalogItem};
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const EODC_STAC_URL: &str = "https://stac.eodc.eu/api/v1";
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_MAX_PAGES: usize = 50;

pub struct StacCatalog {
    base_url: String,
    client: Client,
    page_size: usize,
    max_pages: usize,
    retry: RetryPolicy,
}

impl StacCatalog {
    /// Opens a client for the STAC API rooted at `base_url`
    /// (e.g. [`EODC_STAC_URL`]). No request is made until the first search.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            retry: RetryPolicy::default(),
        }
    }

    pub fn eodc() -> Self {
        Self::new(EODC_STAC_URL)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum items per result page requested from the server.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Upper bound on followed `next` links for one window.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        let url = request.url().to_string();
        let response = send_with_retry(&self.retry, &url, || match request {
            PageRequest::Get(url) => self.client.get(url),
            PageRequest::Post { url, body } => self.client.post(url).json(body),
        })
        .await?;
        let text = response
            .text()
            .await
            .map_err(|e| CatalogError::NetworkRequest(url.clone(), e))?;
        parse_page(&text).map_err(|e| CatalogError::ResponseParse(url, e))
    }
}

impl CatalogSearch for StacCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut request = PageRequest::Post {
            url: format!("{}/search", self.base_url),
            body: query.to_search_body(self.page_size),
        };
        let mut items = Vec::new();

        for page_number in 1..=self.max_pages {
            let page = self.fetch_page(&request).await?;
            debug!(
                "Page {} for {} returned {} features",
                page_number,
                query.window,
                page.features.len()
            );
            let next = page.next_request(&request);
            items.extend(page.features.into_iter().map(CatalogItem::from));
            match next {
                Some(next) => request = next,
                None => {
                    debug!("Search for {} returned {} items", query.window, items.len());
                    return Ok(items);
                }
            }
        }

        Err(CatalogError::TooManyPages {
            window: query.window.to_string(),
            max_pages: self.max_pages,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PageRequest {
    Get(String),
    Post {
        url: String,
        body: serde_json::Value,
    },
}

impl PageRequest {
    fn url(&self) -> &str {
        match self {
            PageRequest::Get(url) => url,
            PageRequest::Post { url, .. } => url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemCollection {
    #[serde(default)]
    features: Vec<StacFeature>,
    #[serde(default)]
    links: Vec<StacLink>,
}

impl ItemCollection {
    /// Builds the request for the `next` link, if the server sent one.
    fn next_request(&self, previous: &PageRequest) -> Option<PageRequest> {
        let link = self.links.iter().find(|l| l.rel == "next")?;
        let is_post = link
            .method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("POST"));
        if !is_post {
            return Some(PageRequest::Get(link.href.clone()));
        }
        let body = match (&link.body, previous) {
            (Some(serde_json::Value::Object(next)), PageRequest::Post { body, .. }) if link.merge => {
                let mut merged = body.clone();
                if let serde_json::Value::Object(fields) = &mut merged {
                    for (key, value) in next {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                merged
            }
            (Some(body), _) => body.clone(),
            (None, PageRequest::Post { body, .. }) => body.clone(),
            (None, PageRequest::Get(_)) => serde_json::Value::Object(Default::default()),
        };
        Some(PageRequest::Post {
            url: link.href.clone(),
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StacFeature {
    id: String,
    #[serde(default)]
    properties: StacProperties,
    #[serde(default)]
    assets: BTreeMap<String, StacAsset>,
}

#[derive(Debug, Default, Deserialize)]
struct StacProperties {
    #[serde(default)]
    datetime: Option<DateTime<Utc>>,
    #[serde(rename = "proj:wkt2", default)]
    wkt2: Option<String>,
    #[serde(rename = "proj:epsg", default)]
    epsg: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StacAsset {
    href: String,
    #[serde(rename = "type", default)]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StacLink {
    rel: String,
    href: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
    #[serde(default)]
    merge: bool,
}

impl From<StacFeature> for CatalogItem {
    fn from(feature: StacFeature) -> Self {
        let crs = feature
            .properties
            .wkt2
            .map(Crs::new)
            .or_else(|| feature.properties.epsg.map(Crs::epsg));
        CatalogItem {
            id: feature.id,
            datetime: feature.properties.datetime,
            crs,
            assets: feature
                .assets
                .into_iter()
                .map(|(name, asset)| {
                    (
                        name,
                        Asset {
                            href: asset.href,
                            media_type: asset.media_type,
                        },
                    )
                })
                .collect(),
        }
    }
}

fn parse_page(text: &str) -> Result<ItemCollection, serde_json::Error> {
    serde_json::from_str(text)
}
