//! Per-window disk cache for catalog searches.
//!
//! Windows that ended before today are immutable in the catalog, so their item
//! lists are stored as `bincode` files and reused on later runs. The current
//! (still open) month is always searched live.

use crate::catalog::error::CatalogError;
use crate::catalog::query::SearchQuery;
use crate::catalog::search::CatalogSearch;
use crate::types::calendar::QueryWindow;
use crate::types::item::CatalogItem;
use crate::utils::ensure_cache_dir_exists;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use std::path::{Path, PathBuf};

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Wraps a [`CatalogSearch`] and caches the results of closed windows.
pub struct CachedCatalog<C> {
    inner: C,
    cache_dir: PathBuf,
}

impl<C: CatalogSearch> CachedCatalog<C> {
    pub async fn new(inner: C, cache_dir: &Path) -> Result<Self, CatalogError> {
        ensure_cache_dir_exists(cache_dir)
            .await
            .map_err(|e| CatalogError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
        Ok(Self {
            inner,
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn cache_path(&self, query: &SearchQuery) -> PathBuf {
        self.cache_dir.join(format!("{}.bin", query.cache_key()))
    }

    async fn read_cached(path: &Path) -> Result<Vec<CatalogItem>, CatalogError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CatalogError::CacheRead(path.to_path_buf(), e))?;
        let path_buf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            bincode::serde::decode_from_slice::<Vec<CatalogItem>, _>(&bytes, BINCODE_CONFIG)
                .map(|(items, _)| items)
                .map_err(|e| CatalogError::CacheDecode(path_buf, Box::new(e)))
        })
        .await?
    }

    async fn write_cached(items: Vec<CatalogItem>, path: &Path) -> Result<(), CatalogError> {
        let bytes = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(&items, BINCODE_CONFIG)
                .map_err(|e| CatalogError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| CatalogError::CacheWrite(path.to_path_buf(), e))
    }
}

impl<C: CatalogSearch> CatalogSearch for CachedCatalog<C> {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        let cacheable = is_closed(query.window, Utc::now().date_naive());
        let path = self.cache_path(query);

        if cacheable && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            match Self::read_cached(&path).await {
                Ok(items) => {
                    debug!("Cache hit for {} at {:?}", query.window, path);
                    return Ok(items);
                }
                Err(e) => warn!("Ignoring unreadable cache entry {:?}: {}", path, e),
            }
        }

        let items = self.inner.search(query).await?;
        if cacheable {
            if let Err(e) = Self::write_cached(items.clone(), &path).await {
                warn!("Failed to cache {}: {}", query.window, e);
            }
        }
        Ok(items)
    }
}

/// A window is closed once its last day lies strictly before `today`.
fn is_closed(window: QueryWindow, today: NaiveDate) -> bool {
    window.last_day().is_some_and(|last| last < today)
}
