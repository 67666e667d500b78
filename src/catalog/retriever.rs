//! Month-by-month item retrieval.
//!
//! A multi-year request is split into one catalog search per calendar month so
//! no single response (or cache entry) grows with the length of the period, and
//! a month without data does not affect the others.

use crate::catalog::error::CatalogError;
use crate::catalog::query::SearchQuery;
use crate::catalog::search::CatalogSearch;
use crate::types::calendar::QueryWindow;
use crate::types::item::CatalogItem;
use crate::types::municipality::BoundingBox;
use bon::bon;
use log::{debug, info, warn};

/// Result of a chunked retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Items from every window that had any, in chronological window order.
    Items(Vec<CatalogItem>),
    /// No window returned a single item.
    NoData,
}

impl Retrieval {
    pub fn len(&self) -> usize {
        match self {
            Retrieval::Items(items) => items.len(),
            Retrieval::NoData => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<CatalogItem> {
        match self {
            Retrieval::Items(items) => items,
            Retrieval::NoData => Vec::new(),
        }
    }
}

pub struct ChunkedRetriever<'a, C> {
    catalog: &'a C,
    collection: &'a str,
}

#[bon]
impl<'a, C: CatalogSearch> ChunkedRetriever<'a, C> {
    pub fn new(catalog: &'a C, collection: &'a str) -> Self {
        Self {
            catalog,
            collection,
        }
    }

    /// Searches every (year, month) window of
    /// `start_year..=end_year` × `start_month..=end_month`, oldest first,
    /// and accumulates the items found.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidWindow`] if a month bound is outside
    /// `1..=12`, or the first error raised by a window's search.
    #[builder]
    pub async fn retrieve(
        &self,
        aoi: &BoundingBox,
        start_year: i32,
        end_year: i32,
        start_month: u32,
        end_month: u32,
    ) -> Result<Retrieval, CatalogError> {
        let windows = QueryWindow::cross_product(start_year, end_year, start_month, end_month)
            .ok_or(CatalogError::InvalidWindow {
                start_year,
                end_year,
                start_month,
                end_month,
            })?;
        if aoi.is_degenerate() {
            warn!("Area of interest {:?} has no area; expecting no items", aoi);
        }

        let mut items = Vec::new();
        for window in windows {
            info!("Searching {}...", window);
            let query = SearchQuery::new(self.collection, *aoi, window);
            let found = self.catalog.search(&query).await?;
            info!("We found {} items for {}", found.len(), window);
            if found.is_empty() {
                debug!("No items for {}, skipping window", window);
                continue;
            }
            items.extend(found);
        }

        if items.is_empty() {
            Ok(Retrieval::NoData)
        } else {
            Ok(Retrieval::Items(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::calendar::Month;
    use crate::types::crs::Crs;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Serves a fixed list of dated items, filtered by each query's window.
    struct FakeCatalog {
        items: Vec<CatalogItem>,
        queries: Mutex<Vec<SearchQuery>>,
        fail_on: Option<Month>,
    }

    impl FakeCatalog {
        fn new(days: &[(i32, u32, u32)]) -> Self {
            let items = days
                .iter()
                .map(|&(y, m, d)| {
                    CatalogItem::new(format!("{y}-{m:02}-{d:02}"))
                        .with_crs(Crs::epsg(27705))
                        .with_datetime(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap())
                })
                .collect();
            Self {
                items,
                queries: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn months_queried(&self) -> Vec<String> {
            self.queries
                .lock()
                .unwrap()
                .iter()
                .map(|q| q.window.month().to_string())
                .collect()
        }
    }

    impl CatalogSearch for FakeCatalog {
        async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail_on == Some(query.window.month()) {
                return Err(CatalogError::Search("service unavailable".to_string()));
            }
            let first = query.window.first_day().unwrap();
            let last = query.window.last_day().unwrap();
            Ok(self
                .items
                .iter()
                .filter(|item| {
                    let day = item.datetime.unwrap().date_naive();
                    first <= day && day <= last
                })
                .cloned()
                .collect())
        }
    }

    fn aoi() -> BoundingBox {
        BoundingBox::new(-61.0, -12.0, -60.0, -11.0)
    }

    #[tokio::test]
    async fn test_windows_are_searched_in_order() -> Result<(), CatalogError> {
        let catalog = FakeCatalog::new(&[(2021, 1, 3), (2022, 2, 10)]);
        let retriever = ChunkedRetriever::new(&catalog, "GFM");
        let retrieval = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2021)
            .end_year(2022)
            .start_month(1)
            .end_month(2)
            .call()
            .await?;

        assert_eq!(
            catalog.months_queried(),
            ["2021-01", "2021-02", "2022-01", "2022-02"]
        );
        let ids: Vec<String> = retrieval.into_items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["2021-01-03", "2022-02-10"]);

        let queries = catalog.queries.lock().unwrap();
        assert!(queries.iter().all(|q| q.collection == "GFM" && q.aoi == aoi()));
        assert_eq!(queries[1].datetime(), "2021-02-01/2021-02-28");
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_chunks_match_a_single_wide_query() -> Result<(), CatalogError> {
        let days = [
            (2021, 1, 1),
            (2021, 1, 31),
            (2021, 2, 14),
            (2021, 3, 1),
            (2021, 3, 17),
            (2021, 3, 31),
            (2021, 4, 1),
        ];
        let catalog = FakeCatalog::new(&days);
        let retriever = ChunkedRetriever::new(&catalog, "GFM");
        let retrieval = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2021)
            .end_year(2021)
            .start_month(1)
            .end_month(3)
            .call()
            .await?;

        let wide_first = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let wide_last = chrono::NaiveDate::from_ymd_opt(2021, 3, 31).unwrap();
        let wide_count = catalog
            .items
            .iter()
            .filter(|i| {
                let day = i.datetime.unwrap().date_naive();
                wide_first <= day && day <= wide_last
            })
            .count();
        assert_eq!(retrieval.len(), wide_count);
        assert_eq!(retrieval.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_windows_are_skipped_and_all_empty_is_no_data() -> Result<(), CatalogError> {
        let catalog = FakeCatalog::new(&[(2021, 5, 5)]);
        let retriever = ChunkedRetriever::new(&catalog, "GFM");

        let some = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2021)
            .end_year(2021)
            .start_month(4)
            .end_month(6)
            .call()
            .await?;
        assert_eq!(some.len(), 1);

        let none = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2020)
            .end_year(2020)
            .start_month(1)
            .end_month(12)
            .call()
            .await?;
        assert_eq!(none, Retrieval::NoData);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected() {
        let catalog = FakeCatalog::new(&[]);
        let retriever = ChunkedRetriever::new(&catalog, "GFM");
        let result = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2021)
            .end_year(2021)
            .start_month(1)
            .end_month(13)
            .call()
            .await;
        assert!(matches!(result, Err(CatalogError::InvalidWindow { .. })));
        assert!(catalog.months_queried().is_empty());
    }

    #[tokio::test]
    async fn test_search_error_fails_the_retrieval() {
        let mut catalog = FakeCatalog::new(&[(2021, 1, 3)]);
        catalog.fail_on = Month::new(2, 2021);
        let retriever = ChunkedRetriever::new(&catalog, "GFM");
        let result = retriever
            .retrieve()
            .aoi(&aoi())
            .start_year(2021)
            .end_year(2021)
            .start_month(1)
            .end_month(3)
            .call()
            .await;
        assert!(matches!(result, Err(CatalogError::Search(_))));
        assert_eq!(catalog.months_queried(), ["2021-01", "2021-02"]);
    }
}
