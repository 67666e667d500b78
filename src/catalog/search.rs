use crate::catalog::error::CatalogError;
use crate::catalog::query::SearchQuery;
use crate::types::item::CatalogItem;

/// A spatio-temporal catalog that can be searched for items.
///
/// One call covers exactly one query window. Implementations may return an
/// empty list; that is not an error.
#[allow(async_fn_in_trait)]
pub trait CatalogSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError>;
}

impl<T: CatalogSearch> CatalogSearch for &T {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        (**self).search(query).await
    }
}
