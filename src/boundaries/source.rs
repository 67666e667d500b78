use crate::boundaries::error::BoundaryError;
use crate::types::municipality::{Municipality, MunicipalityCode};

/// Provider of administrative boundaries for a reference year.
#[allow(async_fn_in_trait)]
pub trait BoundarySource {
    /// The municipality with `code` in the `year` boundary vintage.
    async fn municipality(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Municipality, BoundaryError>;

    /// All municipality codes of the `year` vintage, in source order.
    async fn municipality_codes(&self, year: i32) -> Result<Vec<MunicipalityCode>, BoundaryError>;
}

impl<T: BoundarySource> BoundarySource for &T {
    async fn municipality(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Municipality, BoundaryError> {
        (**self).municipality(code, year).await
    }

    async fn municipality_codes(&self, year: i32) -> Result<Vec<MunicipalityCode>, BoundaryError> {
        (**self).municipality_codes(year).await
    }
}
