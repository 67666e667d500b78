mod batch;
mod boundaries;
mod catalog;
mod config;
mod error;
mod flood_panel;
mod output;
mod raster;
mod stats;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

pub use error::FloodError;
pub use flood_panel::*;

pub use batch::{BatchDriver, BatchSummary};
pub use config::{ConfigError, PipelineConfig};
pub use output::{records_to_frame, CsvRecordSink, MemoryRecordSink, OutputError, RecordSink};
pub use stats::{FloodStats, ValidPixelRule};

pub use types::calendar::{days_in_month, Month, Period, QueryWindow};
pub use types::crs::Crs;
pub use types::item::{Asset, CatalogItem};
pub use types::municipality::{BoundingBox, Municipality, MunicipalityCode};
pub use types::pixel::{FLOODED, NODATA, NOT_FLOODED};
pub use types::record::{FloodRecord, SkipReason, UnitKey, UnitOutcome};

pub use catalog::cache::CachedCatalog;
pub use catalog::query::{aoi_polygon, SearchQuery};
pub use catalog::retriever::{ChunkedRetriever, Retrieval};
pub use catalog::retry::{send_with_retry, RetryPolicy};
pub use catalog::search::CatalogSearch;
pub use catalog::stac_client::{StacCatalog, EODC_STAC_URL};

pub use boundaries::geojson_file::{GeoJsonBoundaries, SIRGAS_2000_EPSG};
pub use boundaries::source::BoundarySource;

pub use raster::clip::clip_to_polygon;
pub use raster::cube::{FloodComposite, FloodCube, GeoTransform, PixelWindow};
pub use raster::geotiff::encode_geotiff;
pub use raster::loader::{load_clipped, target_crs, LoadSettings};
pub use raster::reduce::{count_flooded_pixels, keep_non_missing, max_flood_extent};
pub use raster::source::{ChunkShape, LoadRequest, RasterSource};

pub use boundaries::error::BoundaryError;
pub use catalog::error::CatalogError;
pub use raster::error::RasterError;
