use crate::batch::{BatchDriver, BatchSummary};
use crate::boundaries::source::BoundarySource;
use crate::catalog::cache::CachedCatalog;
use crate::catalog::retriever::{ChunkedRetriever, Retrieval};
use crate::catalog::search::CatalogSearch;
use crate::catalog::stac_client::StacCatalog;
use crate::config::{ConfigError, PipelineConfig};
use crate::error::FloodError;
use crate::output::RecordSink;
use crate::raster::cube::FloodCube;
use crate::raster::loader::load_clipped;
use crate::raster::reduce::max_flood_extent;
use crate::raster::source::RasterSource;
use crate::stats::FloodStats;
use crate::types::calendar::Period;
use crate::types::municipality::{Municipality, MunicipalityCode};
use crate::types::record::{FloodRecord, SkipReason, UnitKey, UnitOutcome};
use crate::utils::get_cache_dir;
use bon::bon;
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;

/// The main entry point for building a municipality flood panel.
///
/// `FloodPanel` owns the three collaborators the pipeline talks to (a
/// [`CatalogSearch`] for flood-extent items, a [`BoundarySource`] for
/// municipality footprints and a [`RasterSource`] that turns items into
/// pixels) together with the [`PipelineConfig`] that parameterises every step.
///
/// The per-unit pipeline is:
///
/// 1. look up the municipality in the configured boundary vintage,
/// 2. search the catalog month by month over the configured months of a year,
/// 3. load the items over the municipality's bounding box and clip them to its
///    polygon,
/// 4. reduce the time axis to a max-flood-extent composite and write it as a
///    GeoTIFF (`max_flood.tif` unless configured otherwise),
/// 5. count flooded and valid cells into a [`FloodRecord`].
///
/// # Examples
///
/// ```rust,no_run
/// # use gfm_flood::{FloodPanel, FloodError, GeoJsonBoundaries, PipelineConfig, CsvRecordSink, RasterSource};
/// # use std::path::Path;
/// # async fn run(raster: impl RasterSource) -> Result<(), FloodError> {
/// let config = PipelineConfig::builder()
///     .years(2019..=2022)
///     .output_path("flood_panel.csv")
///     .muni_limit(50)
///     .build();
/// let boundaries = GeoJsonBoundaries::new(Path::new("data/boundaries"));
/// let panel = FloodPanel::with_eodc(boundaries, raster, config).await?;
///
/// let mut sink = CsvRecordSink::new(&panel.config().output_path);
/// let summary = panel.run_batch(&mut sink).await?;
/// println!("{} records written", summary.records_written);
/// # Ok(())
/// # }
/// ```
pub struct FloodPanel<C, B, R> {
    catalog: C,
    boundaries: B,
    raster: R,
    config: PipelineConfig,
}

impl<B: BoundarySource, R: RasterSource> FloodPanel<CachedCatalog<StacCatalog>, B, R> {
    /// A panel backed by the EODC STAC API, caching closed query windows in
    /// `cache_folder`.
    ///
    /// # Errors
    ///
    /// Returns [`FloodError::Config`] for an invalid configuration and
    /// [`FloodError::Catalog`] if the cache directory cannot be created.
    pub async fn with_cache_folder(
        boundaries: B,
        raster: R,
        config: PipelineConfig,
        cache_folder: PathBuf,
    ) -> Result<Self, FloodError> {
        let stac = StacCatalog::eodc().with_retry(config.retry);
        let catalog = CachedCatalog::new(stac, &cache_folder).await?;
        Self::new(catalog, boundaries, raster, config)
    }

    /// Like [`FloodPanel::with_cache_folder`], using the default cache directory
    /// (e.g. `~/.cache/gfm_flood_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Additionally returns [`FloodError::CacheDirResolution`] if there is no
    /// system cache directory.
    pub async fn with_eodc(boundaries: B, raster: R, config: PipelineConfig) -> Result<Self, FloodError> {
        let cache_folder = get_cache_dir().map_err(FloodError::CacheDirResolution)?;
        Self::with_cache_folder(boundaries, raster, config, cache_folder).await
    }
}

#[bon]
impl<C: CatalogSearch, B: BoundarySource, R: RasterSource> FloodPanel<C, B, R> {
    /// Assembles a panel from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`FloodError::Config`] if `config` fails
    /// [`PipelineConfig::validate`].
    pub fn new(catalog: C, boundaries: B, raster: R, config: PipelineConfig) -> Result<Self, FloodError> {
        config.validate()?;
        Ok(Self {
            catalog,
            boundaries,
            raster,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn boundaries(&self) -> &B {
        &self.boundaries
    }

    /// Searches the catalog for every month of `year` in the configured month
    /// span, over the municipality's bounding box.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.code(MunicipalityCode)`: **Required.** The municipality to search for.
    /// * `.year(i32)`: **Required.** The year whose months are searched.
    ///
    /// # Errors
    ///
    /// Returns [`FloodError::Boundary`] if the municipality is unknown and
    /// [`FloodError::Catalog`] if a window search fails.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use gfm_flood::{FloodPanel, FloodError, MunicipalityCode, Retrieval};
    /// # use gfm_flood::{CatalogSearch, BoundarySource, RasterSource};
    /// # async fn run<C: CatalogSearch, B: BoundarySource, R: RasterSource>(
    /// #     panel: FloodPanel<C, B, R>,
    /// # ) -> Result<(), FloodError> {
    /// let retrieval = panel
    ///     .municipality_items()
    ///     .code(MunicipalityCode(1100015))
    ///     .year(2021)
    ///     .call()
    ///     .await?;
    /// if let Retrieval::Items(items) = retrieval {
    ///     println!("{} flood acquisitions", items.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn municipality_items(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Retrieval, FloodError> {
        let municipality = self.municipality(code).await?;
        self.retrieve(&municipality, year).await
    }

    /// Loads the flood cube of a municipality for `year`, clipped to its
    /// polygon. `Ok(None)` when the catalog has no items for the period.
    ///
    /// This method uses a builder pattern with the same `.code()`/`.year()`
    /// arguments as [`FloodPanel::municipality_items`].
    ///
    /// # Errors
    ///
    /// Besides the errors of [`FloodPanel::municipality_items`], returns
    /// [`FloodError::Raster`] when loading, reprojecting or clipping fails.
    #[builder]
    pub async fn municipality_cube(
        &self,
        code: MunicipalityCode,
        year: i32,
    ) -> Result<Option<FloodCube>, FloodError> {
        let municipality = self.municipality(code).await?;
        self.cube_for(&municipality, year).await
    }

    /// Runs the whole per-unit pipeline for one municipality and year.
    ///
    /// Faults of the unit itself (unknown municipality, catalog, raster or
    /// GeoTIFF errors) do not propagate: they are logged and returned as
    /// [`UnitOutcome::Skipped`] with [`SkipReason::Failed`]. A period without
    /// catalog items is [`SkipReason::NoData`].
    ///
    /// # Errors
    ///
    /// Only [`FloodError::Config`], when the configured months do not form a
    /// period of `year`.
    #[builder]
    pub async fn unit(&self, code: MunicipalityCode, year: i32) -> Result<UnitOutcome, FloodError> {
        let period = self.period(year)?;
        let key = UnitKey { code, period };
        match self.record_for(code, year, period).await {
            Ok(Some(record)) => {
                info!(
                    "{}: {} of {} pixels flooded",
                    key, record.flooded_pixels, record.valid_pixels
                );
                Ok(UnitOutcome::Record(record))
            }
            Ok(None) => {
                info!("No flood data available for {}", key);
                Ok(UnitOutcome::Skipped {
                    key,
                    reason: SkipReason::NoData,
                })
            }
            Err(e) => {
                let message = error_chain(&e);
                error!("Error processing {}: {}", key, message);
                Ok(UnitOutcome::Skipped {
                    key,
                    reason: SkipReason::Failed(message),
                })
            }
        }
    }

    /// Runs every (year, municipality) unit of the configuration and appends
    /// the records to `sink`, one flush per year.
    ///
    /// # Errors
    ///
    /// Fatal errors only: see [`BatchDriver::run`].
    pub async fn run_batch<S: RecordSink>(&self, sink: &mut S) -> Result<BatchSummary, FloodError> {
        BatchDriver::new(self).run(sink).await
    }

    fn period(&self, year: i32) -> Result<Period, FloodError> {
        self.config.period(year).ok_or_else(|| {
            FloodError::Config(ConfigError::MonthOrder {
                start_month: self.config.start_month,
                end_month: self.config.end_month,
            })
        })
    }

    async fn municipality(&self, code: MunicipalityCode) -> Result<Municipality, FloodError> {
        Ok(self
            .boundaries
            .municipality(code, self.config.boundary_year)
            .await?)
    }

    async fn retrieve(&self, municipality: &Municipality, year: i32) -> Result<Retrieval, FloodError> {
        let retrieval = ChunkedRetriever::new(&self.catalog, &self.config.collection)
            .retrieve()
            .aoi(&municipality.bbox)
            .start_year(year)
            .end_year(year)
            .start_month(self.config.start_month)
            .end_month(self.config.end_month)
            .call()
            .await?;
        Ok(retrieval)
    }

    async fn cube_for(&self, municipality: &Municipality, year: i32) -> Result<Option<FloodCube>, FloodError> {
        let items = match self.retrieve(municipality, year).await? {
            Retrieval::Items(items) => items,
            Retrieval::NoData => return Ok(None),
        };
        let cube = load_clipped(
            &self.raster,
            &items,
            municipality,
            &self.config.load_settings(),
        )
        .await?;
        Ok(Some(cube))
    }

    async fn record_for(
        &self,
        code: MunicipalityCode,
        year: i32,
        period: Period,
    ) -> Result<Option<FloodRecord>, FloodError> {
        let municipality = self.municipality(code).await?;
        let Some(cube) = self.cube_for(&municipality, year).await? else {
            return Ok(None);
        };
        let composite = max_flood_extent(&cube);
        if self.config.write_composite {
            composite.write_geotiff(&self.config.composite_path).await?;
        }
        let stats = FloodStats::from_cube(&cube, &composite, self.config.valid_pixel_rule);
        Ok(Some(stats.into_record(code, period)))
    }
}

/// `error: cause: cause` for log lines and skip reasons.
fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::error::RasterError;
    use crate::test_support::{square, FakeBoundaries, FakeCatalog, FakeRaster};
    use crate::types::crs::Crs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .years(2021..=2021)
            .start_month(1)
            .end_month(3)
            .output_path("unused.csv")
            .write_composite(false)
            .inter_unit_delay(Duration::ZERO)
            .build()
    }

    fn panel(
        raster: FakeRaster,
        catalog: FakeCatalog,
        config: PipelineConfig,
    ) -> FloodPanel<FakeCatalog, FakeBoundaries, FakeRaster> {
        let boundaries = FakeBoundaries {
            municipalities: vec![square(1100015, 0.0, 40.0), square(1100023, 100.0, 40.0)],
            ..Default::default()
        };
        FloodPanel::new(catalog, boundaries, raster, config).unwrap()
    }

    #[tokio::test]
    async fn test_municipality_items_searches_each_month() {
        let panel = panel(FakeRaster::default(), FakeCatalog::default(), config());
        let retrieval = panel
            .municipality_items()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap();
        assert_eq!(retrieval.len(), 3);
        let queries = panel.catalog().queries.lock().unwrap();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|q| q.collection == "GFM"));
        assert_eq!(queries[0].aoi, square(1100015, 0.0, 40.0).bbox);
    }

    #[tokio::test]
    async fn test_municipality_cube_is_clipped() {
        let panel = panel(FakeRaster::default(), FakeCatalog::default(), config());
        let cube = panel
            .municipality_cube()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap()
            .unwrap();
        // Slices 2 and 3 hold observations too, so nothing is dropped.
        assert_eq!((cube.n_times(), cube.height(), cube.width()), (3, 2, 2));
        assert_eq!(cube.crs(), &Crs::epsg(27705));
    }

    #[tokio::test]
    async fn test_unit_produces_record() {
        let panel = panel(FakeRaster::default(), FakeCatalog::default(), config());
        let outcome = panel
            .unit()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap();
        let record = outcome.record().unwrap();
        assert_eq!(record.flooded_pixels, 2);
        assert_eq!(record.valid_pixels, 4);
        assert_eq!(record.flood_ratio, 0.5);
        assert_eq!(record.period.to_string(), "2021-01/2021-03");
    }

    #[tokio::test]
    async fn test_unit_without_items_is_no_data() {
        let catalog = FakeCatalog {
            empty_aoi: vec![square(1100015, 0.0, 40.0).bbox],
            ..Default::default()
        };
        let panel = panel(FakeRaster::default(), catalog, config());
        let outcome = panel
            .unit()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            UnitOutcome::Skipped {
                reason: SkipReason::NoData,
                ..
            }
        ));
        assert!(panel.raster.loads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_failure_is_caught() {
        let raster = FakeRaster {
            fail_bbox: vec![square(1100023, 100.0, 40.0).bbox],
            ..Default::default()
        };
        let panel = panel(raster, FakeCatalog::default(), config());
        let outcome = panel
            .unit()
            .code(MunicipalityCode(1100023))
            .year(2021)
            .call()
            .await
            .unwrap();
        match outcome {
            UnitOutcome::Skipped {
                key,
                reason: SkipReason::Failed(message),
            } => {
                assert_eq!(key.code, MunicipalityCode(1100023));
                assert!(message.contains("asset read timed out"));
            }
            other => panic!("expected a failed unit, got {other:?}"),
        }

        let unknown = panel
            .unit()
            .code(MunicipalityCode(9999999))
            .year(2021)
            .call()
            .await
            .unwrap();
        assert!(matches!(
            unknown,
            UnitOutcome::Skipped {
                reason: SkipReason::Failed(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_area_municipality_is_skipped() {
        let point_like = square(1100049, 300.0, 0.0);
        assert!(point_like.bbox.is_degenerate());
        let boundaries = FakeBoundaries {
            municipalities: vec![point_like],
            ..Default::default()
        };
        let panel = FloodPanel::new(
            FakeCatalog::default(),
            boundaries,
            FakeRaster::default(),
            config(),
        )
        .unwrap();

        let outcome = panel
            .unit()
            .code(MunicipalityCode(1100049))
            .year(2021)
            .call()
            .await
            .unwrap();
        match outcome {
            UnitOutcome::Skipped {
                key,
                reason: SkipReason::Failed(message),
            } => {
                assert_eq!(key.code, MunicipalityCode(1100049));
                assert_eq!(message, RasterError::NoOverlap.to_string());
            }
            other => panic!("expected a skipped unit, got {other:?}"),
        }
        assert_eq!(panel.catalog().queries.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unit_writes_composite() {
        let dir = tempdir().unwrap();
        let mut config = config();
        config.write_composite = true;
        config.composite_path = dir.path().join("composite.tif");
        let panel = panel(FakeRaster::default(), FakeCatalog::default(), config);
        panel
            .unit()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap();
        assert!(dir.path().join("composite.tif").exists());
    }

    #[tokio::test]
    async fn test_footprint_reprojected_when_crs_differs() {
        let mut municipality = square(1100015, 0.0, 40.0);
        municipality.crs = Crs::epsg(4674);
        let boundaries = FakeBoundaries {
            municipalities: vec![municipality],
            ..Default::default()
        };
        let panel = FloodPanel::new(
            FakeCatalog::default(),
            boundaries,
            FakeRaster::default(),
            config(),
        )
        .unwrap();
        panel
            .municipality_cube()
            .code(MunicipalityCode(1100015))
            .year(2021)
            .call()
            .await
            .unwrap();
        assert_eq!(*panel.raster.reprojections.lock().unwrap(), 1);
        let loads = panel.raster.loads.lock().unwrap();
        assert_eq!(loads[0].bbox_crs, Crs::epsg(4674));
        assert_eq!(loads[0].crs, Crs::epsg(27705));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.start_month = 0;
        let result = FloodPanel::new(
            FakeCatalog::default(),
            FakeBoundaries::default(),
            FakeRaster::default(),
            config,
        );
        assert!(matches!(
            result,
            Err(FloodError::Config(ConfigError::InvalidMonth(0)))
        ));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let error = FloodError::from(RasterError::FileWrite(
            PathBuf::from("out.tif"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        assert_eq!(error_chain(&error), "Failed to write raster file 'out.tif': denied");
    }
}
