//! The years × municipalities loop.

use crate::boundaries::source::BoundarySource;
use crate::catalog::search::CatalogSearch;
use crate::config::ConfigError;
use crate::error::FloodError;
use crate::flood_panel::FloodPanel;
use crate::output::RecordSink;
use crate::raster::source::RasterSource;
use crate::types::municipality::MunicipalityCode;
use crate::types::record::{SkipReason, UnitOutcome};
use log::info;

/// Counts of a finished batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub records_written: usize,
    pub skipped_no_data: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn units(&self) -> usize {
        self.records_written + self.skipped_no_data + self.failed
    }
}

pub struct BatchDriver<'a, C, B, R> {
    panel: &'a FloodPanel<C, B, R>,
}

impl<'a, C: CatalogSearch, B: BoundarySource, R: RasterSource> BatchDriver<'a, C, B, R> {
    pub fn new(panel: &'a FloodPanel<C, B, R>) -> Self {
        Self { panel }
    }

    /// The configured municipality codes, or the boundary listing of the
    /// boundary year, cut to `muni_limit`.
    pub async fn municipality_codes(&self) -> Result<Vec<MunicipalityCode>, FloodError> {
        let config = self.panel.config();
        let mut codes = match &config.municipality_codes {
            Some(codes) => codes.clone(),
            None => {
                self.panel
                    .boundaries()
                    .municipality_codes(config.boundary_year)
                    .await?
            }
        };
        if let Some(limit) = config.muni_limit {
            codes.truncate(limit);
        }
        if codes.is_empty() {
            return Err(ConfigError::NoMunicipalities.into());
        }
        Ok(codes)
    }

    /// Processes every year (outer loop) and municipality (inner loop).
    ///
    /// Records are buffered per year and appended to `sink` when the year is
    /// done; only the first append carries the header. Failed and empty units
    /// are counted and skipped. The configured delay is slept after every
    /// unit.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a failing municipality listing and sink write
    /// errors abort the batch. Records appended before the error stay written.
    pub async fn run<S: RecordSink>(&self, sink: &mut S) -> Result<BatchSummary, FloodError> {
        let config = self.panel.config();
        let codes = self.municipality_codes().await?;
        info!(
            "Processing {} municipalities over {}..={}",
            codes.len(),
            config.years.start(),
            config.years.end()
        );

        let mut summary = BatchSummary::default();
        let mut records = Vec::new();
        let mut first_flush = true;
        for year in config.years.clone() {
            for &code in &codes {
                info!("Processing municipality {} for {}", code, year);
                match self.panel.unit().code(code).year(year).call().await? {
                    UnitOutcome::Record(record) => records.push(record),
                    UnitOutcome::Skipped {
                        reason: SkipReason::NoData,
                        ..
                    } => summary.skipped_no_data += 1,
                    UnitOutcome::Skipped {
                        reason: SkipReason::Failed(_),
                        ..
                    } => summary.failed += 1,
                }
                tokio::time::sleep(config.inter_unit_delay).await;
            }

            sink.append(&records, first_flush).await?;
            first_flush = false;
            summary.records_written += records.len();
            info!("Saved {} records for {}", records.len(), year);
            records.clear();
        }

        info!(
            "Batch finished: {} records, {} without data, {} failed",
            summary.records_written, summary.skipped_no_data, summary.failed
        );
        Ok(summary)
    }
}
