//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is either built in code through its builder or read
//! from a JSON file; every field except `years` and `output_path` has a
//! default.
//!
//! ```json
//! {
//!   "years": { "start": 2019, "end": 2022 },
//!   "output_path": "flood_panel.csv",
//!   "muni_limit": 50,
//!   "inter_unit_delay": 0.5,
//!   "valid_pixel_rule": "composite_cells"
//! }
//! ```

use crate::catalog::retry::RetryPolicy;
use crate::raster::loader::LoadSettings;
use crate::raster::source::ChunkShape;
use crate::stats::ValidPixelRule;
use crate::types::calendar::Period;
use crate::types::municipality::MunicipalityCode;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Year range {start}..={end} is empty")]
    EmptyYears { start: i32, end: i32 },

    #[error("Month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("Start month {start_month} is after end month {end_month}")]
    MonthOrder { start_month: u32, end_month: u32 },

    #[error("No municipalities selected")]
    NoMunicipalities,

    #[error("Resolution must be positive, got {0}")]
    InvalidResolution(f64),

    #[error("Chunk size must be positive")]
    ZeroChunkSize,
}

fn default_start_month() -> u32 {
    1
}

fn default_end_month() -> u32 {
    12
}

fn default_boundary_year() -> i32 {
    2020
}

fn default_collection() -> String {
    "GFM".to_string()
}

fn default_band() -> String {
    "ensemble_flood_extent".to_string()
}

fn default_resolution() -> f64 {
    20.0
}

fn default_chunk_size() -> usize {
    2000
}

fn default_inter_unit_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_composite_path() -> PathBuf {
    PathBuf::from("max_flood.tif")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct PipelineConfig {
    /// Years to process, inclusive.
    pub years: RangeInclusive<i32>,
    /// Keep only the first `muni_limit` municipalities of the boundary listing.
    #[serde(default)]
    pub muni_limit: Option<usize>,
    /// Explicit municipalities to process instead of the boundary listing.
    #[serde(default)]
    pub municipality_codes: Option<Vec<MunicipalityCode>>,
    #[serde(default = "default_start_month")]
    #[builder(default = default_start_month())]
    pub start_month: u32,
    #[serde(default = "default_end_month")]
    #[builder(default = default_end_month())]
    pub end_month: u32,
    /// CSV file the panel is appended to.
    #[builder(into)]
    pub output_path: PathBuf,
    /// GeoTIFF the composite of the latest unit is written to.
    #[serde(default = "default_composite_path")]
    #[builder(into, default = default_composite_path())]
    pub composite_path: PathBuf,
    /// Write the composite of every unit to `composite_path`.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub write_composite: bool,
    /// Boundary vintage used for every period.
    #[serde(default = "default_boundary_year")]
    #[builder(default = default_boundary_year())]
    pub boundary_year: i32,
    #[serde(default = "default_collection")]
    #[builder(into, default = default_collection())]
    pub collection: String,
    #[serde(default = "default_band")]
    #[builder(into, default = default_band())]
    pub band: String,
    /// Output cell size in units of the raster CRS.
    #[serde(default = "default_resolution")]
    #[builder(default = default_resolution())]
    pub resolution: f64,
    /// Spatial chunk edge, in cells.
    #[serde(default = "default_chunk_size")]
    #[builder(default = default_chunk_size())]
    pub chunk_size: usize,
    /// Pause after every unit, successful or not.
    #[serde(
        default = "default_inter_unit_delay",
        with = "crate::utils::duration_secs"
    )]
    #[builder(default = default_inter_unit_delay())]
    pub inter_unit_delay: Duration,
    #[serde(default)]
    #[builder(default)]
    pub valid_pixel_rule: ValidPixelRule,
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub drop_empty_slices: bool,
    #[serde(default)]
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Reads and validates a JSON configuration file.
    pub async fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.is_empty() {
            return Err(ConfigError::EmptyYears {
                start: *self.years.start(),
                end: *self.years.end(),
            });
        }
        for month in [self.start_month, self.end_month] {
            if !(1..=12).contains(&month) {
                return Err(ConfigError::InvalidMonth(month));
            }
        }
        if self.start_month > self.end_month {
            return Err(ConfigError::MonthOrder {
                start_month: self.start_month,
                end_month: self.end_month,
            });
        }
        if self.muni_limit == Some(0)
            || self.municipality_codes.as_ref().is_some_and(Vec::is_empty)
        {
            return Err(ConfigError::NoMunicipalities);
        }
        if !(self.resolution > 0.0) {
            return Err(ConfigError::InvalidResolution(self.resolution));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    /// The configured months of `year`, or `None` for an invalid month span.
    pub fn period(&self, year: i32) -> Option<Period> {
        Period::within_year(year, self.start_month, self.end_month)
    }

    pub fn load_settings(&self) -> LoadSettings {
        LoadSettings {
            band: self.band.clone(),
            resolution: self.resolution,
            chunks: ChunkShape {
                x: self.chunk_size,
                y: self.chunk_size,
                time: None,
            },
            drop_empty_slices: self.drop_empty_slices,
        }
    }
}
