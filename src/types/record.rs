//! Per-unit results of the pipeline.

use crate::types::calendar::Period;
use crate::types::municipality::MunicipalityCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Identifies one unit of work: a municipality over a period.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub code: MunicipalityCode,
    pub period: Period,
}

impl Display for UnitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.period)
    }
}

/// One row of the flood panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodRecord {
    pub code_muni: MunicipalityCode,
    pub year: i32,
    pub period: Period,
    pub flooded_pixels: u64,
    pub valid_pixels: u64,
    /// `flooded_pixels / valid_pixels`, `NaN` when there are no valid pixels.
    pub flood_ratio: f64,
}

/// Why a unit produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The catalog had no items for any window of the period.
    NoData,
    /// Retrieval, loading, clipping or aggregation failed.
    Failed(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => f.write_str("no catalog items"),
            SkipReason::Failed(message) => f.write_str(message),
        }
    }
}

/// The outcome of running the pipeline for a single unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Record(FloodRecord),
    Skipped { key: UnitKey, reason: SkipReason },
}

impl UnitOutcome {
    pub fn record(self) -> Option<FloodRecord> {
        match self {
            UnitOutcome::Record(record) => Some(record),
            UnitOutcome::Skipped { .. } => None,
        }
    }
}
