//! Per-unit flood statistics.

use crate::raster::cube::{FloodComposite, FloodCube};
use crate::types::calendar::Period;
use crate::types::municipality::MunicipalityCode;
use crate::types::pixel::{FLOODED, NODATA};
use crate::types::record::FloodRecord;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Which cells count towards the denominator of the flood ratio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidPixelRule {
    /// Every composite cell that is not nodata. The composite never holds
    /// nodata, so this is the full clipped grid, including cells masked out
    /// by the municipality polygon.
    CompositeCells,
    /// Cells with at least one observed (non-nodata) sample in the period.
    #[default]
    EverObserved,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FloodStats {
    pub flooded_pixels: u64,
    pub valid_pixels: u64,
}

impl FloodStats {
    pub fn from_cube(cube: &FloodCube, composite: &FloodComposite, rule: ValidPixelRule) -> Self {
        let flooded_pixels = composite.data().iter().filter(|&&v| v == FLOODED).count() as u64;
        let valid_pixels = match rule {
            ValidPixelRule::CompositeCells => {
                composite.data().iter().filter(|&&v| v != NODATA).count() as u64
            }
            ValidPixelRule::EverObserved => cube
                .data()
                .map_axis(Axis(0), |series| series.iter().any(|&v| v != NODATA))
                .iter()
                .filter(|&&observed| observed)
                .count() as u64,
        };
        Self {
            flooded_pixels,
            valid_pixels,
        }
    }

    /// `flooded / valid`, or `NaN` when no cell is valid.
    pub fn flood_ratio(&self) -> f64 {
        if self.valid_pixels == 0 {
            f64::NAN
        } else {
            self.flooded_pixels as f64 / self.valid_pixels as f64
        }
    }

    pub fn into_record(self, code_muni: MunicipalityCode, period: Period) -> FloodRecord {
        FloodRecord {
            code_muni,
            year: period.start.year(),
            period,
            flooded_pixels: self.flooded_pixels,
            valid_pixels: self.valid_pixels,
            flood_ratio: self.flood_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::cube::GeoTransform;
    use crate::raster::reduce::max_flood_extent;
    use crate::types::crs::Crs;
    use chrono::{TimeZone, Utc};
    use ndarray::Array3;

    /// 2 slices over a 2 x 3 grid:
    /// cell 0 flooded, cell 1 dry, cell 2 never observed,
    /// cell 3 flooded once, cell 4 dry then missing, cell 5 never observed.
    fn cube() -> FloodCube {
        let data = Array3::from_shape_vec(
            (2, 2, 3),
            vec![
                1, 0, 255, //
                0, 0, 255, //
                1, 255, 255, //
                1, 255, 255,
            ],
        )
        .unwrap();
        let times = vec![
            Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 3, 13, 0, 0, 0).unwrap(),
        ];
        FloodCube::new(
            data,
            times,
            GeoTransform::new(0.0, 40.0, 20.0, 20.0).unwrap(),
            Crs::epsg(27705),
        )
        .unwrap()
    }

    #[test]
    fn test_ever_observed_rule() {
        let cube = cube();
        let stats = FloodStats::from_cube(&cube, &max_flood_extent(&cube), ValidPixelRule::EverObserved);
        assert_eq!(stats.flooded_pixels, 2);
        assert_eq!(stats.valid_pixels, 4);
        assert_eq!(stats.flood_ratio(), 0.5);
    }

    #[test]
    fn test_composite_cells_rule() {
        let cube = cube();
        let stats =
            FloodStats::from_cube(&cube, &max_flood_extent(&cube), ValidPixelRule::CompositeCells);
        assert_eq!(stats.flooded_pixels, 2);
        assert_eq!(stats.valid_pixels, 6);
        assert!((stats.flood_ratio() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_flooded_never_exceeds_valid() {
        let cube = cube();
        let composite = max_flood_extent(&cube);
        for rule in [ValidPixelRule::CompositeCells, ValidPixelRule::EverObserved] {
            let stats = FloodStats::from_cube(&cube, &composite, rule);
            assert!(stats.flooded_pixels <= stats.valid_pixels);
            assert!((0.0..=1.0).contains(&stats.flood_ratio()));
        }
    }

    #[test]
    fn test_ratio_is_nan_without_valid_pixels() {
        let stats = FloodStats {
            flooded_pixels: 0,
            valid_pixels: 0,
        };
        assert!(stats.flood_ratio().is_nan());
    }

    #[test]
    fn test_into_record() {
        let period = Period::within_year(2021, 1, 12).unwrap();
        let record = FloodStats {
            flooded_pixels: 3,
            valid_pixels: 12,
        }
        .into_record(MunicipalityCode(1100015), period);
        assert_eq!(record.year, 2021);
        assert_eq!(record.flood_ratio, 0.25);
        assert_eq!(record.period.to_string(), "2021-01/2021-12");
    }

    #[test]
    fn test_rule_deserializes_from_snake_case() {
        let rule: ValidPixelRule = serde_json::from_str("\"composite_cells\"").unwrap();
        assert_eq!(rule, ValidPixelRule::CompositeCells);
        assert_eq!(ValidPixelRule::default(), ValidPixelRule::EverObserved);
    }
}
