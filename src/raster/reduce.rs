//! Temporal reductions of a flood cube.

use crate::raster::cube::{FloodComposite, FloodCube};
use crate::types::pixel::{FLOODED, NODATA, NOT_FLOODED};
use ndarray::Axis;

/// Maximum flood extent over the whole time axis.
///
/// Per cell, nodata and not-flooded samples are excluded and the remaining
/// (flooded) samples are summed; the composite cell is 1 when that sum is
/// positive and 0 otherwise. A cell that was never observed and a cell that
/// was observed but never flooded both end up 0.
///
/// The reduction does not depend on slice order, and reducing the same cube
/// twice gives identical composites.
pub fn max_flood_extent(cube: &FloodCube) -> FloodComposite {
    let data = cube.data().map_axis(Axis(0), |series| {
        let flooded: u64 = series
            .iter()
            .filter(|&&v| v != NODATA && v != NOT_FLOODED)
            .map(|&v| u64::from(v))
            .sum();
        u8::from(flooded > 0)
    });
    FloodComposite::new(data, *cube.transform(), cube.crs().clone())
}

/// Number of cells equal to [`FLOODED`] in at least one time slice.
pub fn count_flooded_pixels(cube: &FloodCube) -> u64 {
    cube.data()
        .map_axis(Axis(0), |series| series.iter().any(|&v| v == FLOODED))
        .iter()
        .filter(|&&flooded| flooded)
        .count() as u64
}

/// Removes time slices in which every cell is [`NODATA`].
pub fn keep_non_missing(cube: FloodCube) -> FloodCube {
    let keep: Vec<usize> = cube
        .data()
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, slice)| slice.iter().any(|&v| v != NODATA))
        .map(|(index, _)| index)
        .collect();
    if keep.len() == cube.n_times() {
        return cube;
    }
    cube.select_times(&keep)
}
