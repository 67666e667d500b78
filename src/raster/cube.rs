//! In-memory gridded rasters: the time × y × x flood cube and its 2-D composite.

use crate::raster::error::RasterError;
use crate::types::crs::Crs;
use crate::types::municipality::BoundingBox;
use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3, Axis};

/// North-up affine transform of a grid.
///
/// `origin_x`/`origin_y` is the outer corner of the top-left cell; columns grow
/// eastwards by `pixel_width` and rows grow southwards by `pixel_height`. Both
/// sizes are positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Half-open row/column ranges of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl GeoTransform {
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, RasterError> {
        if !(pixel_width > 0.0 && pixel_height > 0.0) {
            return Err(RasterError::InvalidTransform {
                pixel_width,
                pixel_height,
            });
        }
        Ok(Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        })
    }

    /// Map coordinates of the centre of cell (`row`, `col`).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// The cells of a `rows` × `cols` grid touched by `bbox`, or `None` when
    /// the box lies entirely outside the grid.
    pub fn window_for(&self, bbox: &BoundingBox, rows: usize, cols: usize) -> Option<PixelWindow> {
        let col_start = ((bbox.min_x - self.origin_x) / self.pixel_width)
            .floor()
            .clamp(0.0, cols as f64) as usize;
        let col_end = ((bbox.max_x - self.origin_x) / self.pixel_width)
            .ceil()
            .clamp(0.0, cols as f64) as usize;
        let row_start = ((self.origin_y - bbox.max_y) / self.pixel_height)
            .floor()
            .clamp(0.0, rows as f64) as usize;
        let row_end = ((self.origin_y - bbox.min_y) / self.pixel_height)
            .ceil()
            .clamp(0.0, rows as f64) as usize;
        (col_start < col_end && row_start < row_end).then_some(PixelWindow {
            row_start,
            row_end,
            col_start,
            col_end,
        })
    }

    /// The transform of a sub-grid starting at (`row`, `col`).
    pub fn shifted(&self, row: usize, col: usize) -> Self {
        Self {
            origin_x: self.origin_x + col as f64 * self.pixel_width,
            origin_y: self.origin_y - row as f64 * self.pixel_height,
            ..*self
        }
    }
}

/// A time × y × x stack of `ensemble_flood_extent` slices in the
/// {0, 1, 255} pixel domain.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodCube {
    data: Array3<u8>,
    times: Vec<DateTime<Utc>>,
    transform: GeoTransform,
    crs: Crs,
}

impl FloodCube {
    /// # Errors
    ///
    /// Returns [`RasterError::ShapeMismatch`] unless there is exactly one
    /// timestamp per time slice.
    pub fn new(
        data: Array3<u8>,
        times: Vec<DateTime<Utc>>,
        transform: GeoTransform,
        crs: Crs,
    ) -> Result<Self, RasterError> {
        let slices = data.len_of(Axis(0));
        if slices != times.len() {
            return Err(RasterError::ShapeMismatch {
                slices,
                times: times.len(),
            });
        }
        Ok(Self {
            data,
            times,
            transform,
            crs,
        })
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn n_times(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Keeps only the time slices at `indices`, in that order.
    pub(crate) fn select_times(self, indices: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(0), indices),
            times: indices.iter().map(|&index| self.times[index]).collect(),
            transform: self.transform,
            crs: self.crs,
        }
    }

    pub fn into_parts(self) -> (Array3<u8>, Vec<DateTime<Utc>>, GeoTransform, Crs) {
        (self.data, self.times, self.transform, self.crs)
    }
}

/// A y × x binary flood map: 1 where the cell flooded at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodComposite {
    data: Array2<u8>,
    transform: GeoTransform,
    crs: Crs,
}

impl FloodComposite {
    pub fn new(data: Array2<u8>, transform: GeoTransform, crs: Crs) -> Self {
        Self {
            data,
            transform,
            crs,
        }
    }

    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }
}
