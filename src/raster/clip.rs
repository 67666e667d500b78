use crate::raster::cube::FloodCube;
use crate::raster::error::RasterError;
use crate::types::municipality::BoundingBox;
use crate::types::pixel::NODATA;
use geo::{Contains, MultiPolygon, Point};
use ndarray::s;

/// Clips `cube` to `polygon`, which must be in the cube's CRS.
///
/// Rows and columns outside the polygon's bounding window are dropped from the
/// grid. Inside the window, every cell whose centre is not inside the polygon
/// becomes [`NODATA`] in all time slices.
///
/// # Errors
///
/// [`RasterError::EmptyGeometry`] for an empty polygon and
/// [`RasterError::NoOverlap`] when the polygon misses the grid entirely.
pub fn clip_to_polygon(
    cube: &FloodCube,
    polygon: &MultiPolygon<f64>,
) -> Result<FloodCube, RasterError> {
    let bbox = BoundingBox::of(polygon).ok_or(RasterError::EmptyGeometry)?;
    let transform = cube.transform();
    let window = transform
        .window_for(&bbox, cube.height(), cube.width())
        .ok_or(RasterError::NoOverlap)?;

    let mut data = cube
        .data()
        .slice(s![
            ..,
            window.row_start..window.row_end,
            window.col_start..window.col_end
        ])
        .to_owned();
    let clipped_transform = transform.shifted(window.row_start, window.col_start);

    for row in 0..data.len_of(ndarray::Axis(1)) {
        for col in 0..data.len_of(ndarray::Axis(2)) {
            let (x, y) = clipped_transform.cell_center(row, col);
            if !polygon.contains(&Point::new(x, y)) {
                data.slice_mut(s![.., row, col]).fill(NODATA);
            }
        }
    }

    FloodCube::new(
        data,
        cube.times().to_vec(),
        clipped_transform,
        cube.crs().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::cube::GeoTransform;
    use crate::types::crs::Crs;
    use crate::types::pixel::FLOODED;
    use chrono::{TimeZone, Utc};
    use geo::polygon;
    use ndarray::Array3;

    fn cube() -> FloodCube {
        // 2 slices of a 6 x 6 grid covering x 0..60, y 0..60, all flooded.
        let transform = GeoTransform::new(0.0, 60.0, 10.0, 10.0).unwrap();
        let times = vec![
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap(),
        ];
        FloodCube::new(
            Array3::from_elem((2, 6, 6), FLOODED),
            times,
            transform,
            Crs::epsg(3857),
        )
        .unwrap()
    }

    #[test]
    fn test_clip_drops_cells_outside_the_polygon_window() {
        // Square over cells rows 1..3, cols 2..5.
        let square = MultiPolygon(vec![polygon![
            (x: 20.0, y: 50.0),
            (x: 50.0, y: 50.0),
            (x: 50.0, y: 30.0),
            (x: 20.0, y: 30.0),
            (x: 20.0, y: 50.0),
        ]]);
        let clipped = clip_to_polygon(&cube(), &square).unwrap();
        assert_eq!(clipped.data().dim(), (2, 2, 3));
        assert_eq!(clipped.transform().origin_x, 20.0);
        assert_eq!(clipped.transform().origin_y, 50.0);
        assert!(clipped.data().iter().all(|&v| v == FLOODED));
        assert_eq!(clipped.times(), cube().times());
    }

    #[test]
    fn test_clip_masks_cells_outside_the_polygon() {
        // Right triangle covering the lower-left half of the full grid.
        let triangle = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 60.0, y: 0.0),
            (x: 0.0, y: 60.0),
            (x: 0.0, y: 0.0),
        ]]);
        let clipped = clip_to_polygon(&cube(), &triangle).unwrap();
        assert_eq!(clipped.data().dim(), (2, 6, 6));
        for t in 0..2 {
            // top-right corner is outside, bottom-left inside
            assert_eq!(clipped.data()[[t, 0, 5]], NODATA);
            assert_eq!(clipped.data()[[t, 5, 0]], FLOODED);
        }
        let inside = clipped
            .data()
            .index_axis(ndarray::Axis(0), 0)
            .iter()
            .filter(|&&v| v == FLOODED)
            .count();
        // cells whose centre satisfies x + y < 60
        assert_eq!(inside, 15);
    }

    #[test]
    fn test_clip_without_overlap_fails() {
        let far = MultiPolygon(vec![polygon![
            (x: 100.0, y: 100.0),
            (x: 110.0, y: 100.0),
            (x: 110.0, y: 110.0),
            (x: 100.0, y: 100.0),
        ]]);
        assert!(matches!(
            clip_to_polygon(&cube(), &far),
            Err(RasterError::NoOverlap)
        ));
        assert!(matches!(
            clip_to_polygon(&cube(), &MultiPolygon(vec![])),
            Err(RasterError::EmptyGeometry)
        ));
    }
}
