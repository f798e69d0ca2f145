use crate::point::Point;

/// Standard GDAL-style affine georeferencing: `GetGeoTransform()`'s 6-tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl Affine {
    pub fn from_tuple(t: [f64; 6]) -> Self {
        Affine {
            origin_x: t[0],
            pixel_width: t[1],
            row_rotation: t[2],
            origin_y: t[3],
            col_rotation: t[4],
            pixel_height: t[5],
        }
    }

    /// Identity-ish transform used by tests: one world unit per pixel.
    pub fn identity() -> Self {
        Affine::from_tuple([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn apply(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }
}

/// A categorical label raster: row-major `i64` labels plus georeferencing.
/// Labels are opaque identifiers — their numeric ordering carries no
/// meaning beyond providing a deterministic total order for canonicalizing
/// arcs and sorting output.
#[derive(Debug, Clone)]
pub struct LabelGrid {
    pub width: u32,
    pub height: u32,
    pub data: Vec<i64>,
    pub nodata: Option<i64>,
    pub affine: Affine,
    pub crs: String,
}

impl LabelGrid {
    pub fn new(width: u32, height: u32, data: Vec<i64>, nodata: Option<i64>, affine: Affine, crs: String) -> Self {
        assert_eq!(data.len(), (width as usize) * (height as usize));
        LabelGrid { width, height, data, nodata, affine, crs }
    }

    /// The region label at `(col, row)`, or `None` for out-of-bounds or
    /// nodata pixels — both behave as "not part of any region" for the
    /// topology engine, i.e. they sit on the `Outside` side of any arc.
    pub fn label_at(&self, col: i64, row: i64) -> Option<i64> {
        if col < 0 || row < 0 || col as u32 >= self.width || row as u32 >= self.height {
            return None;
        }
        let label = self.data[(row as u32 * self.width + col as u32) as usize];
        if self.nodata == Some(label) {
            return None;
        }
        Some(label)
    }

    pub fn vertex_to_point(&self, col: i64, row: i64) -> Point {
        self.affine.apply(col as f64, row as f64)
    }

    /// The set of non-nodata labels present anywhere in the grid, used by
    /// the label-preservation invariant.
    pub fn distinct_labels(&self) -> std::collections::BTreeSet<i64> {
        self.data
            .iter()
            .copied()
            .filter(|&v| self.nodata != Some(v))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn affine_maps_pixel_corners() {
        let affine = Affine::from_tuple([10.0, 2.0, 0.0, 100.0, 0.0, -2.0]);
        let p = affine.apply(3.0, 1.0);
        assert_eq!(p, Point::new(16.0, 98.0));
    }

    #[test]
    fn nodata_pixel_reads_as_none() {
        let grid = LabelGrid::new(2, 2, vec![1, 1, 1, -1], Some(-1), Affine::identity(), "EPSG:4326".into());
        assert_eq!(grid.label_at(0, 0), Some(1));
        assert_eq!(grid.label_at(1, 1), None);
        assert_eq!(grid.label_at(5, 5), None);
    }
}
