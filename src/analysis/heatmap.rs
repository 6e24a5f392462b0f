//! # Detector heat maps
//!
//! Where on the detector do the stars that cause Dragon's Breath sit? A [`HeatMap`]
//! accumulates, for every pixel of the bey frame, a signed **value** and a star
//! **count**:
//!
//! * [`HeatMap::full`] – `+1` for a causing star, `-1` for a clean one; every star
//!   adds one to the count.
//! * [`HeatMap::one_magnitude`] – only causing stars of one integer magnitude add
//!   `+1` to the value; every star adds one to the count.
//!
//! Stars are placed from their catalog (physical) position, rounded half-to-even to
//! whole physical pixels, converted to image coordinates and floored. Stars falling
//! outside the `2370 × 2370` frame are ignored.
//!
//! For display the grid is reduced with [`HeatMap::binned`] (block sums) and turned
//! into a ratio with [`HeatMap::normalized`], where `-1` marks an empty bin.
use std::io::Write;

use camino::Utf8Path;
use nalgebra::DMatrix;

use crate::{
    constants::BEY_FRAME_SIZE, coordinates::physical_to_image, pipeline_errors::PipelineError,
    table::TableRow,
};

/// Bin size used for display in the original study (150 physical pixels per bin).
pub const DEFAULT_BIN_SIZE: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatMap {
    /// Signed artifact score, indexed `(y, x)`.
    value: DMatrix<f64>,
    /// Number of stars, indexed `(y, x)`.
    count: DMatrix<f64>,
}

impl Default for HeatMap {
    fn default() -> Self {
        Self::new(BEY_FRAME_SIZE, BEY_FRAME_SIZE)
    }
}

impl HeatMap {
    /// Empty map of `width × height` pixels.
    pub fn new(width: usize, height: usize) -> Self {
        HeatMap {
            value: DMatrix::zeros(height, width),
            count: DMatrix::zeros(height, width),
        }
    }

    /// Every star: `+1` when it caused an artifact, `-1` otherwise.
    pub fn full(rows: &[TableRow]) -> Self {
        let mut map = Self::default();
        for row in rows {
            if let Some(pixel) = map.locate(row) {
                let delta = if row.caused_artifact() { 1.0 } else { -1.0 };
                map.add(pixel, delta);
            }
        }
        map
    }

    /// Causing stars with `floor(magnitude) == magnitude` score `+1`; all other stars
    /// only count.
    pub fn one_magnitude(rows: &[TableRow], magnitude: i32) -> Self {
        let mut map = Self::default();
        for row in rows {
            let Some(pixel) = map.locate(row) else {
                continue;
            };
            let in_bin = row
                .magnitude_value()
                .is_some_and(|m| m.floor() == f64::from(magnitude));
            let delta = if row.caused_artifact() && in_bin { 1.0 } else { 0.0 };
            map.add(pixel, delta);
        }
        map
    }

    pub fn width(&self) -> usize {
        self.value.ncols()
    }

    pub fn height(&self) -> usize {
        self.value.nrows()
    }

    pub fn value(&self) -> &DMatrix<f64> {
        &self.value
    }

    pub fn count(&self) -> &DMatrix<f64> {
        &self.count
    }

    /// Number of stars placed on the map.
    pub fn total_stars(&self) -> u64 {
        self.count.sum() as u64
    }

    /// Image pixel `(row, col)` of a star, `None` outside the frame.
    fn locate(&self, row: &TableRow) -> Option<(usize, usize)> {
        let (ix, iy) = physical_to_image(
            row.catalog_x.round_ties_even(),
            row.catalog_y.round_ties_even(),
        );
        let (ix, iy) = (ix.floor(), iy.floor());

        let inside = (0.0..self.width() as f64).contains(&ix)
            && (0.0..self.height() as f64).contains(&iy);
        inside.then_some((iy as usize, ix as usize))
    }

    fn add(&mut self, (r, c): (usize, usize), delta: f64) {
        self.value[(r, c)] += delta;
        self.count[(r, c)] += 1.0;
    }

    /// Sum `bin_size × bin_size` blocks into a smaller map.
    ///
    /// Return
    /// ----------
    /// * [`PipelineError::InvalidConfig`] when `bin_size` is zero or does not divide
    ///   both dimensions.
    pub fn binned(&self, bin_size: usize) -> Result<HeatMap, PipelineError> {
        if bin_size == 0 || self.width() % bin_size != 0 || self.height() % bin_size != 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "bin size {bin_size} does not divide a {}x{} map",
                self.width(),
                self.height()
            )));
        }

        let (rows, cols) = (self.height() / bin_size, self.width() / bin_size);
        let block_sum = |m: &DMatrix<f64>| {
            DMatrix::from_fn(rows, cols, |r, c| {
                m.view((r * bin_size, c * bin_size), (bin_size, bin_size))
                    .sum()
            })
        };

        Ok(HeatMap {
            value: block_sum(&self.value),
            count: block_sum(&self.count),
        })
    }

    /// `value / count` per pixel, `-1` where no star was placed.
    pub fn normalized(&self) -> DMatrix<f64> {
        self.value
            .zip_map(&self.count, |v, n| if n == 0.0 { -1.0 } else { v / n })
    }
}

/// Write a grid as headerless CSV, one line per row, first row first.
pub fn write_grid_csv(path: &Utf8Path, grid: &DMatrix<f64>) -> Result<(), PipelineError> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    for row in grid.row_iter() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| PipelineError::IoError(e.into_error()))?
        .flush()?;
    Ok(())
}

#[cfg(test)]
mod heatmap_test {
    use super::*;
    use crate::table::table_io::read_rows;

    // Physical (1, 1) is image (500, 478); physical (4, 4) is image (501, 479).
    const TABLE: &str = "\
A,533,511,100,100,1,1,15.2,F606W,350.0
A,-1,-1,-1,-1,1,1,15.9,F606W,350.0
A,-1,-1,-1,-1,4,4,12,F606W,350.0
B,10,10,10,10,4.4,3.6,12.5,F814W,400.0
B,-1,-1,-1,-1,99999,1,14,F814W,400.0
";

    #[test]
    fn test_full() {
        let rows = read_rows(TABLE.as_bytes()).unwrap();
        let map = HeatMap::full(&rows);

        assert_eq!((map.width(), map.height()), (2370, 2370));
        assert_eq!(map.value()[(478, 500)], 0.0);
        assert_eq!(map.count()[(478, 500)], 2.0);
        assert_eq!(map.value()[(479, 501)], 0.0);
        assert_eq!(map.count()[(479, 501)], 2.0);
        // The off-frame star is ignored.
        assert_eq!(map.total_stars(), 4);
    }

    #[test]
    fn test_one_magnitude() {
        let rows = read_rows(TABLE.as_bytes()).unwrap();

        let map = HeatMap::one_magnitude(&rows, 12);
        assert_eq!(map.value()[(478, 500)], 0.0);
        assert_eq!(map.value()[(479, 501)], 1.0);
        assert_eq!(map.count()[(479, 501)], 2.0);

        let map = HeatMap::one_magnitude(&rows, 15);
        assert_eq!(map.value()[(478, 500)], 1.0);
        assert_eq!(map.value()[(479, 501)], 0.0);
        assert_eq!(map.total_stars(), 4);
    }

    #[test]
    fn test_binned_and_normalized() {
        let rows = read_rows(TABLE.as_bytes()).unwrap();
        let binned = HeatMap::one_magnitude(&rows, 12)
            .binned(DEFAULT_BIN_SIZE)
            .unwrap();

        assert_eq!((binned.width(), binned.height()), (158, 158));
        // Image (500, 478) and (501, 479) share the bin (31, 33).
        assert_eq!(binned.value()[(31, 33)], 1.0);
        assert_eq!(binned.count()[(31, 33)], 4.0);

        let ratio = binned.normalized();
        assert_eq!(ratio[(31, 33)], 0.25);
        assert_eq!(ratio[(0, 0)], -1.0);

        assert!(HeatMap::default().binned(7).is_err());
        assert!(HeatMap::default().binned(0).is_err());
    }

    #[test]
    fn test_write_grid_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(tmp.path()).unwrap().join("grid.csv");

        let grid = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 0.5, 0.0]);
        write_grid_csv(&path, &grid).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,-1\n0.5,0\n");
    }
}
