//! Magnitude distribution of the candidate stars, split by whether a click designated
//! them as the cause of an artifact.
use std::fmt;

use crate::{pipeline_errors::PipelineError, table::TableRow};

/// One unit-width magnitude bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramBin {
    /// Lower edge `m` of the bin `[m, m + 1)`.
    pub magnitude: i32,
    /// Stars that caused an artifact.
    pub caused: u64,
    /// Stars that did not.
    pub clean: u64,
}

/// Star counts per integer magnitude bin between `min_mag` and `max_mag`.
///
/// Bins are `[m, m + 1)`, except the last one which also holds `max_mag` itself.
/// Magnitudes outside the range, and magnitude strings that are not numbers, are
/// left out (the latter are counted in [`MagnitudeHistogram::unparsed`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeHistogram {
    min_mag: i32,
    max_mag: i32,
    caused: Vec<u64>,
    clean: Vec<u64>,
    unparsed: usize,
}

impl MagnitudeHistogram {
    pub const DEFAULT_MIN_MAG: i32 = 0;
    pub const DEFAULT_MAX_MAG: i32 = 20;
    /// Widest range accepted by [`MagnitudeHistogram::with_range`].
    pub const MAX_BINS: i64 = 1000;

    /// Histogram over the default `0..20` magnitude range.
    pub fn from_rows(rows: &[TableRow]) -> Self {
        let mut hist = Self::empty(Self::DEFAULT_MIN_MAG, Self::DEFAULT_MAX_MAG);
        hist.extend(rows);
        hist
    }

    /// Histogram over a custom magnitude range.
    ///
    /// Return
    /// ----------
    /// * [`PipelineError::InvalidConfig`] when `max_mag <= min_mag`, or when the range
    ///   is too wide to allocate one bin per magnitude.
    pub fn with_range(rows: &[TableRow], min_mag: i32, max_mag: i32) -> Result<Self, PipelineError> {
        if max_mag <= min_mag {
            return Err(PipelineError::InvalidConfig(format!(
                "magnitude range [{min_mag}, {max_mag}] is empty"
            )));
        }
        let width = i64::from(max_mag) - i64::from(min_mag);
        if width > Self::MAX_BINS {
            return Err(PipelineError::InvalidConfig(format!(
                "magnitude range [{min_mag}, {max_mag}] exceeds {} bins",
                Self::MAX_BINS
            )));
        }
        let mut hist = Self::empty(min_mag, max_mag);
        hist.extend(rows);
        Ok(hist)
    }

    fn empty(min_mag: i32, max_mag: i32) -> Self {
        let n_bins = (i64::from(max_mag) - i64::from(min_mag)) as usize;
        MagnitudeHistogram {
            min_mag,
            max_mag,
            caused: vec![0; n_bins],
            clean: vec![0; n_bins],
            unparsed: 0,
        }
    }

    fn bin_index(&self, magnitude: f64) -> Option<usize> {
        let (lo, hi) = (self.min_mag as f64, self.max_mag as f64);
        if !(lo..=hi).contains(&magnitude) {
            return None;
        }
        let index = ((magnitude - lo).floor() as usize).min(self.caused.len() - 1);
        Some(index)
    }

    fn extend(&mut self, rows: &[TableRow]) {
        for row in rows {
            let Some(magnitude) = row.magnitude_value() else {
                self.unparsed += 1;
                continue;
            };
            if let Some(i) = self.bin_index(magnitude) {
                if row.caused_artifact() {
                    self.caused[i] += 1;
                } else {
                    self.clean[i] += 1;
                }
            }
        }
    }

    /// All bins, brightest first.
    pub fn bins(&self) -> impl Iterator<Item = HistogramBin> + '_ {
        self.caused
            .iter()
            .zip(&self.clean)
            .enumerate()
            .map(|(i, (&caused, &clean))| HistogramBin {
                magnitude: self.min_mag + i as i32,
                caused,
                clean,
            })
    }

    /// The bin starting at `magnitude`, `None` if the histogram has no such bin.
    pub fn bin(&self, magnitude: i32) -> Option<HistogramBin> {
        if magnitude < self.min_mag || magnitude >= self.max_mag {
            return None;
        }
        self.bins().nth((magnitude - self.min_mag) as usize)
    }

    pub fn total_caused(&self) -> u64 {
        self.caused.iter().sum()
    }

    pub fn total_clean(&self) -> u64 {
        self.clean.iter().sum()
    }

    /// Rows whose magnitude could not be read as a number.
    pub fn unparsed(&self) -> usize {
        self.unparsed
    }
}

impl fmt::Display for MagnitudeHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>5}  {:>10}  {:>10}", "mag", "caused", "clean")?;
        for bin in self.bins() {
            writeln!(f, "{:>5}  {:>10}  {:>10}", bin.magnitude, bin.caused, bin.clean)?;
        }
        write!(
            f,
            "total  {:>10}  {:>10}",
            self.total_caused(),
            self.total_clean()
        )
    }
}
