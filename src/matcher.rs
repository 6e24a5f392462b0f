//! # Click → candidate star matcher
//!
//! Given the candidate stars of one exposure and a click recorded on its bey frame,
//! find the star the annotator most likely pointed at.
//!
//! ## Algorithm
//! -----------------
//! 1. Convert the click to physical coordinates ([`ImagePoint::to_physical`]).
//! 2. Scan every candidate and keep the smallest squared distance.
//! 3. Accept the best candidate only if `d² < radius²` (strict).
//!
//! The scan starts from `radius²` and only moves on a strictly smaller distance, so the
//! first candidate reaching the minimum wins and a candidate sitting exactly on the
//! radius is rejected. An exposure without candidates never matches.
//!
//! ## Unmatched clicks
//! -----------------
//! A miss is not an error: the rootname is appended to a [`MismatchSink`] (the
//! `mismatched.txt` side log in production, see [`MismatchLog`]) and the click is simply
//! left out of the table.
use std::{fs::OpenOptions, io::Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::warn;

use crate::{
    constants::{Rootname, DEFAULT_MATCH_RADIUS},
    coordinates::{ImagePoint, PhysicalPoint},
    pipeline_errors::PipelineError,
    records::CandidateStar,
};

/// Result of matching one click against the candidates of its exposure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    Matched {
        /// Position of the star in the exposure's candidate list.
        index: usize,
        catalog: PhysicalPoint,
        distance_squared: f64,
    },
    Unmatched,
}

impl MatchOutcome {
    pub fn index(&self) -> Option<usize> {
        match self {
            MatchOutcome::Matched { index, .. } => Some(*index),
            MatchOutcome::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// Destination of the rootnames whose click found no candidate.
pub trait MismatchSink {
    fn record(&mut self, rootname: &str) -> Result<(), PipelineError>;
}

/// In-memory sink, handy to inspect misses without touching the disk.
impl MismatchSink for Vec<Rootname> {
    fn record(&mut self, rootname: &str) -> Result<(), PipelineError> {
        self.push(rootname.to_string());
        Ok(())
    }
}

/// Append-only `mismatched.txt` log, one rootname per line.
///
/// The file is reopened in append mode on every record; earlier runs are kept.
#[derive(Debug, Clone)]
pub struct MismatchLog {
    path: Utf8PathBuf,
}

impl MismatchLog {
    pub fn new(path: impl AsRef<Utf8Path>) -> Self {
        MismatchLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl MismatchSink for MismatchLog {
    fn record(&mut self, rootname: &str) -> Result<(), PipelineError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{rootname}")?;
        Ok(())
    }
}

/// Strict acceptance test on squared distances.
#[inline]
pub fn within_radius(distance_squared: f64, radius_squared: f64) -> bool {
    distance_squared < radius_squared
}

/// Nearest-candidate search with a fixed radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateMatcher {
    radius_squared: f64,
}

impl Default for CandidateMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_RADIUS)
    }
}

impl CandidateMatcher {
    /// Create a matcher accepting candidates closer than `radius` physical pixels.
    pub fn new(radius: f64) -> Self {
        CandidateMatcher {
            radius_squared: radius * radius,
        }
    }

    pub fn radius_squared(&self) -> f64 {
        self.radius_squared
    }

    /// Find the candidate closest to `click`, without side effects.
    ///
    /// Arguments
    /// -----------------
    /// * `candidates` – Stars of the clicked exposure, in file order.
    /// * `click` – Click position in image coordinates.
    ///
    /// Return
    /// ----------
    /// * [`MatchOutcome::Matched`] with the index of the first closest star inside the
    ///   radius, [`MatchOutcome::Unmatched`] otherwise.
    pub fn nearest(&self, candidates: &[CandidateStar], click: ImagePoint) -> MatchOutcome {
        let physical = click.to_physical();

        let mut best = MatchOutcome::Unmatched;
        let mut min_dist = self.radius_squared;

        for (index, star) in candidates.iter().enumerate() {
            let catalog = star.physical_point();
            let dist = physical.distance_squared(&catalog);

            if within_radius(dist, min_dist) {
                min_dist = dist;
                best = MatchOutcome::Matched {
                    index,
                    catalog,
                    distance_squared: dist,
                };
            }
        }

        best
    }

    /// Match a click and record the rootname in `sink` when nothing is found.
    ///
    /// Return
    /// ----------
    /// * The match outcome; an `Err` only when the sink itself fails.
    pub fn find_candidate(
        &self,
        rootname: &str,
        candidates: &[CandidateStar],
        click: ImagePoint,
        sink: &mut impl MismatchSink,
    ) -> Result<MatchOutcome, PipelineError> {
        let outcome = self.nearest(candidates, click);

        if !outcome.is_matched() {
            warn!(
                "{rootname}: no candidate star within radius of click ({}, {})",
                click.x(),
                click.y()
            );
            sink.record(rootname)?;
        }

        Ok(outcome)
    }
}
