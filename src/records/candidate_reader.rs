//! # Candidate star reader
//!
//! Utilities to parse the `<rootname>_2PH.uvrd` photometry output and gather the
//! candidate stars of every completed exposure into a [`CandidateSet`].
//!
//! ## Overview
//! -----------------
//! This module provides:
//! - A crate-visible routine [`read_candidate_file`] parsing a single file.
//! - The [`CandidateFile`] trait, implemented for [`CandidateSet`], exposing
//!   `new_from_dir` / `add_from_uvrd` in the way the rest of the pipeline builds its
//!   collections.
//!
//! ## Field layout
//! -----------------
//! Whitespace-separated columns; only three are used:
//! * `0` – physical x,
//! * `1` – physical y,
//! * `6` – magnitude (kept as a string).
//!
//! ## Error handling
//! -----------------
//! A missing file or a single malformed line fails the exposure with
//! [`PipelineError::UnreadableFile`] or [`PipelineError::MalformedRecord`].
//! `new_from_dir` isolates those failures per rootname and keeps loading the others;
//! there an exposure whose photometry never ran is reported as
//! [`PipelineError::MissingCandidates`].
use std::collections::BTreeMap;

use camino::Utf8Path;
use log::{info, warn};

use crate::{
    constants::{CandidateSet, Candidates, Rootname, CANDIDATE_FILE_SUFFIX},
    pipeline_errors::PipelineError,
    records::CandidateStar,
};

/// Per-rootname failures collected while loading a batch of exposures.
pub type LoadFailures = BTreeMap<Rootname, PipelineError>;

/// Parse the candidate stars of one exposure.
///
/// Arguments
/// -----------------
/// * `rootname` – Exposure the stars belong to.
/// * `path` – Path to the `_2PH.uvrd` file.
///
/// Return
/// ----------
/// * The candidates in file order (blank lines skipped), or the first error met.
pub fn read_candidate_file(rootname: &str, path: &Utf8Path) -> Result<Candidates, PipelineError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| PipelineError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            CandidateStar::from_line(rootname, line).map_err(|reason| {
                PipelineError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason,
                }
            })
        })
        .collect()
}

pub trait CandidateFile {
    /// Load the candidates of every rootname from `<dir>/<rootname>_2PH.uvrd`.
    ///
    /// Arguments
    /// ---------
    /// * `dir`: directory holding the photometry output
    /// * `rootnames`: exposures to load
    ///
    /// Return
    /// ------
    /// * the set of successfully loaded exposures, and the failures keyed by rootname
    fn new_from_dir<S: AsRef<str>>(dir: &Utf8Path, rootnames: &[S]) -> (Self, LoadFailures)
    where
        Self: Sized;

    /// Add the candidates of a single exposure.
    ///
    /// An exposure already present is replaced, not extended.
    fn add_from_uvrd(&mut self, rootname: &str, path: &Utf8Path) -> Result<(), PipelineError>;

    /// Total number of candidate stars across all exposures.
    fn total_candidates(&self) -> usize;
}

impl CandidateFile for CandidateSet {
    fn new_from_dir<S: AsRef<str>>(dir: &Utf8Path, rootnames: &[S]) -> (Self, LoadFailures) {
        let mut set = CandidateSet::new();
        let mut failures = LoadFailures::new();

        for rootname in rootnames {
            let rootname = rootname.as_ref();
            let path = dir.join(format!("{rootname}{CANDIDATE_FILE_SUFFIX}"));
            if !path.is_file() {
                warn!("{rootname}: no photometry output at {path}");
                failures.insert(
                    rootname.to_string(),
                    PipelineError::MissingCandidates(rootname.to_string()),
                );
                continue;
            }
            if let Err(e) = set.add_from_uvrd(rootname, &path) {
                warn!("{rootname}: candidate stars not loaded ({e})");
                failures.insert(rootname.to_string(), e);
            }
        }

        info!(
            "Loaded {} candidate stars for {} exposures ({} failed)",
            set.total_candidates(),
            set.len(),
            failures.len()
        );
        (set, failures)
    }

    fn add_from_uvrd(&mut self, rootname: &str, path: &Utf8Path) -> Result<(), PipelineError> {
        let candidates = read_candidate_file(rootname, path)?;
        self.insert(rootname.to_string(), candidates);
        Ok(())
    }

    #[inline]
    fn total_candidates(&self) -> usize {
        self.values().map(|c| c.len()).sum()
    }
}
