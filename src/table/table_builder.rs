//! # Table builder
//!
//! Join the click log, the candidate stars and the exposure metadata into the rows of
//! the master table.
//!
//! ## Overview
//! -----------------
//! For every exposure of the [`CandidateSet`] (in rootname order):
//!
//! 1. each recorded click is matched with [`CandidateMatcher::find_candidate`]; misses
//!    go to the [`MismatchSink`],
//! 2. matches are accumulated **per candidate index**, and several clicks claiming the
//!    same star are resolved with the configured [`MatchPolicy`],
//! 3. one [`TableRow`] is emitted per candidate, in file order, with the filter and
//!    exposure time of the exposure attached.
//!
//! ## Error semantics
//! -----------------
//! * Missing metadata fails **that exposure only**: its rows are dropped and the error
//!   lands in [`TableBuild::failures`]; other exposures continue.
//! * A failing mismatch sink (I/O on the side log) aborts the whole build.
//! * Clicks on rootnames without candidates are counted as orphans and ignored.
use std::fmt;

use log::{info, warn};
use smallvec::SmallVec;

use crate::{
    config::{MatchPolicy, PipelineConfig},
    constants::{CandidateSet, ClickSet, FastHashMap},
    matcher::{CandidateMatcher, MatchOutcome, MismatchSink},
    pipeline_errors::PipelineError,
    records::{candidate_reader::LoadFailures, metadata::MetadataSource, ClickRecord},
    table::TableRow,
};

/// Counters gathered while building the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub exposures: usize,
    pub candidates: usize,
    pub clicks: usize,
    pub matched_clicks: usize,
    pub unmatched_clicks: usize,
    /// Clicks recorded on a rootname absent from the candidate set.
    pub orphan_clicks: usize,
    /// Candidates claimed by more than one click.
    pub collisions: usize,
    /// Candidates written with a click attached.
    pub causing_candidates: usize,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Master table summary")?;
            writeln!(f, "--------------------")?;
            writeln!(f, "exposures          : {}", self.exposures)?;
            writeln!(f, "candidates         : {}", self.candidates)?;
            writeln!(f, "causing candidates : {}", self.causing_candidates)?;
            writeln!(f, "clicks             : {}", self.clicks)?;
            writeln!(f, "  matched          : {}", self.matched_clicks)?;
            writeln!(f, "  unmatched        : {}", self.unmatched_clicks)?;
            writeln!(f, "  orphan           : {}", self.orphan_clicks)?;
            write!(f, "collisions         : {}", self.collisions)
        } else {
            write!(
                f,
                "exposures={}, candidates={}, causing={}, clicks={}, matched={}, unmatched={}, orphan={}, collisions={}",
                self.exposures,
                self.candidates,
                self.causing_candidates,
                self.clicks,
                self.matched_clicks,
                self.unmatched_clicks,
                self.orphan_clicks,
                self.collisions
            )
        }
    }
}

/// Output of [`TableBuilder::build`].
#[derive(Debug, Default)]
pub struct TableBuild {
    pub rows: Vec<TableRow>,
    pub failures: LoadFailures,
    pub stats: TableStats,
}

/// Joins clicks, candidates and metadata into [`TableRow`]s.
pub struct TableBuilder<'a, M: MetadataSource> {
    matcher: CandidateMatcher,
    policy: MatchPolicy,
    metadata: &'a M,
}

impl<'a, M: MetadataSource> TableBuilder<'a, M> {
    pub fn new(matcher: CandidateMatcher, policy: MatchPolicy, metadata: &'a M) -> Self {
        TableBuilder {
            matcher,
            policy,
            metadata,
        }
    }

    /// Builder using the radius and policy of a [`PipelineConfig`].
    pub fn from_config(config: &PipelineConfig, metadata: &'a M) -> Self {
        Self::new(
            CandidateMatcher::new(config.match_radius),
            config.match_policy,
            metadata,
        )
    }

    /// Build the rows for every exposure of `candidates`.
    ///
    /// Arguments
    /// -----------------
    /// * `candidates` – Candidate stars grouped by rootname.
    /// * `clicks` – Recorded clicks grouped by rootname.
    /// * `sink` – Receives the rootname of every unmatched click.
    ///
    /// Return
    /// ----------
    /// * A [`TableBuild`] with the rows grouped by rootname, the per-exposure failures
    ///   and the counters of the run.
    pub fn build(
        &self,
        candidates: &CandidateSet,
        clicks: &ClickSet,
        sink: &mut impl MismatchSink,
    ) -> Result<TableBuild, PipelineError> {
        let mut build = TableBuild::default();

        build.stats.orphan_clicks = clicks
            .iter()
            .filter(|(rootname, _)| !candidates.contains_key(*rootname))
            .map(|(_, c)| c.len())
            .sum();
        if build.stats.orphan_clicks > 0 {
            info!(
                "{} clicks refer to exposures without candidate stars",
                build.stats.orphan_clicks
            );
        }

        for (rootname, stars) in candidates {
            let object_clicks = clicks.get(rootname).map(|c| c.as_slice()).unwrap_or(&[]);
            let mut stats = TableStats::default();

            // Match every click, keeping the click order per candidate.
            let mut claims: FastHashMap<usize, SmallVec<[usize; 2]>> = FastHashMap::default();
            for (click_idx, click) in object_clicks.iter().enumerate() {
                stats.clicks += 1;
                let outcome =
                    self.matcher
                        .find_candidate(rootname, stars, click.image_point(), sink)?;

                match outcome {
                    MatchOutcome::Matched { index, .. } => {
                        stats.matched_clicks += 1;
                        claims.entry(index).or_default().push(click_idx);
                    }
                    MatchOutcome::Unmatched => stats.unmatched_clicks += 1,
                }
            }

            let resolved = self.resolve_claims(rootname, &claims, object_clicks, &mut stats);

            if stars.is_empty() {
                Self::merge_stats(&mut build.stats, &stats);
                build.stats.exposures += 1;
                continue;
            }

            let metadata = match self.metadata.lookup(rootname) {
                Ok(m) => m,
                Err(e) => {
                    warn!("{rootname}: rows dropped ({e})");
                    Self::merge_stats(&mut build.stats, &stats);
                    build.failures.insert(rootname.clone(), e);
                    continue;
                }
            };

            for (index, star) in stars.iter().enumerate() {
                let row = match resolved.get(&index) {
                    Some(click) => {
                        stats.causing_candidates += 1;
                        TableRow::matched(star, click.image_point(), &metadata)
                    }
                    None => TableRow::unmatched(star, &metadata),
                };
                build.rows.push(row);
            }

            stats.candidates += stars.len();
            stats.exposures += 1;
            Self::merge_stats(&mut build.stats, &stats);
        }

        info!("Master table built: {}", build.stats);
        Ok(build)
    }

    /// Pick the click attached to each claimed candidate according to the policy.
    fn resolve_claims<'c>(
        &self,
        rootname: &str,
        claims: &FastHashMap<usize, SmallVec<[usize; 2]>>,
        clicks: &'c [ClickRecord],
        stats: &mut TableStats,
    ) -> FastHashMap<usize, &'c ClickRecord> {
        let mut resolved = FastHashMap::default();

        for (&candidate, click_indices) in claims {
            if click_indices.len() > 1 {
                stats.collisions += 1;
                warn!(
                    "{rootname}: candidate #{candidate} matched by {} clicks, resolving with {}",
                    click_indices.len(),
                    self.policy
                );
            }

            let chosen = match self.policy {
                MatchPolicy::FirstWins => click_indices.first(),
                MatchPolicy::LastWins => click_indices.last(),
                MatchPolicy::RejectAmbiguous if click_indices.len() > 1 => None,
                MatchPolicy::RejectAmbiguous => click_indices.first(),
            };

            if let Some(&click_idx) = chosen {
                resolved.insert(candidate, &clicks[click_idx]);
            }
        }

        resolved
    }

    fn merge_stats(total: &mut TableStats, part: &TableStats) {
        total.exposures += part.exposures;
        total.candidates += part.candidates;
        total.clicks += part.clicks;
        total.matched_clicks += part.matched_clicks;
        total.unmatched_clicks += part.unmatched_clicks;
        total.collisions += part.collisions;
        total.causing_candidates += part.causing_candidates;
    }
}
