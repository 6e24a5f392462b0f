//! # Pipeline configuration
//!
//! [`PipelineConfig`] gathers every directory, threshold and pool size the stages need,
//! so no component reaches for a hard-coded path. It is built through
//! [`PipelineConfigBuilder`], which validates the values before handing them out.
//!
//! ## Directory layout
//! -----------------
//! * `completed_dir` – hand-annotated frames (`<rootname>_bey.fits`) and the
//!   photometry output (`<rootname>_2PH.uvrd`).
//! * `data_dir` – staged calibrated exposures (`<rootname>_flt.fits`).
//! * `code_dir` – click logs (`bey_viewer*.log`), the master log, the master table
//!   and the unmatched side log.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use dragons_breath::config::{MatchPolicy, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .completed_dir("/data/sasp/completed")
//!     .data_dir("/data/sasp/data")
//!     .code_dir("/data/sasp/code")
//!     .match_policy(MatchPolicy::FirstWins)
//!     .photometry_workers(20)
//!     .build()
//!     .unwrap();
//!
//! println!("{config:#}");
//! ```
use std::{fmt, str::FromStr};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    constants::{
        CANDIDATE_FILE_SUFFIX, DEFAULT_MATCH_RADIUS, MASTER_LOG_NAME, MASTER_TABLE_NAME,
        MISMATCH_LOG_NAME,
    },
    pipeline_errors::PipelineError,
};

/// How the table builder resolves several clicks matching the same candidate star.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Keep the first click (in log order) that matched the candidate.
    #[default]
    FirstWins,
    /// Keep the last click that matched the candidate.
    LastWins,
    /// Report the candidate as unmatched when two or more clicks claim it.
    RejectAmbiguous,
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchPolicy::FirstWins => "first-wins",
            MatchPolicy::LastWins => "last-wins",
            MatchPolicy::RejectAmbiguous => "reject-ambiguous",
        };
        f.write_str(s)
    }
}

impl FromStr for MatchPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-wins" => Ok(MatchPolicy::FirstWins),
            "last-wins" => Ok(MatchPolicy::LastWins),
            "reject-ambiguous" => Ok(MatchPolicy::RejectAmbiguous),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown match policy '{other}' (expected first-wins, last-wins or reject-ambiguous)"
            ))),
        }
    }
}

/// Directories, thresholds and pool sizes shared by every pipeline stage.
///
/// Default values:
///
/// * `completed_dir`: `completed`
/// * `data_dir`: `data`
/// * `code_dir`: `code`
/// * `match_radius`: 100 physical pixels
/// * `match_policy`: [`MatchPolicy::FirstWins`]
/// * `photometry_executable`: `./flt2mass.e`
/// * `photometry_workers`: 20
/// * `staging_workers`: 4
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub completed_dir: Utf8PathBuf,
    pub data_dir: Utf8PathBuf,
    pub code_dir: Utf8PathBuf,
    /// Search radius around a click, in physical pixels.
    pub match_radius: f64,
    pub match_policy: MatchPolicy,
    pub photometry_executable: Utf8PathBuf,
    pub photometry_workers: usize,
    pub staging_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            completed_dir: Utf8PathBuf::from("completed"),
            data_dir: Utf8PathBuf::from("data"),
            code_dir: Utf8PathBuf::from("code"),
            match_radius: DEFAULT_MATCH_RADIUS,
            match_policy: MatchPolicy::default(),
            photometry_executable: Utf8PathBuf::from("./flt2mass.e"),
            photometry_workers: 20,
            staging_workers: 4,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Deduplicated click log, written by the log merger and read by the table builder.
    pub fn master_log_path(&self) -> Utf8PathBuf {
        self.code_dir.join(MASTER_LOG_NAME)
    }

    pub fn master_table_path(&self) -> Utf8PathBuf {
        self.code_dir.join(MASTER_TABLE_NAME)
    }

    /// Append-only log of rootnames where a click found no candidate star.
    pub fn mismatch_log_path(&self) -> Utf8PathBuf {
        self.code_dir.join(MISMATCH_LOG_NAME)
    }

    /// Photometry output of one exposure (`<completed_dir>/<rootname>_2PH.uvrd`).
    pub fn candidate_path(&self, rootname: &str) -> Utf8PathBuf {
        self.completed_dir
            .join(format!("{rootname}{CANDIDATE_FILE_SUFFIX}"))
    }
}

/// Builder for [`PipelineConfig`], with validation.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn completed_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.config.completed_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn data_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.config.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn code_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.config.code_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn match_radius(mut self, v: f64) -> Self {
        self.config.match_radius = v;
        self
    }
    pub fn match_policy(mut self, v: MatchPolicy) -> Self {
        self.config.match_policy = v;
        self
    }
    pub fn photometry_executable(mut self, path: impl AsRef<Utf8Path>) -> Self {
        self.config.photometry_executable = path.as_ref().to_path_buf();
        self
    }
    pub fn photometry_workers(mut self, v: usize) -> Self {
        self.config.photometry_workers = v;
        self
    }
    pub fn staging_workers(mut self, v: usize) -> Self {
        self.config.staging_workers = v;
        self
    }

    /// Validate and return the configuration.
    ///
    /// Return
    /// ----------
    /// * `Err(PipelineError::InvalidConfig)` if the radius is not a positive finite
    ///   number or if a worker pool would be empty.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;

        if !(c.match_radius.is_finite() && c.match_radius > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "match_radius must be a finite value > 0".into(),
            ));
        }
        if c.photometry_workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "photometry_workers must be >= 1".into(),
            ));
        }
        if c.staging_workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "staging_workers must be >= 1".into(),
            ));
        }

        Ok(self.config)
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Dragon's Breath pipeline configuration")?;
            writeln!(f, "--------------------------------------")?;
            writeln!(f, "  completed_dir         = {}", self.completed_dir)?;
            writeln!(f, "  data_dir              = {}", self.data_dir)?;
            writeln!(f, "  code_dir              = {}", self.code_dir)?;
            writeln!(f, "  match_radius          = {:.1} px", self.match_radius)?;
            writeln!(f, "  match_policy          = {}", self.match_policy)?;
            writeln!(f, "  photometry_executable = {}", self.photometry_executable)?;
            writeln!(f, "  photometry_workers    = {}", self.photometry_workers)?;
            write!(f, "  staging_workers       = {}", self.staging_workers)
        } else {
            write!(
                f,
                "completed={}, data={}, code={}, radius={}, policy={}",
                self.completed_dir,
                self.data_dir,
                self.code_dir,
                self.match_radius,
                self.match_policy
            )
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::builder()
            .completed_dir("/sasp/completed")
            .code_dir("/sasp/code")
            .build()
            .unwrap();

        assert_eq!(config.master_log_path(), "/sasp/code/master_log.txt");
        assert_eq!(config.master_table_path(), "/sasp/code/master_table.csv");
        assert_eq!(config.mismatch_log_path(), "/sasp/code/mismatched.txt");
        assert_eq!(
            config.candidate_path("ibcz01abq"),
            "/sasp/completed/ibcz01abq_2PH.uvrd"
        );
        assert_eq!(config.match_policy, MatchPolicy::FirstWins);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            PipelineConfig::builder().match_radius(0.0).build().unwrap_err(),
            PipelineError::InvalidConfig("match_radius must be a finite value > 0".into())
        );
        assert!(PipelineConfig::builder()
            .match_radius(f64::NAN)
            .build()
            .is_err());
        assert!(PipelineConfig::builder()
            .photometry_workers(0)
            .build()
            .is_err());
        assert!(PipelineConfig::builder().staging_workers(0).build().is_err());
    }

    #[test]
    fn test_policy_names() {
        for policy in [
            MatchPolicy::FirstWins,
            MatchPolicy::LastWins,
            MatchPolicy::RejectAmbiguous,
        ] {
            assert_eq!(policy.to_string().parse::<MatchPolicy>(), Ok(policy));
        }
        assert!("closest".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_display() {
        let config = PipelineConfig::new();
        let pretty = format!("{config:#}");
        assert!(pretty.contains("match_policy          = first-wins"));
        assert!(pretty.contains("photometry_workers    = 20"));
    }
}
