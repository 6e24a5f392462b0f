//! # Constants and type definitions for dragons_breath
//!
//! This module centralizes the **detector constants**, **file naming conventions**, and
//! **common type definitions** used throughout the pipeline.
//!
//! ## Overview
//!
//! - Affine parameters linking bey image pixels to physical detector coordinates
//! - Matching radius and the sentinel written for unmatched candidates
//! - File suffixes produced by the annotation tool and the photometry step
//! - Core type aliases and containers keyed by rootname
//!
//! These definitions are used by all main modules, including the matcher, the table
//! builder, and the table analysis helpers.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::records::{CandidateStar, ClickRecord, ObjectMetadata};

// -------------------------------------------------------------------------------------------------
// Detector geometry
// -------------------------------------------------------------------------------------------------

/// Image x pixel corresponding to physical x = 1
pub const IMAGE_ORIGIN_X: f64 = 500.0;

/// Image y pixel corresponding to physical y = 1
pub const IMAGE_ORIGIN_Y: f64 = 478.0;

/// Physical pixels per bey image pixel (the bey frames are 3× binned)
pub const PHYSICAL_SCALE: f64 = 3.0;

/// Width and height of a bey frame, in image pixels
pub const BEY_FRAME_SIZE: usize = 2370;

// -------------------------------------------------------------------------------------------------
// Matching and table conventions
// -------------------------------------------------------------------------------------------------

/// Default search radius around a click, in physical pixels
pub const DEFAULT_MATCH_RADIUS: f64 = 100.0;

/// Value written in the four click columns of a candidate that caused nothing
pub const NO_MATCH_SENTINEL: f64 = -1.0;

/// Token the annotation tool writes when a click had no valid image
pub const NULL_MARKER: &str = "None";

/// Column of the magnitude in a `_2PH.uvrd` candidate file
pub const MAGNITUDE_COLUMN: usize = 6;

// -------------------------------------------------------------------------------------------------
// File naming
// -------------------------------------------------------------------------------------------------

/// Suffix of the hand-annotated frames (`<rootname>_bey.fits`)
pub const BEY_SUFFIX: &str = "bey";

/// Suffix of the calibrated exposures (`<rootname>_flt.fits`)
pub const FLT_SUFFIX: &str = "flt";

/// Suffix of the per-exposure candidate star files (`<rootname>_2PH.uvrd`)
pub const CANDIDATE_FILE_SUFFIX: &str = "_2PH.uvrd";

/// Prefix of the click logs written by the annotation tool
pub const CLICK_LOG_PREFIX: &str = "bey_viewer";

pub const MASTER_LOG_NAME: &str = "master_log.txt";
pub const MASTER_TABLE_NAME: &str = "master_table.csv";
pub const MISMATCH_LOG_NAME: &str = "mismatched.txt";

/// Proposal ids of the calibration programs whose images were inspected
pub const DONE_CALS_NAME: &str = "Done_Cals.txt";

/// Proposal ids of the GO programs whose images were inspected
pub const DONE_GOS_NAME: &str = "Done_GOs.txt";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// HST exposure identifier (e.g. `ibcz01abq`)
pub type Rootname = String;

/// Pixel coordinate value, either image or physical space
pub type Pixel = f64;

/// Candidate stars of a single exposure, in file order.
pub type Candidates = SmallVec<[CandidateStar; 16]>;

/// Clicks recorded on a single exposure, in log order.
pub type Clicks = SmallVec<[ClickRecord; 4]>;

/// All candidate stars, grouped by rootname.
///
/// A `BTreeMap` keeps the table output grouped and ordered by rootname across runs.
pub type CandidateSet = BTreeMap<Rootname, Candidates>;

/// All clicks, grouped by rootname.
pub type ClickSet = BTreeMap<Rootname, Clicks>;

/// Exposure metadata, one entry per rootname.
pub type MetadataSet = BTreeMap<Rootname, ObjectMetadata>;

/// Fast hash map used for transient per-exposure bookkeeping.
pub type FastHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
