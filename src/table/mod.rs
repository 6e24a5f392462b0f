//! # Master table
//!
//! One [`TableRow`] per candidate star of every completed exposure, annotated with the
//! click that designated it as the cause of a Dragon's Breath artifact (or the `-1`
//! sentinel when no click did).
//!
//! Modules
//! -----------------
//! * [`table_builder`](crate::table::table_builder) – joins clicks, candidates and metadata.
//! * [`table_io`](crate::table::table_io) – headerless CSV writer and reader.
//!
//! Column order
//! -----------------
//! ```text
//! object_id, image_x, image_y, physical_x, physical_y,
//! catalog_x, catalog_y, magnitude, filter_name, exposure_time
//! ```
use log::info;
use serde::Deserialize;

use crate::{
    config::PipelineConfig,
    constants::{CandidateSet, Pixel, Rootname, BEY_SUFFIX, NO_MATCH_SENTINEL},
    coordinates::ImagePoint,
    discovery::discover_rootnames,
    matcher::MismatchLog,
    pipeline_errors::PipelineError,
    records::{
        candidate_reader::CandidateFile, click_reader::read_click_log, metadata::MetadataSource,
        CandidateStar, ObjectMetadata,
    },
    table::{
        table_builder::{TableBuild, TableBuilder},
        table_io::write_table,
    },
};

pub mod table_builder;
pub mod table_io;

/// Build and write the master table from the directories of `config`.
///
/// Steps
/// -----------------
/// 1. read the merged click log (`master_log_path`),
/// 2. list the completed exposures (`<rootname>_bey.fits` in `completed_dir`) and load
///    their candidate stars,
/// 3. join everything with a [`TableBuilder`], appending unmatched rootnames to the
///    mismatch log,
/// 4. write the rows to `master_table_path`.
///
/// Return
/// ----------
/// * The [`TableBuild`]: its `failures` hold both the exposures whose candidates could
///   not be loaded and those without metadata. An unreadable click log, an unlistable
///   completed directory or a write error fails the whole run.
pub fn build_master_table<M: MetadataSource>(
    config: &PipelineConfig,
    metadata: &M,
) -> Result<TableBuild, PipelineError> {
    let clicks = read_click_log(&config.master_log_path())?;
    let rootnames = discover_rootnames(&config.completed_dir, BEY_SUFFIX)?;
    info!(
        "{} completed exposures in {}",
        rootnames.len(),
        config.completed_dir
    );

    let (candidates, load_failures) =
        CandidateSet::new_from_dir(&config.completed_dir, rootnames.as_slice());

    let mut mismatches = MismatchLog::new(config.mismatch_log_path());
    let mut build =
        TableBuilder::from_config(config, metadata).build(&candidates, &clicks, &mut mismatches)?;
    build.failures.extend(load_failures);

    write_table(&config.master_table_path(), &build.rows)?;
    info!("{}", build.stats);
    Ok(build)
}

/// A row of the master table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRow {
    pub object_id: Rootname,
    pub image_x: Pixel,
    pub image_y: Pixel,
    pub physical_x: Pixel,
    pub physical_y: Pixel,
    pub catalog_x: Pixel,
    pub catalog_y: Pixel,
    pub magnitude: String,
    pub filter_name: String,
    pub exposure_time: f64,
}

impl TableRow {
    /// Row of a star designated by a click at `click` (image coordinates).
    pub fn matched(star: &CandidateStar, click: ImagePoint, metadata: &ObjectMetadata) -> Self {
        let physical = click.to_physical();
        TableRow {
            object_id: star.object_id.clone(),
            image_x: click.x(),
            image_y: click.y(),
            physical_x: physical.x(),
            physical_y: physical.y(),
            catalog_x: star.catalog_x,
            catalog_y: star.catalog_y,
            magnitude: star.magnitude.clone(),
            filter_name: metadata.filter_name.clone(),
            exposure_time: metadata.exposure_time,
        }
    }

    /// Row of a star no click designated; the four click columns hold the sentinel.
    pub fn unmatched(star: &CandidateStar, metadata: &ObjectMetadata) -> Self {
        TableRow {
            object_id: star.object_id.clone(),
            image_x: NO_MATCH_SENTINEL,
            image_y: NO_MATCH_SENTINEL,
            physical_x: NO_MATCH_SENTINEL,
            physical_y: NO_MATCH_SENTINEL,
            catalog_x: star.catalog_x,
            catalog_y: star.catalog_y,
            magnitude: star.magnitude.clone(),
            filter_name: metadata.filter_name.clone(),
            exposure_time: metadata.exposure_time,
        }
    }

    /// Whether a click designated this star as an artifact cause.
    pub fn caused_artifact(&self) -> bool {
        self.image_x != NO_MATCH_SENTINEL
    }

    /// Magnitude as a number, `None` when the photometry wrote something else.
    pub fn magnitude_value(&self) -> Option<f64> {
        self.magnitude.trim().parse().ok()
    }

    /// The ten output fields, formatted as they appear in the CSV.
    ///
    /// Coordinates use the shortest round-trip form (`100`, `533.5`, `-1`). The exposure
    /// time always keeps a fractional part (`350.0`), and switches to a signed two-digit
    /// exponent outside `[1e-4, 1e16)` (`1e+16`, `5e-05`).
    pub fn to_fields(&self) -> [String; 10] {
        [
            self.object_id.clone(),
            self.image_x.to_string(),
            self.image_y.to_string(),
            self.physical_x.to_string(),
            self.physical_y.to_string(),
            self.catalog_x.to_string(),
            self.catalog_y.to_string(),
            self.magnitude.clone(),
            self.filter_name.clone(),
            float_repr(self.exposure_time),
        ]
    }
}

/// Shortest round-trip form that keeps a fractional part, with exponents written as
/// `e+XX` / `e-XX`.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let debug = format!("{value:?}");
    match debug.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            Err(_) => debug,
        },
        None => debug,
    }
}
