//! # Click log reader
//!
//! Reads a click log (one `object_id x y` line per click, as written by the annotation
//! tool and merged by [`crate::log_merger`]) and groups the clicks per rootname.
//!
//! Blank lines are ignored. Lines carrying the `None` marker or failing to parse are
//! skipped with a warning, so that a single hand-edited line never discards the other
//! clicks of the study.
use camino::Utf8Path;
use log::warn;
use smallvec::SmallVec;

use crate::{
    constants::ClickSet,
    pipeline_errors::PipelineError,
    records::{ClickRecord, ParseRecordError},
};

/// Parse the content of a click log into a [`ClickSet`].
///
/// Arguments
/// -----------------
/// * `content` – Full text of the log.
/// * `source` – Name used in diagnostics (usually the file path).
///
/// Return
/// ----------
/// * Clicks grouped by rootname, each group in log order.
pub fn parse_click_log(content: &str, source: &str) -> ClickSet {
    let mut clicks = ClickSet::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match ClickRecord::from_line(line) {
            Ok(click) => clicks
                .entry(click.object_id.clone())
                .or_insert_with(SmallVec::new)
                .push(click),
            Err(ParseRecordError::NullMarker) => {
                warn!("{source}:{}: skipping click with null marker", idx + 1);
            }
            Err(e) => {
                warn!("{source}:{}: skipping malformed click ({e})", idx + 1);
            }
        }
    }

    clicks
}

/// Read a click log from disk.
///
/// Return
/// ----------
/// * `Err(PipelineError::UnreadableFile)` if the file cannot be read; malformed
///   lines never fail the call.
pub fn read_click_log(path: &Utf8Path) -> Result<ClickSet, PipelineError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| PipelineError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(parse_click_log(&content, path.as_str()))
}
