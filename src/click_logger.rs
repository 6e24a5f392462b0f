//! # Click session logger
//!
//! In-memory record of the clicks of one annotation session, written out to a
//! timestamped `bey_viewer_<month>_<day>_<HH>:<MM>.log` that the [`crate::log_merger`]
//! later folds into the master log.
//!
//! Entries are kept in the exact text form the log will contain (`"{id} {x} {y}"`),
//! so what the annotator sees in the session is what gets deduplicated.
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use log::info;

use crate::{
    constants::{Pixel, CLICK_LOG_PREFIX},
    pipeline_errors::PipelineError,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClickLogger {
    entries: Vec<String>,
}

impl ClickLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a click on the frame of `object_id`.
    pub fn add(&mut self, object_id: &str, x: Pixel, y: Pixel) {
        self.entries.push(format!("{object_id} {x} {y}"));
    }

    /// Remove the last recorded click, if any.
    pub fn undo(&mut self) -> Option<String> {
        self.entries.pop()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the log written at `epoch` (UTC).
    pub fn log_file_name(epoch: &Epoch) -> String {
        let (_, month, day, hour, minute, _, _) = epoch.to_gregorian_utc();
        format!("{CLICK_LOG_PREFIX}_{month}_{day}_{hour:02}:{minute:02}.log")
    }

    /// Write the session to `dir` under the name for `epoch`.
    ///
    /// Return
    /// ----------
    /// * The path of the written log. A log written within the same minute is replaced.
    pub fn write_out_at(&self, dir: &Utf8Path, epoch: &Epoch) -> Result<Utf8PathBuf, PipelineError> {
        let path = dir.join(Self::log_file_name(epoch));
        let mut file = std::io::BufWriter::new(std::fs::File::create(&path)?);
        for entry in &self.entries {
            writeln!(file, "{entry}")?;
        }
        file.flush()?;

        info!("Wrote {} clicks to {path}", self.entries.len());
        Ok(path)
    }

    /// Write the session to `dir`, timestamped with the current time.
    pub fn write_out(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, PipelineError> {
        let now = Epoch::now()?;
        self.write_out_at(dir, &now)
    }
}
